//! Named parameter sets and the shared handle the presentation layer writes to.

use crate::error::{Result, SimulationError};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Declaration of one real parameter: its name, display symbol and valid range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub symbol: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamSpec {
    pub const fn new(
        name: &'static str,
        symbol: &'static str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self {
            name,
            symbol,
            min,
            max,
            default,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Values for a system's declared parameters, stored in declaration order.
///
/// Range checks happen only when a set crosses into the core
/// (`ParameterHandle::replace` / `AnimationController::set_parameters`);
/// the numerical code reads the values as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    specs: &'static [ParamSpec],
    values: Vec<f64>,
}

impl ParameterSet {
    pub fn defaults(specs: &'static [ParamSpec]) -> Self {
        Self {
            specs,
            values: specs.iter().map(|spec| spec.default).collect(),
        }
    }

    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.specs
            .iter()
            .position(|spec| spec.name == name)
            .ok_or_else(|| SimulationError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Ok(self.values[self.index_of(name)?])
    }

    /// Overwrites one value. Only the name is checked here.
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let idx = self.index_of(name)?;
        self.values[idx] = value;
        Ok(())
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: &str, value: f64) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Replaces all values at once, in declaration order.
    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(SimulationError::DimensionMismatch {
                expected: self.values.len(),
                found: values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Values looked up by the names in `specs`, in that order.
    pub fn values_for(&self, specs: &[ParamSpec]) -> Result<Vec<f64>> {
        if specs.len() != self.specs.len() {
            return Err(SimulationError::DimensionMismatch {
                expected: specs.len(),
                found: self.specs.len(),
            });
        }
        specs.iter().map(|spec| self.get(spec.name)).collect()
    }

    /// Checks every value against its declared range.
    pub fn validate(&self) -> Result<()> {
        for (spec, &value) in self.specs.iter().zip(&self.values) {
            if !spec.contains(value) {
                return Err(SimulationError::InvalidParameter {
                    name: spec.name.to_string(),
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(())
    }

    /// Checks that `other` declares exactly the parameters of this set.
    pub fn ensure_same_schema(&self, other: &ParameterSet) -> Result<()> {
        for spec in other.specs {
            if !self.specs.iter().any(|own| own.name == spec.name) {
                return Err(SimulationError::UnknownParameter {
                    name: spec.name.to_string(),
                });
            }
        }
        if other.specs.len() != self.specs.len() {
            return Err(SimulationError::DimensionMismatch {
                expected: self.specs.len(),
                found: other.specs.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Versioned {
    params: ParameterSet,
    revision: u64,
}

/// The one resource shared between the presentation layer and the core.
///
/// Writers replace values at any time; the controller takes a snapshot at the
/// start of every frame and uses it for the whole frame.
#[derive(Debug, Clone)]
pub struct ParameterHandle {
    inner: Arc<Mutex<Versioned>>,
}

impl ParameterHandle {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Versioned {
                params,
                revision: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Versioned> {
        // The guarded data is plain values; a panicked writer cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and swaps in a whole parameter set. On error nothing changes.
    pub fn replace(&self, params: ParameterSet) -> Result<()> {
        self.replace_checked(params, |_| Ok(())).map(|_| ())
    }

    /// Validates and writes a single value.
    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        self.set_checked(name, value, |_| Ok(())).map(|_| ())
    }

    /// `replace`, committing only if `check` also accepts the new values.
    ///
    /// Values are checked against this handle's declared ranges, whatever
    /// ranges the incoming set carries. Returns `check`'s output and the new
    /// revision.
    pub fn replace_checked<T>(
        &self,
        params: ParameterSet,
        check: impl FnOnce(&ParameterSet) -> Result<T>,
    ) -> Result<(T, u64)> {
        self.commit(
            |current| {
                current.ensure_same_schema(&params)?;
                // Declaration order of the incoming set may differ; store ours.
                let mut ordered = current.clone();
                for spec in params.specs {
                    ordered.set(spec.name, params.get(spec.name)?)?;
                }
                Ok(ordered)
            },
            check,
        )
    }

    /// `set`, committing only if `check` also accepts the new values.
    pub fn set_checked<T>(
        &self,
        name: &str,
        value: f64,
        check: impl FnOnce(&ParameterSet) -> Result<T>,
    ) -> Result<(T, u64)> {
        self.commit(
            |current| {
                let mut next = current.clone();
                next.set(name, value)?;
                Ok(next)
            },
            check,
        )
    }

    fn commit<T>(
        &self,
        build: impl FnOnce(&ParameterSet) -> Result<ParameterSet>,
        check: impl FnOnce(&ParameterSet) -> Result<T>,
    ) -> Result<(T, u64)> {
        let mut guard = self.lock();
        let next = build(&guard.params)?;
        next.validate()?;
        let output = check(&next)?;
        guard.params = next;
        guard.revision += 1;
        Ok((output, guard.revision))
    }

    /// Writes a value with no range check at all.
    #[cfg(test)]
    pub(crate) fn overwrite_unchecked(&self, name: &str, value: f64) -> Result<()> {
        let mut guard = self.lock();
        guard.params.set(name, value)?;
        guard.revision += 1;
        Ok(())
    }

    /// Consistent copy of the current values plus their revision number.
    pub fn snapshot(&self) -> (ParameterSet, u64) {
        let guard = self.lock();
        (guard.params.clone(), guard.revision)
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }
}
