use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types the steppers can advance.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant into the scalar type, falling back to NaN for
/// types that cannot represent it.
pub(crate) fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// A flow or map bound to one parameter snapshot.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field (flow) or map function.
    /// x: current state
    /// t: current time (ignored by maps)
    /// out: buffer receiving dx/dt or x_{n+1}
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A solver that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt, updating `t` and `state` in place.
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// Index of the first non-finite coordinate, if any.
pub fn first_non_finite<T: Scalar>(state: &[T]) -> Option<usize> {
    state.iter().position(|v| !v.is_finite())
}
