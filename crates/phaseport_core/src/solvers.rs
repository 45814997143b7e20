use crate::traits::{lit, DynamicalSystem, Scalar, Steppable};
use serde::{Deserialize, Serialize};

/// Butcher tableau of an explicit Runge-Kutta method.
/// Row `i` of `a` holds the coefficients of stages `0..i`.
#[derive(Debug)]
pub struct Tableau {
    pub c: &'static [f64],
    pub a: &'static [&'static [f64]],
    pub b: &'static [f64],
}

impl Tableau {
    pub fn stages(&self) -> usize {
        self.b.len()
    }
}

/// Classic Runge-Kutta 4th order.
pub const RK4: Tableau = Tableau {
    c: &[0.0, 0.5, 0.5, 1.0],
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
};

/// Tsitouras 5/4, fifth-order weights used as a fixed-step method.
pub const TSIT5: Tableau = Tableau {
    c: &[0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0],
    a: &[
        &[],
        &[0.161],
        &[-0.008480655492356989, 0.335480655492357],
        &[2.897153057105493, -6.359448489975075, 4.3622954328695815],
        &[
            5.325864828439257,
            -11.748883564062828,
            7.4955393428898365,
            -0.09249506636175525,
        ],
        &[
            5.86145544294642,
            -12.92096931784711,
            8.159367898576159,
            -0.071584973281401,
            -0.028269050394068383,
        ],
    ],
    b: &[
        0.09646076681806523,
        0.01,
        0.4798896504144996,
        1.379008574103742,
        -3.290069515436081,
        2.324710524099774,
    ],
};

/// Fixed-step method used for continuous systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMethod {
    #[default]
    Rk4,
    Tsit5,
}

impl StepMethod {
    pub fn tableau(self) -> &'static Tableau {
        match self {
            StepMethod::Rk4 => &RK4,
            StepMethod::Tsit5 => &TSIT5,
        }
    }

    pub fn build<T: Scalar>(self, dim: usize) -> ExplicitRungeKutta<T> {
        ExplicitRungeKutta::new(self.tableau(), dim)
    }
}

/// Explicit Runge-Kutta stepper with preallocated stage buffers.
pub struct ExplicitRungeKutta<T: Scalar> {
    tableau: &'static Tableau,
    stages: Vec<Vec<T>>,
    tmp: Vec<T>,
}

impl<T: Scalar> ExplicitRungeKutta<T> {
    pub fn new(tableau: &'static Tableau, dim: usize) -> Self {
        let zero = T::zero();
        Self {
            tableau,
            stages: vec![vec![zero; dim]; tableau.stages()],
            tmp: vec![zero; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for ExplicitRungeKutta<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;

        for s in 0..self.tableau.stages() {
            let (done, rest) = self.stages.split_at_mut(s);
            // y_s = y + dt * sum_j a[s][j] * k_j
            for (i, tmp) in self.tmp.iter_mut().enumerate() {
                let mut acc = T::zero();
                for (k, &a) in done.iter().zip(self.tableau.a[s]) {
                    acc = acc + lit::<T>(a) * k[i];
                }
                *tmp = state[i] + dt * acc;
            }
            system.apply(t0 + lit::<T>(self.tableau.c[s]) * dt, &self.tmp, &mut rest[0]);
        }

        for (i, x) in state.iter_mut().enumerate() {
            let mut acc = T::zero();
            for (k, &b) in self.stages.iter().zip(self.tableau.b) {
                acc = acc + lit::<T>(b) * k[i];
            }
            *x = *x + dt * acc;
        }

        *t = t0 + dt;
    }
}

/// Discrete map stepper: x_{n+1} = f(x_n).
/// dt only advances the iteration clock.
pub struct DiscreteMap<T: Scalar> {
    tmp: Vec<T>,
}

impl<T: Scalar> DiscreteMap<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for DiscreteMap<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.apply(*t, state, &mut self.tmp);
        state.copy_from_slice(&self.tmp);
        *t = *t + dt;
    }
}
