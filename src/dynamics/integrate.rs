use std::ops::{Add, Mul, Sub};

use crate::config::setup::parameters::simulation::TimesteppingScheme;

/// Returns the next Euler timestep, `x + dt * u`.
pub fn euler_timestep<X, U>(x: X, u: U, dt: f64) -> X
where
    X: Add<U, Output = X>,
    U: Mul<f64, Output = U>,
{
    x + u * dt
}

/// Returns the next Adams-Bashforth 2 timestep, `x + dt * (1.5 u - 0.5 u_previous)`.
pub fn ab2_timestep<X, U>(x: X, u: U, u_previous: U, dt: f64) -> X
where
    X: Add<U, Output = X>,
    U: Mul<f64, Output = U> + Sub<Output = U>,
{
    x + ab2_velocity(u, u_previous) * dt
}

// The blended velocity the two-step rule advances with.
pub fn ab2_velocity<U>(u: U, u_previous: U) -> U
where
    U: Mul<f64, Output = U> + Sub<Output = U>,
{
    u * 1.5 - u_previous * 0.5
}

impl TimesteppingScheme {
    /// One step. The two-step scheme falls back to Euler when there is no
    /// previous velocity yet.
    pub fn step<X, U>(&self, x: X, u: U, u_previous: Option<U>, dt: f64) -> X
    where
        X: Add<U, Output = X>,
        U: Mul<f64, Output = U> + Sub<Output = U>,
    {
        match (self, u_previous) {
            (TimesteppingScheme::Ab2, Some(u_previous)) => ab2_timestep(x, u, u_previous, dt),
            _ => euler_timestep(x, u, dt),
        }
    }

    pub fn step_all<X, U>(&self, xs: &[X], us: &[U], us_previous: Option<&[U]>, dt: f64) -> Vec<X>
    where
        X: Add<U, Output = X> + Copy,
        U: Mul<f64, Output = U> + Sub<Output = U> + Copy,
    {
        xs.iter()
            .zip(us.iter())
            .enumerate()
            .map(|(i, (x, u))| {
                let u_previous = us_previous.and_then(|prev| prev.get(i).copied());
                self.step(*x, *u, u_previous, dt)
            })
            .collect()
    }
}
