//! Error types for the timestepping engine.

use thiserror::Error;

use crate::{config::setup::parameters::simulation::InputForm, state::ParticleLabel};

/// Problems with what the user asked for. The run cannot start or continue.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A quantity the selected mode needs as an input is unset.
    #[error("{form} mode has been selected but no {quantity} has been provided for {particle}")]
    MissingInput {
        form: InputForm,
        particle: ParticleLabel,
        quantity: &'static str,
    },

    /// Prescribed velocities must occupy a leading block of the particles.
    #[error(
        "{form} mode has been selected but {particle} has a prescribed velocity \
         after a particle without one; not all your particles have either a U or an F"
    )]
    InconsistentPartition {
        form: InputForm,
        particle: ParticleLabel,
    },

    /// A pairwise size ratio is missing from the near-field lookup table.
    #[error(
        "Element size ratio ({ratio} or {reciprocal}) is not in our calculated list of size \
         ratios. Offending elements: {first} and {second} (counting from 0)"
    )]
    UnsupportedSizeRatio {
        ratio: f64,
        reciprocal: f64,
        first: ParticleLabel,
        second: ParticleLabel,
    },

    /// The boundary-condition supplier disagrees with the state about particle counts.
    #[error("boundary conditions describe {found} {kind} but the simulation has {expected}")]
    ParticleCountMismatch {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// The computed state can no longer be trusted.
#[derive(Debug, Error)]
pub enum NumericalInstabilityError {
    #[error(
        "Dumbbell {index} length ({length}) has exceeded {threshold}. Something has probably \
         gone wrong (normally your timestep is too large)"
    )]
    DumbbellExplosion {
        index: usize,
        length: f64,
        threshold: f64,
    },

    #[error("the {form} linear system is singular")]
    SingularSystem { form: InputForm },

    #[error("the sheared periodic box basis is degenerate")]
    DegenerateBox,
}

#[derive(Debug, Error)]
pub enum StokesError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    NumericalInstability(#[from] NumericalInstabilityError),

    #[error("failed to write checkpoint: {0}")]
    Checkpoint(#[from] csv::Error),
}

pub type StokesResult<T> = std::result::Result<T, StokesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NumericalInstabilityError::DumbbellExplosion {
            index: 2,
            length: 6.0,
            threshold: 5.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Dumbbell 2"));
        assert!(msg.contains("exceeded 5"));

        let err: StokesError = ConfigurationError::MissingInput {
            form: InputForm::Fts,
            particle: ParticleLabel::Sphere(3),
            quantity: "stresslet",
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "fts mode has been selected but no stresslet has been provided for sphere 3"
        );
    }
}
