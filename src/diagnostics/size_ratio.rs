use approx::relative_eq;
use log::error;

use crate::{error::ConfigurationError, state::SimState};

fn is_tabulated(ratio: f64, size_ratios: &[f64]) -> bool {
    size_ratios
        .iter()
        .any(|&lam| relative_eq!(ratio, lam) || relative_eq!(ratio, 1.0 / lam))
}

/// Checks that every pairwise element size ratio `sizes[j] / sizes[i]` (or
/// its reciprocal) is in the near-field lookup table. Elements are spheres
/// then dumbbells; the first offending pair in row-major order is reported.
pub fn check_size_ratios(state: &SimState, size_ratios: &[f64]) -> Result<(), ConfigurationError> {
    let sizes = state.element_sizes();
    for (i, a) in sizes.iter().enumerate() {
        for (j, b) in sizes.iter().enumerate() {
            let ratio = b / a;
            if !is_tabulated(ratio, size_ratios) {
                let err = ConfigurationError::UnsupportedSizeRatio {
                    ratio,
                    reciprocal: 1.0 / ratio,
                    first: state.label(i),
                    second: state.label(j),
                };
                error!("{}", err);
                return Err(err);
            }
        }
    }
    Ok(())
}
