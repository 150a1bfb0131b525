//! Checks run around each frame, and the progress estimate.

pub mod eta;
pub mod explosion;
pub mod proximity;
pub mod size_ratio;
