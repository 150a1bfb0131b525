use crate::{
    diagnostics::eta::SimClock, numerics::interface::FarFieldCache, state::FrameVelocities,
};

pub struct RunParams {
    pub num_frames: usize,
    pub dstep_view: usize,
    // Non-zero when continuing from a checkpoint.
    pub start_frame: usize,
}

/// State carried from one frame to the next besides the particles.
pub struct RunContext {
    pub far_field_cache: FarFieldCache,
    // Velocities that advanced the previous frame, for the two-step scheme.
    pub previous_velocities: Option<FrameVelocities>,
    pub clock: SimClock,
}

impl RunContext {
    pub fn new(start_frame: usize) -> Self {
        RunContext {
            far_field_cache: FarFieldCache::new(),
            previous_velocities: None,
            clock: SimClock::new(start_frame),
        }
    }
}
