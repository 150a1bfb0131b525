pub mod config;
pub mod diagnostics;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod numerics;
pub mod output;
pub mod state;
