pub mod common;
pub mod simulation;
