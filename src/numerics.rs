pub mod drag;
pub mod interface;
pub mod layout;
pub mod reorder;
