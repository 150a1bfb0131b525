pub mod point;
pub mod tensor;
