pub mod compiler;
pub mod permutation;
pub mod types;
