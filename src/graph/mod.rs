pub mod analysis;
pub mod builder;
pub mod traversal;
