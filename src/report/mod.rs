pub mod flatten;
pub mod writer;
