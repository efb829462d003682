pub mod serialise;
pub mod types;
