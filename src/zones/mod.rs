pub mod reverse;
pub mod serialise;
pub mod types;
