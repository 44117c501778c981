pub mod config;
pub mod display;
pub mod errors;
pub mod git;
pub mod repo;
pub mod sync;
