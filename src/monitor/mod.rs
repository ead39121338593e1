pub mod runner;
pub mod state;

pub use runner::*;
