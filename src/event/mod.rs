pub mod capture_result;
pub mod room;

pub use capture_result::*;
pub use room::*;
