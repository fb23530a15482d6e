pub mod display;
pub mod payment;
pub mod status;

pub use payment::*;
pub use status::*;
