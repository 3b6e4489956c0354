pub mod kadet;

pub use kadet::*;
