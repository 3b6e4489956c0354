pub mod error;
pub mod provider;

pub use error::*;
pub use provider::*;
