//! Type definitions for salesdash

mod error;
mod records;

pub use error::*;
pub use records::*;
