pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
