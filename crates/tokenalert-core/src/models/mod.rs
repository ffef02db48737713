//! Data models for TokenAlert

mod alert;
mod price;

pub use alert::*;
pub use price::*;
