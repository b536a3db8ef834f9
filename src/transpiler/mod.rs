//! SQL generation for migration operations.
//!
//! Each engine implements [`SqlGenerator`]; [`Dialect`] selects one by name.

pub mod ddl;
pub mod dialect;
pub mod sql;
pub mod traits;

#[cfg(test)]
mod tests;

pub use dialect::Dialect;
pub use traits::{SqlGenerator, quote_with};
