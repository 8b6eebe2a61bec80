//! The `utils` module provides definitions shared across `submux`:
//! the error types and the tracing setup.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
