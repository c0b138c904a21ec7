//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;

#[cfg(test)]
mod tests;

pub use cli::RunArgs;

#[cfg(test)]
pub(crate) use defaults::{DEFAULT_ARTIFACTS_DIR, DEFAULT_SUITES_DIR};
