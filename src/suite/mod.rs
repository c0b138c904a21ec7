//! Suite model, validation, sources, and the caching loader.
mod cache;
mod loader;
mod parse;
mod source;
mod types;

#[cfg(test)]
mod tests;

pub use cache::SuiteCache;
pub use loader::SuiteLoader;
pub use parse::parse_suite;
pub use source::{
    DirectorySource, HttpSource, SuiteSource, decode_suite_document, split_suite_path,
};
pub use types::{
    DEFAULT_BASE_DELAY_MS, RetryPolicy, SimulateFlags, TestCase, TestExpectations, TestRequest,
    TestSuite, Uniqueness,
};
