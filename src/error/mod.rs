mod app;
mod config;
mod guard;
mod run;
mod sink;
mod suite;
mod template;
mod transport;
mod validation;

#[cfg(test)]
mod tests;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use guard::GuardError;
pub use run::RunError;
pub use sink::SinkError;
pub use suite::SuiteError;
pub use template::TemplateError;
pub use transport::TransportError;
pub use validation::ValidationError;
