mod app;
mod args;
mod clock;
mod config;
mod engine;
mod entry;
mod error;
mod http;
mod logger;
mod shutdown;
mod shutdown_handlers;
mod sinks;
mod suite;
mod template;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
