//! Core library for the `goldrun` CLI.
//!
//! This crate provides the building blocks used by the binary: suite loading
//! and validation, template resolution, the retrying case executor, the
//! URL guard in front of every outbound request, and run artifact sinks. The
//! primary user-facing interface is the `goldrun` command-line application;
//! library APIs may evolve as the CLI grows.
pub mod args;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod shutdown;
pub mod shutdown_handlers;
pub mod sinks;
pub mod suite;
pub mod template;
