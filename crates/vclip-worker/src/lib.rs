#![deny(unreachable_patterns)]
//! Worker pool and per-job render orchestrator.
//!
//! This crate provides:
//! - Typed configuration loaded from the environment
//! - A fixed-size worker pool consuming the job registry's hand-off queue
//! - The per-job orchestrator (probe -> transcribe -> subtitles -> render)
//! - Structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::WorkerPool;
pub use logging::JobLogger;
pub use processor::Orchestrator;
