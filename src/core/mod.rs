//! Gate core: path matching, command validation, the preflight orchestrator
//! and the shared error, config, logging and output plumbing.

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod paths;
pub mod preflight;
pub mod shell;
