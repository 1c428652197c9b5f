//! Library side of the `dex` command: job files, commands, logging and
//! summary tables.

pub mod commands;
pub mod job;
pub mod logging;
pub mod summary;
