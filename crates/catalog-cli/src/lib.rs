//! Command-line front end for the data catalog.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
