//! Command-line front end for the compehndly function registry.

pub mod cli;
pub mod commands;
pub mod logging;
