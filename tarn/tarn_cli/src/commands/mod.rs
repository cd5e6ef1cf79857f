//! Subcommands of the `tarn` binary.

pub mod config;
pub mod demo;
pub mod stress;
