//! # geodash
//!
//! Command line front end for `geodash-core`: loads `geodash.toml`, reads
//! map elements from JSON files and prints the derived geometry.

pub mod cli;
pub mod config;
