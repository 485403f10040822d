//! Nadir core - logging, collections and command-line plumbing shared by every crate.

pub mod cli;
pub mod collections;
pub mod log;
