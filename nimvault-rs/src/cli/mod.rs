//! CLI command implementations.

pub mod args;
pub mod output;

pub mod cleanup;
pub mod convert;

pub use args::{Cli, Commands};
pub use output::Output;
