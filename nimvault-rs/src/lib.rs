//! nimvault - migrate Nimbus Note exports into an Obsidian-style Markdown vault.
//!
//! # Overview
//!
//! Two passes share one rule engine:
//! - **convert**: every exported note bundle (`note.html`, `metadata.json`,
//!   `assets/`) is run through an external HTML-to-Markdown converter,
//!   given a YAML preamble and written into the vault with its attachments.
//! - **cleanup**: an ordered pipeline of substitution rules scrubs the HTML
//!   the converter left behind, rewriting only files that actually change.
//!
//! # Example
//!
//! ```
//! use nimvault::cleanup::Pipeline;
//!
//! let cleaned = Pipeline::cleanup().apply("<p>Hello <b><i>world</i></b></p>");
//! assert_eq!(cleaned, "Hello **_world_**\n");
//! ```

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod frontmatter;
pub mod logging;
pub mod pool;

// Re-export main types at crate root
pub use cleanup::Pipeline;
pub use config::Config;
pub use error::{ConversionError, Error, Result};
