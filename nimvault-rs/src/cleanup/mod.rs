//! Markup cleanup for converted notes.
//!
//! [`rules`] holds the ordered rule tables, [`rule`] the interpreter for a
//! single rule, [`pipeline`] applies a whole table to a document and
//! [`walker`] runs the cleanup pipeline over a directory tree.

pub mod pipeline;
pub mod rule;
pub mod rules;
pub mod walker;

pub use pipeline::{Ambiguity, Pipeline};
pub use rule::{Rule, Stage, Substitution, WhitespaceStep};
pub use walker::{CleanupOptions, CleanupSummary, FileReport, Outcome, clean_file, clean_files, clean_tree, discover};
