//! Output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::error::Result;
use serde::Serialize;

/// Width of the rule printed above a final tally.
const RULE_WIDTH: usize = 50;

/// Helper for printing progress and summaries.
///
/// Reports go to stdout. In JSON mode only the final summary is printed so
/// the output stays machine-readable.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print a serializable value as pretty JSON.
    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print the final summary: `value` as JSON, or the text lines.
    pub fn summary<T: Serialize>(&self, value: &T, lines: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print(value),
            OutputFormat::Text => {
                println!();
                println!("{}", "=".repeat(RULE_WIDTH));
                for line in lines {
                    println!("{}", line);
                }
                Ok(())
            }
        }
    }

    /// Print a progress or status line unless quiet or in JSON mode.
    pub fn info(&self, message: &str) {
        if !self.is_quiet() {
            println!("{}", message);
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Whether progress lines are suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.format == OutputFormat::Json
    }
}

/// Format a byte count with thousands separators.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whether a progress line is due after `done` of `total` items.
pub fn progress_due(done: usize, total: usize, interval: usize) -> bool {
    done == total || (interval > 0 && done % interval == 0)
}
