//! YAML frontmatter detection and rendering.

use crate::error::Result;
use serde::Serialize;
use serde_yaml::Value;

/// Frontmatter extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// The whole header block, delimiters included, through the line ending
    /// of the closing `---` (if any). Byte-for-byte slice of the input.
    pub block: Option<&'a str>,
    /// The raw YAML between the delimiters.
    pub yaml: Option<&'a str>,
    /// Everything after the header block.
    pub body: &'a str,
}

impl<'a> FrontmatterSplit<'a> {
    fn none(content: &'a str) -> Self {
        Self {
            block: None,
            yaml: None,
            body: content,
        }
    }
}

/// Split content into a delimiter-bounded header block and body.
///
/// The header must start at the very first byte with a `---` line and be
/// closed by another `---` line. This is purely syntactic; see
/// [`split_recognized`] for the variant that also checks the YAML.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    if !content.starts_with("---") {
        return FrontmatterSplit::none(content);
    }

    let after_open = &content[3..];
    let yaml_start = if after_open.starts_with('\n') {
        4
    } else if after_open.starts_with("\r\n") {
        5
    } else {
        // "----" or "--- text": a rule, not a header
        return FrontmatterSplit::none(content);
    };

    let remaining = &content[yaml_start..];

    // (offset of closing "---" within `remaining`, length of its line ending)
    let closing = if let Some(rest) = remaining.strip_prefix("---") {
        // Empty header: the closing delimiter immediately follows
        line_ending_len(rest).map(|len| (0, len))
    } else {
        None
    }
    .or_else(|| remaining.find("\n---\n").map(|pos| (pos + 1, 1)))
    .or_else(|| remaining.find("\n---\r\n").map(|pos| (pos + 1, 2)))
    .or_else(|| {
        remaining
            .ends_with("\n---")
            .then(|| (remaining.len() - 3, 0))
    });

    match closing {
        Some((delim_offset, ending_len)) => {
            let delim_start = yaml_start + delim_offset;
            let yaml_end = if delim_offset == 0 {
                yaml_start
            } else {
                // Drop the newline that precedes the closing delimiter
                let end = delim_start - 1;
                if content[..end].ends_with('\r') { end - 1 } else { end }
            };
            let block_end = delim_start + 3 + ending_len;

            FrontmatterSplit {
                block: Some(&content[..block_end]),
                yaml: Some(&content[yaml_start..yaml_end.max(yaml_start)]),
                body: &content[block_end..],
            }
        }
        None => FrontmatterSplit::none(content),
    }
}

/// Length of the line ending at the start of `rest`, if `rest` is a line end
/// or the end of input.
fn line_ending_len(rest: &str) -> Option<usize> {
    if rest.is_empty() {
        Some(0)
    } else if rest.starts_with('\n') {
        Some(1)
    } else if rest.starts_with("\r\n") {
        Some(2)
    } else {
        None
    }
}

/// Split content, accepting the header only if it is a YAML mapping (or empty).
///
/// Two horizontal rules with prose between them look like a header block
/// syntactically; requiring a mapping keeps them in the body.
pub fn split_recognized(content: &str) -> FrontmatterSplit<'_> {
    let split = split_frontmatter(content);
    match split.yaml {
        Some(yaml) if is_recognized_yaml(yaml) => split,
        _ => FrontmatterSplit::none(content),
    }
}

fn is_recognized_yaml(yaml: &str) -> bool {
    matches!(
        serde_yaml::from_str::<Value>(yaml),
        Ok(Value::Mapping(_)) | Ok(Value::Null)
    )
}

/// Serialize a value as a YAML frontmatter block (with delimiters).
pub fn render_frontmatter<T: Serialize>(value: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(value)?;
    Ok(format!("---\n{}---\n", yaml))
}
