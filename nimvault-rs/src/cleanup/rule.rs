//! Rule records and the generic interpreter that applies them.

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Pipeline stage a rule belongs to. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Converter input: strip non-content elements before conversion.
    Preprocess,
    /// Structures spanning several nested elements (linked images).
    Compound,
    /// Bold, italic, inline code, underline.
    Inline,
    /// Line breaks and horizontal rules.
    Breaks,
    /// Constructs specific to the exporting application.
    Vendor,
    /// Table, row and cell containers.
    Tables,
    /// Generic wrappers: spans, divs, paragraphs.
    Containers,
    /// Anchors with a target and text.
    Links,
    /// Fragments whose counterpart was consumed earlier.
    Orphans,
    /// Inline base64 media references.
    EmbeddedBinary,
    /// Empty table delimiters left behind by table flattening.
    Delimiters,
    /// Converter output: leftovers of the converter's own wrappers.
    Postprocess,
    /// Blank lines, trailing spaces, final newline.
    Whitespace,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Preprocess => "preprocess",
            Stage::Compound => "compound",
            Stage::Inline => "inline",
            Stage::Breaks => "breaks",
            Stage::Vendor => "vendor",
            Stage::Tables => "tables",
            Stage::Containers => "containers",
            Stage::Links => "links",
            Stage::Orphans => "orphans",
            Stage::EmbeddedBinary => "embedded-binary",
            Stage::Delimiters => "delimiters",
            Stage::Postprocess => "postprocess",
            Stage::Whitespace => "whitespace",
        };
        write!(f, "{}", s)
    }
}

/// A named regex substitution.
///
/// The replacement uses `regex` template syntax; always write groups as
/// `${1}` since `$1_` would name a group called `1_`.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl Substitution {
    pub fn new(name: &'static str, pattern: &str, replacement: &'static str) -> crate::Result<Self> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement,
        })
    }

    /// Apply once over the whole text (all non-overlapping matches).
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement)
    }
}

/// Line-oriented whitespace steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceStep {
    /// Strip trailing whitespace (including `\r`) from every line.
    TrimLineEnds,
    /// Collapse runs of 4+ newlines to 3 (at most two blank lines).
    CollapseBlankLines,
    /// Drop blank lines at the start of the text.
    TrimLeadingBlankLines,
    /// End the text with exactly one newline.
    EnsureTrailingNewline,
    /// Trim surrounding whitespace, no trailing newline.
    Trim,
}

impl WhitespaceStep {
    pub fn apply<'t>(self, text: &'t str) -> Cow<'t, str> {
        match self {
            WhitespaceStep::TrimLineEnds => {
                if text.split('\n').all(|line| line.len() == line.trim_end().len()) {
                    return Cow::Borrowed(text);
                }
                let lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();
                Cow::Owned(lines.join("\n"))
            }
            WhitespaceStep::CollapseBlankLines => {
                let mut out = String::with_capacity(text.len());
                let mut run = 0usize;
                let mut changed = false;
                for ch in text.chars() {
                    if ch == '\n' {
                        run += 1;
                        if run > 3 {
                            changed = true;
                            continue;
                        }
                    } else {
                        run = 0;
                    }
                    out.push(ch);
                }
                if changed { Cow::Owned(out) } else { Cow::Borrowed(text) }
            }
            WhitespaceStep::TrimLeadingBlankLines => Cow::Borrowed(text.trim_start_matches('\n')),
            WhitespaceStep::EnsureTrailingNewline => {
                let trimmed = text.trim_end_matches('\n');
                if trimmed.len() + 1 == text.len() {
                    Cow::Borrowed(text)
                } else {
                    Cow::Owned(format!("{}\n", trimmed))
                }
            }
            WhitespaceStep::Trim => Cow::Borrowed(text.trim()),
        }
    }

    fn name(self) -> &'static str {
        match self {
            WhitespaceStep::TrimLineEnds => "trim-line-ends",
            WhitespaceStep::CollapseBlankLines => "collapse-blank-lines",
            WhitespaceStep::TrimLeadingBlankLines => "trim-leading-blank-lines",
            WhitespaceStep::EnsureTrailingNewline => "ensure-trailing-newline",
            WhitespaceStep::Trim => "trim",
        }
    }
}

/// One step of a pipeline.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A substitution applied `passes` times in a row.
    Replace {
        stage: Stage,
        substitution: Substitution,
        passes: usize,
    },
    /// A group applied in order, repeated until the text stops changing or
    /// `max_passes` is reached. Used where an inner element only becomes
    /// matchable once an outer one was resolved, or vice versa.
    Converge {
        stage: Stage,
        name: &'static str,
        group: Vec<Substitution>,
        max_passes: usize,
    },
    /// A non-regex whitespace step.
    Whitespace(WhitespaceStep),
    /// An arbitrary text transform, for steps regexes cannot express.
    Custom {
        stage: Stage,
        name: &'static str,
        apply: fn(&str) -> String,
    },
}

impl Rule {
    pub fn stage(&self) -> Stage {
        match self {
            Rule::Replace { stage, .. } | Rule::Converge { stage, .. } | Rule::Custom { stage, .. } => {
                *stage
            }
            Rule::Whitespace(_) => Stage::Whitespace,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Replace { substitution, .. } => substitution.name,
            Rule::Converge { name, .. } | Rule::Custom { name, .. } => name,
            Rule::Whitespace(step) => step.name(),
        }
    }

    /// Substitutions this rule may perform, for diagnostics.
    pub fn substitutions(&self) -> Vec<&Substitution> {
        match self {
            Rule::Replace { substitution, .. } => vec![substitution],
            Rule::Converge { group, .. } => group.iter().collect(),
            Rule::Whitespace(_) | Rule::Custom { .. } => Vec::new(),
        }
    }

    /// Apply the rule. Text without matches comes back unchanged.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Rule::Replace {
                substitution,
                passes,
                ..
            } => {
                let mut current = text.to_string();
                for _ in 0..*passes {
                    match substitution.apply(&current) {
                        Cow::Borrowed(_) => break,
                        Cow::Owned(next) => current = next,
                    }
                }
                current
            }
            Rule::Converge {
                group, max_passes, ..
            } => {
                let mut current = text.to_string();
                for _ in 0..*max_passes {
                    let mut changed = false;
                    for substitution in group {
                        if let Cow::Owned(next) = substitution.apply(&current) {
                            changed = true;
                            current = next;
                        }
                    }
                    if !changed {
                        break;
                    }
                }
                current
            }
            Rule::Whitespace(step) => step.apply(text).into_owned(),
            Rule::Custom { apply, .. } => apply(text),
        }
    }
}

/// Build a single-pass substitution rule from a literal pattern.
///
/// Rule tables are compile-time literals, so a bad pattern is a programming
/// error and panics at first use (the tables are built lazily).
pub(crate) fn replace(stage: Stage, name: &'static str, pattern: &str, replacement: &'static str) -> Rule {
    replace_n(stage, name, pattern, replacement, 1)
}

pub(crate) fn replace_n(
    stage: Stage,
    name: &'static str,
    pattern: &str,
    replacement: &'static str,
    passes: usize,
) -> Rule {
    Rule::Replace {
        stage,
        substitution: sub(name, pattern, replacement),
        passes,
    }
}

/// Builds a table entry from a literal pattern.
pub(crate) fn sub(name: &'static str, pattern: &str, replacement: &'static str) -> Substitution {
    Substitution::new(name, pattern, replacement)
        .unwrap_or_else(|e| panic!("invalid built-in rule {name}: {e}"))
}
