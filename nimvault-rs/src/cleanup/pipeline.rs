//! Ordered rule pipeline.

use crate::cleanup::rule::{Rule, Stage};
use crate::cleanup::rules::{cleanup_rules, postprocess_rules, preprocess_rules};
use crate::frontmatter::split_recognized;
use serde::Serialize;
use std::ops::Range;
use std::sync::LazyLock;

static CLEANUP: LazyLock<Pipeline> =
    LazyLock::new(|| Pipeline::new(cleanup_rules()).preserving_frontmatter());

static PREPROCESS: LazyLock<Pipeline> = LazyLock::new(|| Pipeline::new(preprocess_rules()));

static POSTPROCESS: LazyLock<Pipeline> = LazyLock::new(|| Pipeline::new(postprocess_rules()));

/// Upper bound on re-runs after a pass exposes a new leading header.
const MAX_HEADER_PASSES: usize = 3;

/// An ordered list of rules applied to a whole document.
///
/// Applying a pipeline is a pure function of the input text.
#[derive(Debug, Clone)]
pub struct Pipeline {
    rules: Vec<Rule>,
    preserve_frontmatter: bool,
}

/// Two substitutions whose matches overlap on the same input span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambiguity {
    /// The rule that runs first and therefore wins.
    pub first: &'static str,
    pub first_stage: Stage,
    /// The rule that would also have matched.
    pub second: &'static str,
    pub second_stage: Stage,
    /// Byte range of the overlap in the body text.
    pub span: Range<usize>,
}

impl Pipeline {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            preserve_frontmatter: false,
        }
    }

    /// Set a leading YAML header aside before the rules run and put it back
    /// verbatim afterwards.
    pub fn preserving_frontmatter(mut self) -> Self {
        self.preserve_frontmatter = true;
        self
    }

    /// The markup cleanup pass for converted notes.
    pub fn cleanup() -> &'static Pipeline {
        &CLEANUP
    }

    /// HTML pre-processing before conversion.
    pub fn preprocess() -> &'static Pipeline {
        &PREPROCESS
    }

    /// Light post-processing of converter output.
    pub fn postprocess() -> &'static Pipeline {
        &POSTPROCESS
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every rule in order over the document.
    ///
    /// With frontmatter preservation on, the pass is repeated when the
    /// rules themselves expose a new header (for example a leading `<hr>`
    /// pair), so the result is a fixpoint of the pipeline.
    pub fn apply(&self, text: &str) -> String {
        if !self.preserve_frontmatter {
            return self.apply_rules(text);
        }

        let input = skip_blank_lines(text);
        let mut header = split_recognized(input).block.map(str::to_owned);
        let mut current = self.apply_with_header(input);
        for _ in 1..MAX_HEADER_PASSES {
            let exposed = split_recognized(&current).block.map(str::to_owned);
            if exposed == header {
                break;
            }
            current = self.apply_with_header(&current);
            header = exposed;
        }
        current
    }

    fn apply_with_header(&self, text: &str) -> String {
        let split = split_recognized(text);
        let body = self.apply_rules(split.body);

        match split.block {
            None => body,
            Some(block) => {
                let mut out = String::with_capacity(block.len() + body.len() + 1);
                out.push_str(block);
                if !block.ends_with('\n') {
                    out.push('\n');
                }
                // An empty body must not add a blank line after the header
                if !body.trim_start_matches('\n').is_empty() {
                    out.push_str(&body);
                }
                out
            }
        }
    }

    fn apply_rules(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |current, rule| rule.apply(&current))
    }

    /// Report overlapping matches between substitutions on the given text.
    ///
    /// The rule order decides which of the two wins; this only makes the
    /// overlap visible. Matches are computed on the original body, not on
    /// intermediate states.
    pub fn ambiguities(&self, text: &str) -> Vec<Ambiguity> {
        let body = if self.preserve_frontmatter {
            split_recognized(text).body
        } else {
            text
        };

        let matches: Vec<(&'static str, Stage, Vec<Range<usize>>)> = self
            .rules
            .iter()
            .flat_map(|rule| {
                let stage = rule.stage();
                rule.substitutions()
                    .into_iter()
                    .map(move |s| (s.name, stage, s))
            })
            .map(|(name, stage, s)| {
                let ranges: Vec<Range<usize>> =
                    s.pattern.find_iter(body).map(|m| m.range()).collect();
                (name, stage, ranges)
            })
            .filter(|entry| !entry.2.is_empty())
            .collect();

        let mut found = Vec::new();
        for (i, (first, first_stage, first_ranges)) in matches.iter().enumerate() {
            for (second, second_stage, second_ranges) in &matches[i + 1..] {
                if first == second {
                    continue;
                }
                for a in first_ranges {
                    for b in second_ranges {
                        let start = a.start.max(b.start);
                        let end = a.end.min(b.end);
                        if start < end {
                            found.push(Ambiguity {
                                first: *first,
                                first_stage: *first_stage,
                                second: *second,
                                second_stage: *second_stage,
                                span: start..end,
                            });
                        }
                    }
                }
            }
        }
        found
    }
}

/// Drop whitespace-only lines before the first content line.
fn skip_blank_lines(text: &str) -> &str {
    let content = text.len() - text.trim_start().len();
    let line_start = text[..content].rfind('\n').map_or(0, |i| i + 1);
    &text[line_start..]
}
