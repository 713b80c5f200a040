//! Rule tables.
//!
//! Order inside each table is load-bearing: vendor-specific patterns come
//! before generic patterns for the same element, and compound structures are
//! converted before their parts are simplified.

use crate::cleanup::rule::{Rule, Stage, Substitution, WhitespaceStep, replace, replace_n, sub};
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Candidate note containers in an exported page, most specific first.
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div.export-mode", "div.editor-body", "body"]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});

/// Maximum passes for the emphasis convergence group.
pub const INLINE_MAX_PASSES: usize = 5;

/// Passes used to unwrap nested spans.
pub const SPAN_PASSES: usize = 5;

fn inline_group() -> Vec<Substitution> {
    vec![
        sub("strong", r"<strong>([^<]*)</strong>", "**${1}**"),
        sub("bold", r"<b>([^<]*)</b>", "**${1}**"),
        sub("em", r"<em>([^<]*)</em>", "_${1}_"),
        sub("italic", r"<i>([^<]*)</i>", "_${1}_"),
        sub("code", r"<code>([^<]*)</code>", "`${1}`"),
        sub("underline", r"<u>([^<]*)</u>", "${1}"),
    ]
}

/// The full cleanup pass applied to already-converted notes.
pub fn cleanup_rules() -> Vec<Rule> {
    use Stage::*;

    vec![
        // Linked image before either the anchor or the image is touched
        replace(
            Compound,
            "linked-image",
            r#"(?s)<a\s+href="([^"]*)"[^>]*>\s*<img\s+src="[^"]*"[^>]*/?\s*>\s*</a>"#,
            "![](${1})",
        ),
        replace(Compound, "image", r#"<img\s+src="([^"]*)"[^>]*/?\s*>"#, "![](${1})"),
        Rule::Converge {
            stage: Inline,
            name: "emphasis",
            group: inline_group(),
            max_passes: INLINE_MAX_PASSES,
        },
        // <code> and <u> wrapping markup: keep the content
        replace(Inline, "code-tag", r"</?code[^>]*>", ""),
        replace(Inline, "underline-tag", r"</?u>", ""),
        replace(Breaks, "line-break", r"<br\s*/?>", "\n"),
        replace(Breaks, "horizontal-rule", r"<hr\s*/?>", "\n---\n"),
        replace(
            Vendor,
            "control-label",
            r#"<span class="syntax-control-label">[^<]*</span>"#,
            "",
        ),
        replace(
            Vendor,
            "bookmark-anchor",
            r#"<a href="[^"]*" class="nimbus-bookmark[^"]*"[^>]*></a>"#,
            "",
        ),
        replace(
            Vendor,
            "contents-anchor",
            r#"<a href="[^"]*" style="display:\s*contents;?"[^>]*></a>"#,
            "",
        ),
        replace(Vendor, "empty-anchor", r#"(?s)<a\s+href="[^"]*"[^>]*>\s*</a>"#, ""),
        replace(Tables, "table", r"</?table[^>]*>", "\n"),
        replace(Tables, "thead", r"</?thead[^>]*>", ""),
        replace(Tables, "tbody", r"</?tbody[^>]*>", ""),
        replace(Tables, "row-open", r"<tr[^>]*>", "\n| "),
        replace(Tables, "row-close", r"</tr>", " |"),
        replace(Tables, "cell-open", r"<t[hd][^>]*>", ""),
        replace(Tables, "cell-close", r"</t[hd]>", " | "),
        replace(Containers, "empty-span", r"<span\b[^>]*>\s*</span>", ""),
        replace_n(Containers, "span", r"<span\b[^>]*>([^<]*)</span>", "${1}", SPAN_PASSES),
        replace(Containers, "span-tag", r"</?span\b[^>]*>", ""),
        replace(Containers, "div", r"<div\b[^>]*>([^<]*)</div>", "${1}\n"),
        replace(Containers, "div-tag", r"</?div\b[^>]*>", "\n"),
        replace(Containers, "paragraph", r"<p\b[^>]*>([^<]*)</p>", "${1}\n\n"),
        replace(Containers, "paragraph-tag", r"</?p\b[^>]*>", "\n"),
        // Unwrapping containers can expose emphasis the inline stage could not pair
        Rule::Converge {
            stage: Containers,
            name: "exposed-emphasis",
            group: inline_group(),
            max_passes: INLINE_MAX_PASSES,
        },
        replace(Containers, "emphasis-tag", r"</?(?:strong|b|em|i)>", ""),
        replace(Links, "link", r#"<a\s+href="([^"]*)"[^>]*>([^<]+)</a>"#, "[${2}](${1})"),
        replace(Links, "bare-anchor", r"<a[^>]*>\s*</a>", ""),
        replace(Orphans, "orphan-image", r"<img[^>]*>", ""),
        replace(
            EmbeddedBinary,
            "data-image",
            r"!\[[^\]]*\]\(data:image/[^)]*\)",
            "",
        ),
        replace(Delimiters, "pipe-run", r"\|(?:[ \t]*\|)+", "|"),
        replace(Delimiters, "pipe-line", r"(?m)^[ \t]*\|[ \t]*(?:\n|\z)", ""),
        Rule::Whitespace(WhitespaceStep::TrimLineEnds),
        Rule::Whitespace(WhitespaceStep::CollapseBlankLines),
        Rule::Whitespace(WhitespaceStep::TrimLeadingBlankLines),
        Rule::Whitespace(WhitespaceStep::EnsureTrailingNewline),
    ]
}

/// Applied to note HTML before it is handed to the converter.
pub fn preprocess_rules() -> Vec<Rule> {
    use Stage::*;

    vec![
        Rule::Custom {
            stage: Preprocess,
            name: "content-root",
            apply: content_root,
        },
        replace(Preprocess, "script", r"(?is)<script\b[^>]*>.*?</script\s*>", ""),
        replace(Preprocess, "style", r"(?is)<style\b[^>]*>.*?</style\s*>", ""),
        replace(Preprocess, "link", r"(?i)<link\b[^>]*>", ""),
    ]
}

/// Keep only the inner markup of the note container, dropping the page
/// chrome around it.
fn content_root(html: &str) -> String {
    let document = Html::parse_document(html);
    CONTENT_ROOTS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(|root| root.inner_html())
        .unwrap_or_else(|| html.to_string())
}

/// Applied to converter output before the preamble is attached.
pub fn postprocess_rules() -> Vec<Rule> {
    use Stage::*;

    vec![
        replace(Postprocess, "leading-div", r"(?m)^<div[^>]*>\s*", ""),
        replace(Postprocess, "trailing-div", r"(?m)\s*</div>\s*$", ""),
        replace(Postprocess, "empty-div", r"<div[^>]*>\s*</div>", ""),
        replace(Postprocess, "line-container", r#"<div[^>]*id="[^"]*"[^>]*>\s*"#, "\n"),
        replace(Postprocess, "div-close", r"</div>", "\n"),
        Rule::Whitespace(WhitespaceStep::CollapseBlankLines),
        replace(Postprocess, "asset-path", r"\./assets/", "assets/"),
        Rule::Whitespace(WhitespaceStep::Trim),
    ]
}
