//! HTML sectioning for article narration.

use std::sync::OnceLock;

use regex::Regex;

use crate::planner::Section;

struct Patterns {
    heading: Regex,
    script: Regex,
    style: Regex,
    line_break: Regex,
    block_close: Regex,
    tag: Regex,
    spaces: Regex,
    blank_runs: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        heading: compile(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>"),
        script: compile(r"(?is)<script\b[^>]*>.*?</script\s*>"),
        style: compile(r"(?is)<style\b[^>]*>.*?</style\s*>"),
        line_break: compile(r"(?i)<br\s*/?>"),
        block_close: compile(r"(?i)</(p|div|li|blockquote|section|article|tr|ul|ol|pre)\s*>"),
        tag: compile(r"<[^>]+>"),
        spaces: compile(r"[ \t]+"),
        blank_runs: compile(r"\n\s*\n(\s*\n)*"),
    })
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in html pattern")
}

/// Convert an HTML fragment to paragraph-separated plain text.
pub fn html_to_text(html: &str) -> String {
    let p = patterns();
    let text = p.script.replace_all(html, "");
    let text = p.style.replace_all(&text, "");
    let text = p.line_break.replace_all(&text, "\n");
    let text = p.block_close.replace_all(&text, "\n\n");
    let text = p.tag.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = p.spaces.replace_all(&text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let text = lines.join("\n");
    p.blank_runs.replace_all(&text, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Split HTML on `<h1>`..`<h6>`.
///
/// Returns an empty list when the markup has no headings, in which case callers fall back to
/// the plain-text path. Content before the first heading becomes an untitled section.
pub fn split_html_sections(html: &str) -> Vec<Section> {
    let p = patterns();
    let headings: Vec<_> = p.heading.captures_iter(html).collect();
    if headings.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    let first_start = headings[0].get(0).map(|m| m.start()).unwrap_or(0);
    let preamble = html_to_text(&html[..first_start]);
    if !preamble.is_empty() {
        sections.push(Section {
            title: None,
            depth: 0,
            index: 0,
            body: preamble,
        });
    }

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(level), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let body_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let title = html_to_text(inner.as_str());
        let index = sections.len();
        sections.push(Section {
            title: (!title.is_empty()).then_some(title),
            depth: level.as_str().parse().unwrap_or(1),
            index,
            body: html_to_text(&html[whole.end()..body_end]),
        });
    }

    sections
}
