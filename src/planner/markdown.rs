//! Markdown cleanup and heading-based sectioning.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::planner::Section;

struct Patterns {
    fenced_backtick: Regex,
    fenced_tilde: Regex,
    inline_code: Regex,
    block_math: Regex,
    inline_math: Regex,
    image: Regex,
    link: Regex,
    rule: Regex,
    table_row: Regex,
    html_tag: Regex,
    blank_runs: Regex,
    heading: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        fenced_backtick: compile(r"(?s)```.*?```"),
        fenced_tilde: compile(r"(?s)~~~.*?~~~"),
        inline_code: compile(r"`[^`]+`"),
        block_math: compile(r"(?s)\$\$.*?\$\$"),
        inline_math: compile(r"\$[^$\n]+\$"),
        image: compile(r"!\[[^\]]*\]\([^)]*\)"),
        link: compile(r"\[([^\]]+)\]\([^)]*\)"),
        rule: compile(r"(?m)^[ \t]*([-*_][ \t]*){3,}$"),
        table_row: compile(r"(?m)^[ \t]*\|.*\|[ \t]*$"),
        html_tag: compile(r"</?[A-Za-z][^>]*>"),
        blank_runs: compile(r"\n{3,}"),
        heading: compile(r"^(#{1,6})\s+(.+?)\s*#*\s*$"),
    })
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in markdown pattern")
}

/// Strip markdown constructs that do not read aloud.
///
/// Removes fenced and inline code, math, images, tables, horizontal rules and HTML tags. Link
/// text is kept and the target dropped. Runs of blank lines collapse to one.
pub fn sanitize_markdown(markdown: &str) -> String {
    let p = patterns();
    let text = markdown.replace("\r\n", "\n");
    let text = p.fenced_backtick.replace_all(&text, "");
    let text = p.fenced_tilde.replace_all(&text, "");
    let text = p.block_math.replace_all(&text, "");
    let text = p.inline_code.replace_all(&text, "");
    let text = p.inline_math.replace_all(&text, "");
    let text = p.image.replace_all(&text, "");
    let text = p.link.replace_all(&text, "$1");
    let text = p.table_row.replace_all(&text, "");
    let text = p.rule.replace_all(&text, "");
    let text = p.html_tag.replace_all(&text, "");
    let text = p.blank_runs.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Split markdown on ATX headings.
///
/// Text before the first heading becomes an untitled depth-0 section. Without any heading the
/// whole text is a single untitled section.
pub fn split_markdown_sections(markdown: &str) -> Vec<Section> {
    let p = patterns();
    let mut sections = Vec::new();
    let mut title: Option<String> = None;
    let mut depth = 0usize;
    let mut body: Vec<&str> = Vec::new();

    let mut flush = |title: Option<String>, depth: usize, body: &mut Vec<&str>| {
        let text = body.join("\n").trim().to_string();
        body.clear();
        if title.is_none() && text.is_empty() {
            return;
        }
        let index = sections.len();
        sections.push(Section {
            title,
            depth,
            index,
            body: text,
        });
    };

    for line in markdown.lines() {
        if let Some(caps) = p.heading.captures(line) {
            flush(title.take(), depth, &mut body);
            depth = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1);
            title = caps.get(2).map(|m| m.as_str().trim().to_string());
        } else {
            body.push(line);
        }
    }
    flush(title, depth, &mut body);
    sections
}

/// Remove leading `#` heading markers from each line.
pub fn strip_heading_markers(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                trimmed.trim_start_matches('#').trim_start()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stable id for a section: `{slug}-{index}`.
pub fn slugify_section(title: Option<&str>, index: usize) -> String {
    let base = title.unwrap_or("untitled").trim().to_lowercase();
    let ascii: String = base
        .nfkd()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let slug = ascii
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        format!("section-{index}")
    } else {
        format!("{slug}-{index}")
    }
}
