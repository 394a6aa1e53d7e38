//! SSML for providers that accept it.

use crate::planner::markdown::strip_heading_markers;

const HEADING_BREAK: &str = r#"<break time="500ms"/>"#;

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap each blank-line separated paragraph in `<p>`. Headings lose their markers and are
/// followed by a short pause.
pub fn build_ssml(text: &str) -> String {
    let mut out = String::from("<speak>");
    for paragraph in text.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }
        let is_heading = trimmed.starts_with('#');
        let spoken = strip_heading_markers(trimmed);
        let spoken = spoken.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str("<p>");
        out.push_str(&escape_xml(&spoken));
        out.push_str("</p>");
        if is_heading {
            out.push_str(HEADING_BREAK);
        }
    }
    out.push_str("</speak>");
    out
}
