use super::Source;
use super::slug::{SlugStyle, slugify};
use regex::Regex;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").expect("invalid heading regex"));
static NUMBER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\.?\s+").expect("invalid number regex"));
static CLOSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[ \t]+)#+$").expect("invalid closing sequence regex"));

const TOC_TITLE: &str = "table of contents";

/// An ATX heading found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    /// The heading text, with any section number it carried stripped off.
    pub text: String,
    /// 1-based source line.
    pub line: usize,
    /// Dotted section number, empty for titles and exempt headings.
    pub number: String,
    pub anchor: String,
    /// A "Table of Contents" heading, which is never numbered or listed.
    pub exempt: bool,
}

impl Heading {
    /// The text as it is displayed: `"1.2. Text"` when numbered.
    pub fn display_text(&self) -> String {
        if self.number.is_empty() {
            self.text.clone()
        } else {
            format!("{}. {}", self.number, self.text)
        }
    }

    /// The canonical Markdown line for this heading.
    pub fn to_markdown(&self) -> String {
        format!("{} {}", "#".repeat(self.level.into()), self.display_text())
    }
}

/// Does this (already number-stripped) heading text name a table of
/// contents? Older documents decorated the title with a 📋.
pub fn is_toc_title(text: &str) -> bool {
    text.trim_start_matches('📋')
        .trim()
        .eq_ignore_ascii_case(TOC_TITLE)
}

/// Match a single line as a heading, returning its level and raw text. An
/// optional closing run of `#` is not part of the text.
pub fn parse_heading_line(line: &str) -> Option<(u8, &str)> {
    let caps = HEADING_RE.captures(line)?;
    let raw = caps.get(2)?.as_str().trim();
    let raw = match CLOSING_RE.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    if raw.is_empty() {
        return None;
    }
    Some((caps[1].len() as u8, raw))
}

/// Remove a leading section number such as `1.`, `2.3` or `4.5.6.`.
pub fn strip_number(text: &str) -> &str {
    match NUMBER_PREFIX_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

pub(crate) fn scan(src: &Source, style: SlugStyle) -> Vec<Heading> {
    src.prose()
        .filter_map(|(i, line)| {
            let (level, raw) = parse_heading_line(line)?;
            let text = strip_number(raw);
            Some(Heading {
                level,
                text: text.to_string(),
                line: i + 1,
                number: String::new(),
                anchor: slugify(raw, style),
                exempt: is_toc_title(text),
            })
        })
        .collect()
}

/// Extract every heading outside fenced code, in document order. Anchors
/// are computed from the text as it currently appears, numbers included.
pub fn extract_headings(source: &str, style: SlugStyle) -> Vec<Heading> {
    scan(&Source::new(source), style)
}

/// Assign hierarchical numbers (level 2 and deeper) and recompute anchors
/// from the numbered text.
pub fn number_headings(headings: &mut [Heading], style: SlugStyle) {
    let mut counters = [0usize; 6];
    for heading in headings.iter_mut() {
        if heading.level <= 1 || heading.exempt {
            heading.number.clear();
            heading.anchor = slugify(&heading.text, style);
            continue;
        }

        let idx = usize::from(heading.level - 1);
        counters[idx] += 1;
        counters[idx + 1..].fill(0);

        heading.number = counters[1..=idx]
            .iter()
            .filter(|&&c| c > 0)
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        heading.anchor = slugify(&heading.display_text(), style);
    }
}
