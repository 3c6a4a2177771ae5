use super::Source;
use super::headings::{Heading, is_toc_title, parse_heading_line, strip_number};
use std::ops::Range;

pub const TOC_HEADING: &str = "## Table of Contents";
const SUMMARY: &str = "<summary>Click to expand</summary>";
const INDENT: &str = "  ";

/// Render the table of contents for a list of numbered headings, one line per
/// element. Titles and exempt headings are left out. When nothing would be
/// listed, no block is produced at all.
pub fn build_toc(headings: &[Heading], collapsible: bool) -> Vec<String> {
    let entries: Vec<String> = headings
        .iter()
        .filter(|h| h.level > 1 && !h.exempt)
        .map(|h| {
            let indent = INDENT.repeat(usize::from(h.level - 2));
            format!("{indent}- [{}](#{})", h.display_text(), h.anchor)
        })
        .collect();
    if entries.is_empty() {
        return vec![];
    }

    let mut lines = vec![TOC_HEADING.to_string(), String::new()];
    if collapsible {
        lines.extend(["<details>".into(), SUMMARY.into(), String::new()]);
    }
    lines.extend(entries);
    lines.push(String::new());
    if collapsible {
        lines.extend(["</details>".into(), String::new()]);
    }
    lines.extend(["---".into(), String::new()]);
    lines
}

/// Is this line the heading of a table of contents? Any level below the
/// title counts, numbered or not.
fn is_toc_heading(line: &str) -> bool {
    match parse_heading_line(line) {
        Some((level, raw)) => level >= 2 && is_toc_title(strip_number(raw)),
        None => false,
    }
}

/// Find every table of contents block, as ranges of 0-based line indices.
///
/// A block starts at a TOC heading. If the heading is followed by a
/// `<details>` element, the block runs through `</details>` and the `---`
/// separator after it. Otherwise it ends just before the next heading of
/// level 1 or 2, or just after the first `---` that follows some content.
pub fn find_toc_spans(src: &Source) -> Vec<Range<usize>> {
    let mut spans = vec![];
    let mut i = 0;
    while i < src.lines.len() {
        if !src.fenced[i] && is_toc_heading(src.lines[i]) {
            let end = toc_end(src, i);
            spans.push(i..end);
            i = end;
        } else {
            i += 1;
        }
    }
    spans
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn toc_end(src: &Source, start: usize) -> usize {
    let lines = &src.lines;
    let n = lines.len();

    // An explicit `<details>` ... `</details>` delimiter wins.
    let first = (start + 1..n).find(|&j| !is_blank(lines[j]));
    if let Some(j) = first
        && !src.fenced[j]
        && lines[j].trim() == "<details>"
        && let Some(close) =
            (j + 1..n).find(|&k| !src.fenced[k] && lines[k].trim() == "</details>")
    {
        let after = (close + 1..n).find(|&k| !is_blank(lines[k]));
        return match after {
            Some(k) if !src.fenced[k] && lines[k].trim() == "---" => k + 1,
            _ => close + 1,
        };
    }

    let mut seen_content = false;
    for j in start + 1..n {
        let line = lines[j];
        if src.fenced[j] {
            seen_content = true;
            continue;
        }
        if let Some((level, _)) = parse_heading_line(line)
            && level <= 2
            && !is_toc_heading(line)
        {
            return j;
        }
        if line.trim() == "---" && seen_content {
            return j + 1;
        }
        if !is_blank(line) {
            seen_content = true;
        }
    }
    n
}
