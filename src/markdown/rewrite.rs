use super::Source;
use super::headings::{Heading, number_headings, scan};
use super::slug::SlugStyle;
use super::toc::{build_toc, find_toc_spans};
use crate::error::RewriteError;
use crate::nav::{FooterTemplate, NAV_MARKER, Navigation};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// How far from the end of a document an old footer may start.
const FOOTER_SEARCH: usize = 30;
/// How far above the marker line the footer's separator may sit.
const SEPARATOR_SEARCH: usize = 10;

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{4,}").expect("invalid blank run regex"));

/// A navigation footer to append.
pub struct Footer<'a> {
    pub template: &'a FooterTemplate,
    pub nav: &'a Navigation,
}

#[derive(Default)]
pub struct RewriteOptions<'a> {
    pub collapsible: bool,
    pub style: SlugStyle,
    pub footer: Option<Footer<'a>>,
}

fn is_separator(line: &str) -> bool {
    matches!(line.trim(), "---" | "***" | "___")
}

/// Locate an existing navigation footer among the lines not yet removed,
/// returning the index of its first line.
fn find_footer(src: &Source, removed: &[bool]) -> Option<usize> {
    let kept: Vec<usize> = (0..src.lines.len()).filter(|&i| !removed[i]).collect();
    let search_from = kept.len().saturating_sub(FOOTER_SEARCH);
    let marker = (search_from..kept.len())
        .rev()
        .find(|&k| !src.fenced[kept[k]] && src.lines[kept[k]].contains(NAV_MARKER))?;

    let start = (marker.saturating_sub(SEPARATOR_SEARCH)..marker)
        .rev()
        .find(|&k| !src.fenced[kept[k]] && is_separator(src.lines[kept[k]]))
        .unwrap_or(marker);
    Some(kept[start])
}

/// At most two blank lines in a row, exactly one newline at the end.
fn normalize(text: &str) -> String {
    let text = BLANK_RUN_RE.replace_all(text, "\n\n\n");
    format!("{}\n", text.trim_end())
}

/// Regenerate a document's heading numbers, table of contents and footer.
///
/// Any existing TOC blocks and navigation footer are dropped and rebuilt
/// from scratch, so running this on its own output changes nothing. Lines
/// other than headings, TOCs and the footer come through unchanged.
pub fn rewrite(source: &str, opts: &RewriteOptions) -> Result<String, RewriteError> {
    let src = Source::new(source);

    let mut removed = vec![false; src.lines.len()];
    for span in find_toc_spans(&src) {
        removed[span].fill(true);
    }
    if let Some(start) = find_footer(&src, &removed) {
        removed[start..].fill(true);
    }

    let mut headings: Vec<Heading> = scan(&src, opts.style)
        .into_iter()
        .filter(|h| !removed[h.line - 1])
        .collect();
    number_headings(&mut headings, opts.style);

    let title = headings
        .iter()
        .find(|h| h.level == 1)
        .ok_or(RewriteError::MissingTitle)?;
    let title_idx = title.line - 1;
    let top_anchor = title.anchor.clone();
    let toc = build_toc(&headings, opts.collapsible);
    let by_line: HashMap<usize, &Heading> = headings.iter().map(|h| (h.line - 1, h)).collect();

    let mut out: Vec<String> = vec![];
    let mut skip_blank = false;
    for (i, line) in src.lines.iter().enumerate() {
        if removed[i] {
            continue;
        }
        // The TOC brings its own trailing blank line.
        if skip_blank {
            if line.trim().is_empty() {
                continue;
            }
            skip_blank = false;
        }

        match by_line.get(&i) {
            Some(heading) => out.push(heading.to_markdown()),
            None => out.push(line.to_string()),
        }
        if i == title_idx && !toc.is_empty() {
            out.push(String::new());
            out.extend(toc.iter().cloned());
            skip_blank = true;
        }
    }

    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    if let Some(footer) = &opts.footer {
        let text = footer.template.render(footer.nav, &top_anchor)?;
        out.push(String::new());
        out.extend(text.trim_end().lines().map(str::to_string));
    }

    Ok(normalize(&out.join("\n")))
}
