use crate::core::FileReport;
use crate::markdown::LinkKind;
use crate::verify::VerificationResult;
use std::fmt::Write;
use std::path::Path;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub anchors: usize,
    pub relative: usize,
    pub external: usize,
    pub valid: usize,
    pub broken: usize,
}

fn selected(report: &FileReport, toc_only: bool) -> impl Iterator<Item = &VerificationResult> {
    report
        .results
        .iter()
        .filter(move |r| !toc_only || r.link.in_toc)
}

pub fn summarize(reports: &[FileReport], toc_only: bool) -> Summary {
    let mut summary = Summary {
        files: reports.len(),
        ..Default::default()
    };
    for result in reports.iter().flat_map(|r| selected(r, toc_only)) {
        match result.link.kind {
            LinkKind::Anchor => summary.anchors += 1,
            LinkKind::RelativeFile => summary.relative += 1,
            LinkKind::External => summary.external += 1,
        }
        if result.valid {
            summary.valid += 1;
        } else {
            summary.broken += 1;
        }
    }
    summary
}

/// Describe the broken links of one document, or nothing if there are none.
pub fn format_broken(report: &FileReport, root: &Path, toc_only: bool) -> String {
    let broken: Vec<_> = selected(report, toc_only).filter(|r| !r.valid).collect();
    if broken.is_empty() {
        return String::new();
    }

    let path = report.path.strip_prefix(root).unwrap_or(&report.path);
    let mut out = format!("{} ({} broken)\n", path.display(), broken.len());
    for result in broken {
        let link = &result.link;
        // Writing to a String cannot fail.
        let _ = writeln!(out, "  line {}: [{}]({})", link.line, link.text, link.target);
        let _ = writeln!(out, "    {}", result.reason);
        if let Some(suggestion) = &result.suggestion {
            let _ = writeln!(out, "    {suggestion}");
        }
        if link.in_toc {
            out.push_str("    (in Table of Contents)\n");
        }
    }
    out
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "checked {} files: {} anchor links, {} file links, {} external links\n{} valid, {} broken\n",
        summary.files,
        summary.anchors,
        summary.relative,
        summary.external,
        summary.valid,
        summary.broken,
    )
}

/// Print the report for a whole check run and return its summary.
pub fn print(reports: &[FileReport], root: &Path, toc_only: bool, summary_only: bool) -> Summary {
    if !summary_only {
        for report in reports {
            let text = format_broken(report, root, toc_only);
            if !text.is_empty() {
                println!("{text}");
            }
        }
    }
    let summary = summarize(reports, toc_only);
    print!("{}", format_summary(&summary));
    summary
}
