use super::Source;
use super::toc::find_toc_spans;
use regex::Regex;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("invalid link regex"));
static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("invalid code span regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `#fragment` within the same document.
    Anchor,
    /// A path, possibly with a `#fragment`, relative to the document.
    RelativeFile,
    /// Anything with a URL scheme.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub target: String,
    /// 1-based source line.
    pub line: usize,
    pub kind: LinkKind,
    /// Whether the link sits inside a table of contents block.
    pub in_toc: bool,
}

/// Check whether a URL is absolute, i.e., starts with a scheme like
/// `https:` or `mailto:`, or is protocol-relative.
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once(':') {
        Some((scheme, _)) => {
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Classify a link target purely by its syntax.
pub fn classify(target: &str) -> LinkKind {
    if target.starts_with('#') {
        LinkKind::Anchor
    } else if is_absolute_url(target) {
        LinkKind::External
    } else {
        LinkKind::RelativeFile
    }
}

/// Reduce the parenthesized part of a link to its destination, dropping
/// `<...>` wrapping and an optional `"title"`.
fn clean_target(raw: &str) -> &str {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('<')
        && let Some((dest, _)) = inner.split_once('>')
    {
        return dest;
    }
    raw.split_whitespace().next().unwrap_or(raw)
}

/// Find every inline `[text](target)` link outside code, in document order.
pub fn extract_links(source: &str) -> Vec<Link> {
    let src = Source::new(source);
    let toc_spans = find_toc_spans(&src);

    let mut links = vec![];
    for (i, line) in src.prose() {
        let code_spans: Vec<_> = CODE_SPAN_RE.find_iter(line).map(|m| m.range()).collect();
        for caps in LINK_RE.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            if code_spans.iter().any(|r| r.contains(&whole.start())) {
                continue;
            }
            let target = clean_target(&caps[2]);
            if target.is_empty() {
                continue;
            }
            links.push(Link {
                text: caps[1].to_string(),
                target: target.to_string(),
                line: i + 1,
                kind: classify(target),
                in_toc: toc_spans.iter().any(|s| s.contains(&i)),
            });
        }
    }
    links
}
