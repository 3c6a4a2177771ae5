use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("invalid slug regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("invalid slug regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`(.+?)`").expect("invalid slug regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+?)\]\(.+?\)").expect("invalid slug regex"));

/// How whitespace and hyphens are folded when turning heading text into an
/// anchor. Both the rewriter and the verifier must agree on this.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugStyle {
    /// What GitHub renders: every space becomes a hyphen, and nothing is
    /// collapsed or trimmed.
    #[default]
    Github,
    /// Space runs become one hyphen, hyphen runs are collapsed, and leading or
    /// trailing hyphens are trimmed.
    Compact,
}

/// Strip inline Markdown formatting, leaving only the visible text.
fn strip_formatting(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    LINK_RE.replace_all(&text, "$1").into_owned()
}

/// Turn heading text into the anchor a renderer would give it.
pub fn slugify(text: &str, style: SlugStyle) -> String {
    let kept: String = strip_formatting(text)
        .to_lowercase()
        .chars()
        .filter(|&c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, ' ' | '-' | '_'))
        .collect();

    match style {
        SlugStyle::Github => kept.replace(' ', "-"),
        SlugStyle::Compact => {
            let mut slug = String::with_capacity(kept.len());
            let mut last_is_dash = false;
            for c in kept.chars() {
                if c == ' ' || c == '-' {
                    if !last_is_dash {
                        slug.push('-');
                    }
                    last_is_dash = true;
                } else {
                    slug.push(c);
                    last_is_dash = false;
                }
            }
            slug.trim_matches('-').to_string()
        }
    }
}
