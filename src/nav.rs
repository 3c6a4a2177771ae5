use crate::error::RewriteError;
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Every footer carries this marker; it is how an old footer is found again.
pub const NAV_MARKER: &str = "**Navigation:**";

const FOOTER: &str = "footer.md";
const BUILTIN_FOOTER: &str = include_str!("../templates/footer.md");

static ORDER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-").expect("invalid order prefix regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub title: String,
    pub href: String,
}

/// Where a document sits among its siblings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub prev: Option<NavLink>,
    pub next: Option<NavLink>,
    pub last_updated: Option<String>,
}

impl Navigation {
    fn links(&self, top_anchor: &str) -> Vec<String> {
        let mut links = vec![];
        if let Some(prev) = &self.prev {
            links.push(format!("[← {}]({})", prev.title, prev.href));
        }
        links.push(format!("[Top ↑](#{top_anchor})"));
        if let Some(next) = &self.next {
            links.push(format!("[{} →]({})", next.title, next.href));
        }
        links
    }
}

/// The fixed reading order of a documentation tree. Identifiers are paths
/// relative to the documentation root, with `/` separators.
#[derive(Debug, Default)]
pub struct DocumentOrder {
    ids: Vec<String>,
    titles: HashMap<String, String>,
}

impl DocumentOrder {
    pub fn new(ids: Vec<String>, titles: HashMap<String, String>) -> Self {
        Self { ids, titles }
    }

    /// Previous and next documents for `id`. Documents outside the order get
    /// neither.
    pub fn navigation(&self, id: &str) -> Navigation {
        let Some(pos) = self.ids.iter().position(|i| i == id) else {
            return Navigation::default();
        };
        let link = |to: &String| NavLink {
            title: self.title(to),
            href: relative_href(id, to),
        };
        Navigation {
            prev: pos.checked_sub(1).map(|i| link(&self.ids[i])),
            next: self.ids.get(pos + 1).map(link),
            last_updated: None,
        }
    }

    /// Display title for a document, from config if given.
    pub fn title(&self, id: &str) -> String {
        match self.titles.get(id) {
            Some(title) => title.clone(),
            None => default_title(id),
        }
    }
}

/// Derive a display title from a file name: `120-terminal-integration.md`
/// becomes "Terminal Integration".
pub fn default_title(id: &str) -> String {
    let name = id.rsplit('/').next().unwrap_or(id);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    match stem {
        "README" => "Documentation Home".to_string(),
        "000-index" => "Master Index".to_string(),
        _ => ORDER_PREFIX_RE
            .replace(stem, "")
            .split(['-', ' '])
            .filter(|w| !w.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A link from document `from` to document `to`, both identified by their
/// root-relative paths.
pub fn relative_href(from: &str, to: &str) -> String {
    let from_parts: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let from_dir = &from_parts[..from_parts.len().saturating_sub(1)];
    let to_parts: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to_parts.len().saturating_sub(1));

    let mut parts = vec![".."; from_dir.len() - common];
    parts.extend(&to_parts[common..]);
    parts.join("/")
}

/// Renders navigation footers.
pub struct FooterTemplate {
    env: Environment<'static>,
}

impl FooterTemplate {
    /// The footer shipped with the binary.
    pub fn builtin() -> Self {
        let mut env = Environment::new();
        env.add_template(FOOTER, BUILTIN_FOOTER)
            .expect("error in embedded footer template");
        Self { env }
    }

    /// A user-supplied footer template.
    pub fn from_source(source: String) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template_owned(FOOTER, source)?;
        Ok(Self { env })
    }

    /// Render the footer for a document whose title has `top_anchor`.
    pub fn render(&self, nav: &Navigation, top_anchor: &str) -> Result<String, RewriteError> {
        let tmpl = self.env.get_template(FOOTER)?;
        let text = tmpl.render(context! {
            links => nav.links(top_anchor),
            prev => nav.prev,
            next => nav.next,
            top => top_anchor,
            last_updated => nav.last_updated,
        })?;
        if !text.lines().any(|l| l.contains(NAV_MARKER)) {
            return Err(RewriteError::MissingMarker);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> DocumentOrder {
        DocumentOrder::new(
            vec![
                "README.md".into(),
                "010-overview.md".into(),
                "400-redesign/000-index.md".into(),
                "400-redesign/010-implementation-plan.md".into(),
            ],
            HashMap::from([("010-overview.md".into(), "The Big Picture".into())]),
        )
    }

    #[test]
    fn titles() {
        assert_eq!(default_title("README.md"), "Documentation Home");
        assert_eq!(default_title("400-redesign/000-index.md"), "Master Index");
        assert_eq!(
            default_title("150-troubleshooting-startup-warnings.md"),
            "Troubleshooting Startup Warnings"
        );
        assert_eq!(default_title("notes.md"), "Notes");
    }

    #[test]
    fn configured_title_wins() {
        assert_eq!(order().title("010-overview.md"), "The Big Picture");
        assert_eq!(order().title("README.md"), "Documentation Home");
    }

    #[test]
    fn hrefs() {
        assert_eq!(relative_href("README.md", "010-overview.md"), "010-overview.md");
        assert_eq!(
            relative_href("README.md", "400-redesign/000-index.md"),
            "400-redesign/000-index.md"
        );
        assert_eq!(
            relative_href("400-redesign/000-index.md", "010-overview.md"),
            "../010-overview.md"
        );
        assert_eq!(
            relative_href(
                "400-redesign/000-index.md",
                "400-redesign/010-implementation-plan.md"
            ),
            "010-implementation-plan.md"
        );
    }

    #[test]
    fn middle_of_order() {
        let nav = order().navigation("400-redesign/000-index.md");
        assert_eq!(
            nav.prev,
            Some(NavLink {
                title: "The Big Picture".into(),
                href: "../010-overview.md".into(),
            })
        );
        assert_eq!(
            nav.next,
            Some(NavLink {
                title: "Implementation Plan".into(),
                href: "010-implementation-plan.md".into(),
            })
        );
    }

    #[test]
    fn ends_of_order() {
        assert_eq!(order().navigation("README.md").prev, None);
        assert_eq!(
            order()
                .navigation("400-redesign/010-implementation-plan.md")
                .next,
            None
        );
    }

    #[test]
    fn outside_order() {
        assert_eq!(order().navigation("stray.md"), Navigation::default());
    }

    #[test]
    fn builtin_footer() {
        let nav = Navigation {
            prev: Some(NavLink {
                title: "Overview".into(),
                href: "010-overview.md".into(),
            }),
            next: None,
            last_updated: Some("2025-10-13".into()),
        };
        let text = FooterTemplate::builtin().render(&nav, "title").unwrap();
        assert_eq!(
            text.trim_end(),
            "---\n\n**Navigation:** [← Overview](010-overview.md) | [Top ↑](#title)\n\n---\n\n*Last updated: 2025-10-13*"
        );
    }

    #[test]
    fn builtin_footer_without_date() {
        let text = FooterTemplate::builtin()
            .render(&Navigation::default(), "t")
            .unwrap();
        assert_eq!(text.trim_end(), "---\n\n**Navigation:** [Top ↑](#t)");
    }

    #[test]
    fn custom_footer() {
        let tmpl = FooterTemplate::from_source(
            "***\n**Navigation:** {% if next %}[next]({{ next.href }}){% endif %} [up](#{{ top }})"
                .into(),
        )
        .unwrap();
        let nav = order().navigation("README.md");
        assert_eq!(
            tmpl.render(&nav, "home").unwrap(),
            "***\n**Navigation:** [next](010-overview.md) [up](#home)"
        );
    }

    #[test]
    fn custom_footer_needs_marker() {
        let tmpl = FooterTemplate::from_source("[up](#{{ top }})".into()).unwrap();
        assert!(matches!(
            tmpl.render(&Navigation::default(), "t"),
            Err(RewriteError::MissingMarker)
        ));
    }
}
