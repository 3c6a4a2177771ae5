use crate::markdown::{Link, LinkKind, SlugStyle, extract_headings, extract_links};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Suggestions compare this many leading characters.
const SUGGEST_PREFIX: usize = 20;
/// Fragments shorter than this match too much to suggest anything.
const SUGGEST_MIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    AnchorNotFound,
    FileNotFound,
    AnchorMissingInTarget,
    InvalidUrl,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub link: Link,
    pub valid: bool,
    pub reason: String,
    pub suggestion: Option<String>,
    pub problem: Option<Problem>,
}

struct Broken {
    problem: Problem,
    reason: String,
    suggestion: Option<String>,
}

impl VerificationResult {
    fn new(link: Link, outcome: Result<&str, Broken>) -> Self {
        match outcome {
            Ok(reason) => Self {
                link,
                valid: true,
                reason: reason.to_string(),
                suggestion: None,
                problem: None,
            },
            Err(broken) => Self {
                link,
                valid: false,
                reason: broken.reason,
                suggestion: broken.suggestion,
                problem: Some(broken.problem),
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VerifyOptions<'a> {
    /// Fallback base for relative links, and the base for `/`-rooted ones.
    pub docs_root: Option<&'a Path>,
    pub check_external: bool,
    pub style: SlugStyle,
}

/// The anchors a renderer would generate for a document. Repeated anchors
/// get `-1`, `-2`, ... suffixes.
#[derive(Debug, Default)]
struct AnchorSet {
    anchors: Vec<String>,
}

impl AnchorSet {
    fn new(source: &str, style: SlugStyle) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut anchors = vec![];
        for heading in extract_headings(source, style) {
            if heading.anchor.is_empty() {
                continue;
            }
            let count = seen.entry(heading.anchor.clone()).or_insert(0);
            anchors.push(if *count == 0 {
                heading.anchor
            } else {
                format!("{}-{}", heading.anchor, count)
            });
            *count += 1;
        }
        Self { anchors }
    }

    fn contains(&self, fragment: &str) -> bool {
        self.anchors.iter().any(|a| a == fragment)
    }

    /// An anchor that shares a long enough prefix with `fragment`.
    fn suggest(&self, fragment: &str) -> Option<&str> {
        if fragment.chars().count() < SUGGEST_MIN {
            return None;
        }
        let head: String = fragment.chars().take(SUGGEST_PREFIX).collect();
        self.anchors
            .iter()
            .find(|anchor| {
                let anchor_head: String = anchor.chars().take(SUGGEST_PREFIX).collect();
                anchor.contains(&head)
                    || (anchor_head.chars().count() >= SUGGEST_MIN && fragment.contains(&anchor_head))
            })
            .map(String::as_str)
    }

    fn suggestion(&self, fragment: &str) -> String {
        match self.suggest(fragment) {
            Some(anchor) => format!("Did you mean: #{anchor}"),
            None => "No similar anchors found".to_string(),
        }
    }
}

/// Split a relative link into its path and its non-empty fragment, dropping
/// any query string.
fn split_target(target: &str) -> (&str, Option<&str>) {
    let (path, fragment) = match target.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    };
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    (path, fragment.filter(|f| !f.is_empty()))
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

/// The file a candidate path refers to: the path itself, its `README.md` if
/// it is a directory, or the path with `.md` appended.
fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path);
    }
    if path.is_dir() {
        let readme = path.join("README.md");
        return readme.is_file().then_some(readme);
    }
    let mut with_md = path.into_os_string();
    with_md.push(".md");
    let with_md = PathBuf::from(with_md);
    with_md.is_file().then_some(with_md)
}

fn check_url(target: &str) -> Result<&'static str, Broken> {
    let invalid = |reason: String| Broken {
        problem: Problem::InvalidUrl,
        reason,
        suggestion: None,
    };

    let candidate = match target.strip_prefix("//") {
        Some(_) => Cow::Owned(format!("https:{target}")),
        None => Cow::Borrowed(target),
    };
    let url = Url::parse(&candidate).map_err(|err| invalid(format!("Invalid URL: {err}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_none_or(str::is_empty) => {
            Err(invalid("URL has no host".to_string()))
        }
        "mailto" if !url.path().contains('@') => {
            Err(invalid("mailto link has no address".to_string()))
        }
        _ => Ok("Valid URL format"),
    }
}

struct Verifier<'a> {
    doc_dir: PathBuf,
    opts: &'a VerifyOptions<'a>,
    own: AnchorSet,
    /// Anchors of linked documents, `None` if unreadable.
    targets: HashMap<PathBuf, Option<AnchorSet>>,
}

impl Verifier<'_> {
    fn check(&mut self, link: Link) -> Option<VerificationResult> {
        let outcome = match link.kind {
            LinkKind::Anchor => self.check_anchor(&link.target),
            LinkKind::RelativeFile => self.check_file(&link.target),
            LinkKind::External if self.opts.check_external => check_url(&link.target),
            LinkKind::External => return None,
        };
        Some(VerificationResult::new(link, outcome))
    }

    fn check_anchor(&self, target: &str) -> Result<&'static str, Broken> {
        let fragment = target.strip_prefix('#').unwrap_or(target);
        if self.own.contains(fragment) {
            return Ok("Anchor found");
        }
        Err(Broken {
            problem: Problem::AnchorNotFound,
            reason: format!("Anchor '{target}' not found in document"),
            suggestion: Some(self.own.suggestion(fragment)),
        })
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut candidates = vec![];
        match (path.strip_prefix('/'), self.opts.docs_root) {
            (Some(rooted), Some(root)) => candidates.push(root.join(rooted)),
            (Some(rooted), None) => candidates.push(self.doc_dir.join(rooted)),
            (None, root) => {
                candidates.push(self.doc_dir.join(path));
                if let Some(root) = root {
                    candidates.push(root.join(path));
                }
            }
        }
        candidates.into_iter().find_map(existing)
    }

    fn target_anchors(&mut self, file: &Path) -> Option<&AnchorSet> {
        let style = self.opts.style;
        self.targets
            .entry(file.to_path_buf())
            .or_insert_with(|| match fs::read_to_string(file) {
                Ok(text) => Some(AnchorSet::new(&text, style)),
                Err(err) => {
                    log::debug!("cannot read {}: {err}", file.display());
                    None
                }
            })
            .as_ref()
    }

    fn check_file(&mut self, target: &str) -> Result<&'static str, Broken> {
        let (path, fragment) = split_target(target);
        let Some(file) = self.resolve(path) else {
            return Err(Broken {
                problem: Problem::FileNotFound,
                reason: format!("File not found: {path}"),
                suggestion: Some(format!(
                    "Check if file exists relative to {}",
                    self.doc_dir.display()
                )),
            });
        };

        let Some(fragment) = fragment.filter(|_| is_markdown(&file)) else {
            return Ok("File exists");
        };
        let Some(anchors) = self.target_anchors(&file) else {
            return Err(Broken {
                problem: Problem::Unreadable,
                reason: format!("Could not read {}", file.display()),
                suggestion: None,
            });
        };
        if anchors.contains(fragment) {
            return Ok("File and anchor exist");
        }
        Err(Broken {
            problem: Problem::AnchorMissingInTarget,
            reason: format!("Anchor '#{fragment}' not found in {path}"),
            suggestion: Some(anchors.suggestion(fragment)),
        })
    }
}

/// Check every link in a document located at `path`. External links are
/// only reported when `check_external` is set; everything else gets one
/// result, in document order.
pub fn verify(source: &str, path: &Path, opts: &VerifyOptions) -> Vec<VerificationResult> {
    let mut verifier = Verifier {
        doc_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        opts,
        own: AnchorSet::new(source, opts.style),
        targets: HashMap::new(),
    };
    extract_links(source)
        .into_iter()
        .filter_map(|link| verifier.check(link))
        .collect()
}
