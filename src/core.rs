use crate::error::RewriteError;
use crate::markdown::{Footer, RewriteOptions, SlugStyle, extract_headings, rewrite};
use crate::nav::{DocumentOrder, FooterTemplate};
use crate::verify::{VerificationResult, VerifyOptions, verify};
use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const CONFIG_FILE: &str = "_docnav.toml";

pub struct Context {
    pub root: PathBuf,
    pub config: Config,
    footer: FooterTemplate,
    order: DocumentOrder,
}

/// What happened to one document during regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document changed (or would have, in a dry run).
    Updated { entries: usize },
    Unchanged,
    /// No title, so the document was left alone.
    Skipped,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub results: Vec<VerificationResult>,
}

/// Reports for every document that could be read, plus a count of those
/// that could not.
#[derive(Debug, Default)]
pub struct CheckRun {
    pub reports: Vec<FileReport>,
    pub failed: usize,
}

impl Context {
    pub fn new(root: &Path, config: Config) -> Result<Self> {
        let footer = match &config.footer_template {
            Some(path) => {
                let path = root.join(path);
                let source = fs::read_to_string(&path)
                    .with_context(|| format!("reading footer template {}", path.display()))?;
                FooterTemplate::from_source(source)?
            }
            None => FooterTemplate::builtin(),
        };
        let order = DocumentOrder::new(config.order.clone(), config.titles.clone());
        Ok(Self {
            root: root.into(),
            config,
            footer,
            order,
        })
    }

    /// The `/`-separated path of a document relative to the root, which is
    /// how the configured ordering names it.
    pub fn doc_id(&self, path: &Path) -> String {
        let path = without_cur_dir(path);
        let root = without_cur_dir(&self.root);
        let rel_path = path.strip_prefix(&root).unwrap_or(&path);
        rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.config
            .exclude
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }

    /// List the Markdown files at or below `path`, in a stable order.
    pub fn find_markdown(&self, path: &Path) -> Vec<PathBuf> {
        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !ignore_filename(e.file_name()))
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let wanted = entry.file_type().is_file()
                        && is_markdown(entry.path())
                        && !self.excluded(entry.path());
                    wanted.then(|| entry.into_path())
                }
                Err(e) => {
                    log::error!("directory walk error: {e}");
                    None
                }
            })
            .collect()
    }

    /// Regenerate one document in place.
    pub fn rewrite_file(&self, path: &Path, dry_run: bool) -> Result<Outcome> {
        let source = fs::read_to_string(path)?;

        let mut nav = self.order.navigation(&self.doc_id(path));
        nav.last_updated = self.config.last_updated.clone();
        let opts = RewriteOptions {
            collapsible: self.config.collapsible,
            style: self.config.slug_style,
            footer: self.config.footer_enabled().then_some(Footer {
                template: &self.footer,
                nav: &nav,
            }),
        };

        let text = match rewrite(&source, &opts) {
            Ok(text) => text,
            Err(RewriteError::MissingTitle) => {
                log::warn!("{}: no level-1 heading, skipping", path.display());
                return Ok(Outcome::Skipped);
            }
            Err(e) => return Err(e.into()),
        };
        if text == source {
            return Ok(Outcome::Unchanged);
        }

        let entries = extract_headings(&text, self.config.slug_style)
            .iter()
            .filter(|h| h.level > 1 && !h.exempt)
            .count();
        if !dry_run {
            fs::write(path, &text)?;
        }
        Ok(Outcome::Updated { entries })
    }

    /// Regenerate every file, logging and counting failures rather than
    /// stopping at the first one.
    pub fn regenerate(&self, files: &[PathBuf], dry_run: bool) -> Tally {
        let mut tally = Tally::default();
        for path in files {
            match self.rewrite_file(path, dry_run) {
                Ok(Outcome::Updated { entries }) => {
                    tally.updated += 1;
                    if dry_run {
                        log::info!("would update {} ({entries} TOC entries)", path.display());
                    } else {
                        log::info!("updated {} ({entries} TOC entries)", path.display());
                    }
                }
                Ok(Outcome::Unchanged) => {
                    tally.unchanged += 1;
                    log::debug!("unchanged {}", path.display());
                }
                Ok(Outcome::Skipped) => tally.skipped += 1,
                Err(e) => {
                    tally.failed += 1;
                    log::error!("error processing {}: {e:#}", path.display());
                }
            }
        }
        tally
    }

    /// Verify the links of one document.
    pub fn check_file(&self, path: &Path, check_external: bool) -> Result<Vec<VerificationResult>> {
        let source = fs::read_to_string(path)?;
        let opts = VerifyOptions {
            docs_root: Some(self.root.as_path()),
            check_external: check_external || self.config.check_external,
            style: self.config.slug_style,
        };
        Ok(verify(&source, path, &opts))
    }

    pub fn check(&self, files: &[PathBuf], check_external: bool) -> CheckRun {
        let mut run = CheckRun::default();
        for path in files {
            match self.check_file(path, check_external) {
                Ok(results) => run.reports.push(FileReport {
                    path: path.clone(),
                    results,
                }),
                Err(e) => {
                    run.failed += 1;
                    log::error!("error reading {}: {e:#}", path.display());
                }
            }
        }
        run
    }
}

/// Should we skip a given file during discovery? We skip hidden files
/// (prefixed with .) and ones starting with _, which are special.
pub fn ignore_filename(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    (bytes != b"." && bytes.starts_with(b".")) || bytes.starts_with(b"_")
}

/// Drop `.` components, so `./docs/a.md` and `docs/a.md` compare equal.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_markdown(path: &Path) -> bool {
    matches!(path.extension(), Some(e) if e == "md")
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reading order of the documents, as root-relative paths.
    pub order: Vec<String>,
    /// Display titles overriding the ones derived from file names.
    pub titles: HashMap<String, String>,
    pub collapsible: bool,
    /// Append navigation footers. Defaults to on when an order is given.
    pub footer: Option<bool>,
    /// A custom footer template, relative to the root.
    pub footer_template: Option<PathBuf>,
    pub last_updated: Option<String>,
    pub check_external: bool,
    pub slug_style: SlugStyle,
    /// Skip any path containing one of these.
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order: vec![],
            titles: HashMap::new(),
            collapsible: false,
            footer: None,
            footer_template: None,
            last_updated: None,
            check_external: false,
            slug_style: SlugStyle::default(),
            exclude: vec![".ARCHIVE".into()],
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        match fs::read_to_string(root.join(CONFIG_FILE)) {
            // Silently proceed if the file isn't found, but crash on other errors.
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e)?,
            Ok(s) => Ok(toml::from_str(&s)?),
        }
    }

    pub fn footer_enabled(&self) -> bool {
        self.footer.unwrap_or(!self.order.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Problem;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    fn context(dir: &TempDir) -> Context {
        let config = Config::load(dir.path()).unwrap();
        Context::new(dir.path(), config).unwrap()
    }

    fn names(ctx: &Context, files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|f| ctx.doc_id(f)).collect()
    }

    #[test]
    fn hidden_files_ignored() {
        assert!(ignore_filename(OsStr::new(".git")));
        assert!(ignore_filename(OsStr::new("_docnav.toml")));
        assert!(!ignore_filename(OsStr::new(".")));
        assert!(!ignore_filename(OsStr::new("010-overview.md")));
    }

    #[test]
    fn ids_ignore_leading_dot() {
        let ctx = Context::new(Path::new("docs"), Config::default()).unwrap();
        assert_eq!(ctx.doc_id(Path::new("docs/010-a.md")), "010-a.md");
        assert_eq!(ctx.doc_id(Path::new("./docs/010-a.md")), "010-a.md");
        assert_eq!(ctx.doc_id(Path::new("./docs/sub/b.md")), "sub/b.md");

        let ctx = Context::new(Path::new("./docs"), Config::default()).unwrap();
        assert_eq!(ctx.doc_id(Path::new("docs/010-a.md")), "010-a.md");
    }

    #[test]
    fn single_file_keeps_footer_links() {
        let dir = tree(&[
            ("_docnav.toml", "order = [\"010-a.md\", \"020-b.md\"]\n"),
            ("010-a.md", "# A\n"),
            ("020-b.md", "# B\n"),
        ]);
        let ctx = context(&dir);
        let file = dir.path().join(".").join("020-b.md");
        ctx.regenerate(&[file], false);
        assert!(
            fs::read_to_string(dir.path().join("020-b.md"))
                .unwrap()
                .contains("**Navigation:** [← A](010-a.md) | [Top ↑](#b)\n")
        );
    }

    #[test]
    fn missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.order.is_empty());
        assert_eq!(config.exclude, [".ARCHIVE"]);
        assert_eq!(config.slug_style, SlugStyle::Github);
        assert!(!config.footer_enabled());
    }

    #[test]
    fn config_parsed() {
        let dir = tree(&[(
            "_docnav.toml",
            "order = [\"README.md\", \"010-a.md\"]\n\
             collapsible = true\n\
             slug_style = \"compact\"\n\
             [titles]\n\
             \"010-a.md\" = \"Alpha\"\n",
        )]);
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.order, ["README.md", "010-a.md"]);
        assert!(config.collapsible);
        assert_eq!(config.slug_style, SlugStyle::Compact);
        assert_eq!(config.titles["010-a.md"], "Alpha");
        assert!(config.footer_enabled());
    }

    #[test]
    fn bad_config_fails() {
        let dir = tree(&[("_docnav.toml", "collapsible = \"maybe\"")]);
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn discovery() {
        let dir = tree(&[
            ("b.md", ""),
            ("a.md", ""),
            ("notes.txt", ""),
            ("_draft.md", ""),
            (".hidden/x.md", ""),
            ("sub/c.md", ""),
            ("sub/.ARCHIVE/old.md", ""),
            ("old.ARCHIVE.md", ""),
        ]);
        let ctx = context(&dir);
        let files = ctx.find_markdown(dir.path());
        assert_eq!(names(&ctx, &files), ["a.md", "b.md", "sub/c.md"]);
    }

    #[test]
    fn single_file_discovery() {
        let dir = tree(&[("a.md", "")]);
        let ctx = context(&dir);
        let files = ctx.find_markdown(&dir.path().join("a.md"));
        assert_eq!(names(&ctx, &files), ["a.md"]);
    }

    #[test]
    fn rewrite_outcomes() {
        let dir = tree(&[
            ("a.md", "# A\n## One\n"),
            ("b.md", "no title\n"),
        ]);
        let ctx = context(&dir);
        let a = dir.path().join("a.md");

        assert_eq!(
            ctx.rewrite_file(&a, true).unwrap(),
            Outcome::Updated { entries: 1 }
        );
        assert_eq!(fs::read_to_string(&a).unwrap(), "# A\n## One\n");

        assert_eq!(
            ctx.rewrite_file(&a, false).unwrap(),
            Outcome::Updated { entries: 1 }
        );
        assert!(fs::read_to_string(&a).unwrap().contains("## 1. One"));
        assert_eq!(ctx.rewrite_file(&a, false).unwrap(), Outcome::Unchanged);

        let b = dir.path().join("b.md");
        assert_eq!(ctx.rewrite_file(&b, false).unwrap(), Outcome::Skipped);
        assert_eq!(fs::read_to_string(&b).unwrap(), "no title\n");
    }

    #[test]
    fn batch_continues_past_failures() {
        let dir = tree(&[("a.md", "# A\n## One\n"), ("b.md", "# B\n")]);
        let ctx = context(&dir);
        let files = vec![
            dir.path().join("missing.md"),
            dir.path().join("a.md"),
            dir.path().join("b.md"),
        ];
        assert_eq!(
            ctx.regenerate(&files, false),
            Tally {
                updated: 1,
                unchanged: 1,
                skipped: 0,
                failed: 1,
            }
        );
    }

    #[test]
    fn footers_follow_order() {
        let dir = tree(&[
            ("_docnav.toml", "order = [\"README.md\", \"guide/010-setup.md\"]\nlast_updated = \"2025-10-13\"\n"),
            ("README.md", "# Home\n"),
            ("guide/010-setup.md", "# Setup\n"),
            ("stray.md", "# Stray\n"),
        ]);
        let ctx = context(&dir);
        let files = ctx.find_markdown(dir.path());
        ctx.regenerate(&files, false);

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert!(read("README.md").contains("**Navigation:** [Top ↑](#home) | [Setup →](guide/010-setup.md)\n"));
        assert!(read("guide/010-setup.md").contains("**Navigation:** [← Documentation Home](../README.md) | [Top ↑](#setup)\n"));
        assert!(read("stray.md").contains("**Navigation:** [Top ↑](#stray)\n"));
        assert!(read("stray.md").ends_with("*Last updated: 2025-10-13*\n"));

        // A second pass leaves everything as it is.
        let tally = ctx.regenerate(&files, false);
        assert_eq!(tally.unchanged, 3);

        // And every footer link resolves.
        let run = ctx.check(&files, false);
        assert_eq!(run.failed, 0);
        for report in run.reports {
            assert!(report.results.iter().all(|r| r.valid), "{report:?}");
        }
    }

    #[test]
    fn custom_footer_template() {
        let dir = tree(&[
            ("_docnav.toml", "footer = true\nfooter_template = \"_footer.md\"\n"),
            ("_footer.md", "---\n**Navigation:** [up](#{{ top }})\n"),
            ("a.md", "# A\n"),
        ]);
        let ctx = context(&dir);
        ctx.regenerate(&[dir.path().join("a.md")], false);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "# A\n\n---\n**Navigation:** [up](#a)\n"
        );
    }

    #[test]
    fn missing_footer_template() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            footer_template: Some("nope.md".into()),
            ..Config::default()
        };
        assert!(Context::new(dir.path(), config).is_err());
    }

    #[test]
    fn check_reports_broken_links() {
        let dir = tree(&[
            ("a.md", "# A\n[b](b.md#part) [c](c.md) [self](#a)\n"),
            ("b.md", "# B\n"),
        ]);
        let ctx = context(&dir);
        let files = vec![dir.path().join("a.md"), dir.path().join("gone.md")];
        let run = ctx.check(&files, false);
        assert_eq!(run.failed, 1);
        let problems: Vec<_> = run.reports[0].results.iter().map(|r| r.problem).collect();
        assert_eq!(
            problems,
            [
                Some(Problem::AnchorMissingInTarget),
                Some(Problem::FileNotFound),
                None,
            ]
        );
    }
}
