use thiserror::Error;

/// Reasons a document cannot be rewritten.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// There is no level-1 heading to anchor the TOC and footer to. The
    /// document is left untouched.
    #[error("no level-1 heading found")]
    MissingTitle,
    /// The navigation footer template failed to render.
    #[error("footer template error: {0}")]
    Template(#[from] minijinja::Error),
    /// A footer without the marker line could never be found and replaced
    /// on the next run.
    #[error("rendered footer has no `**Navigation:**` line")]
    MissingMarker,
}
