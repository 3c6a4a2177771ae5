pub mod headings;
pub mod links;
pub mod rewrite;
pub mod slug;
pub mod toc;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

pub use headings::extract_headings;
pub use links::{Link, LinkKind, extract_links};
pub use rewrite::{Footer, RewriteOptions, rewrite};
pub use slug::SlugStyle;

/// A document split into lines, with the lines that belong to fenced code
/// blocks marked so that line scanners can skip them.
pub struct Source<'a> {
    pub lines: Vec<&'a str>,
    pub fenced: Vec<bool>,
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            fenced: fenced_lines(text),
        }
    }

    /// Iterate over `(index, line)` pairs for lines outside fenced code.
    pub fn prose(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.fenced[*i])
            .map(|(i, l)| (i, *l))
    }
}

/// Mark every line (by 0-based index, matching `split('\n')`) that is part of
/// a fenced code block, fences included.
pub fn fenced_lines(text: &str) -> Vec<bool> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| line_starts.partition_point(|&s| s <= offset) - 1;

    let mut fenced = vec![false; line_starts.len()];
    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) = event {
            let first = line_of(range.start);
            let last = line_of(range.end.saturating_sub(1).max(range.start));
            fenced[first..=last].fill(true);
        }
    }
    fenced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fences() {
        assert_eq!(fenced_lines("# hi\ntext"), vec![false, false]);
    }

    #[test]
    fn fence() {
        let text = "# hi\n```sh\n# comment\n```\nafter";
        assert_eq!(fenced_lines(text), vec![false, true, true, true, false]);
    }

    #[test]
    fn tilde_fence_with_trailing_newline() {
        let text = "~~~\n## not a heading\n~~~\n";
        assert_eq!(fenced_lines(text), vec![true, true, true, false]);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let text = "intro\n\n```\n# a\n# b";
        assert_eq!(fenced_lines(text), vec![false, false, true, true, true]);
    }

    #[test]
    fn prose_skips_code() {
        let src = Source::new("a\n```\nb\n```\nc");
        let prose: Vec<_> = src.prose().map(|(_, l)| l).collect();
        assert_eq!(prose, ["a", "c"]);
    }
}
