//! Renders [`LocatedError`]s (gathered from a [`dusl_core::Syntax`] or
//! [`dusl_core::Trace`] tree's error walk) as source-annotated diagnostics.
//! Grounded on the same `annotate-snippets` builder-pattern printer used
//! elsewhere in this codebase, adapted to read `start`/`end` straight off
//! an [`dusl_core::Ambit`] instead of a separate text-range type, since the
//! ambit already pins every error to the exact [`dusl_core::Source`] it
//! came from.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use dusl_core::LocatedError;

/// A batch of located errors ready to render. Thin wrapper so a caller can
/// build one from a `Syntax`/`Trace` error walk without handling a bare
/// `Vec` (and so `Display` is available directly).
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LocatedError>,
}

impl Diagnostics {
    pub fn new(errors: Vec<LocatedError>) -> Diagnostics {
        Diagnostics { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocatedError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[LocatedError] {
        &self.errors
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_> {
        DiagnosticsPrinter::new(self)
    }
}

/// Builder for rendering a [`Diagnostics`] batch, with or without colored
/// output, with or without the underlying source text available.
pub struct DiagnosticsPrinter<'d> {
    diagnostics: &'d Diagnostics,
    colored: bool,
}

impl<'d> DiagnosticsPrinter<'d> {
    pub fn new(diagnostics: &'d Diagnostics) -> DiagnosticsPrinter<'d> {
        DiagnosticsPrinter {
            diagnostics,
            colored: false,
        }
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        for (i, err) in self.diagnostics.iter().enumerate() {
            let ambit = err.ambit();
            let source = ambit.source.text.as_slice();
            let Ok(source) = std::str::from_utf8(source) else {
                if i > 0 {
                    w.write_char('\n')?;
                }
                write!(w, "{err}")?;
                continue;
            };
            let range = adjust_range(ambit.start, ambit.end, source.len());
            let snippet = Snippet::source(source)
                .line_start(1)
                .path(&ambit.source.path)
                .annotation(AnnotationKind::Primary.span(range).label(err.message()));
            let title_group = Level::ERROR.primary_title(err.message()).element(snippet);
            let report: Vec<Group> = vec![title_group];
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }
        Ok(())
    }
}

fn adjust_range(start: usize, end: usize, limit: usize) -> std::ops::Range<usize> {
    if start == end {
        return start..(start + 1).min(limit);
    }
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use dusl_core::Source;

    #[test]
    fn renders_nothing_for_an_empty_batch() {
        let diagnostics = Diagnostics::new(Vec::new());
        assert_eq!(diagnostics.printer().render(), "");
    }

    #[test]
    fn renders_an_error_with_its_message() {
        let source = Source::from_string("1 + bad");
        let ambit = source.full_ambit().to(1);
        let diagnostics = Diagnostics::new(vec![LocatedError::new(ambit, "unexpected token")]);
        let rendered = diagnostics.printer().render();
        assert!(rendered.contains("unexpected token"), "{rendered}");
    }
}
