use std::cell::OnceCell;

use thiserror::Error;

use crate::Ambit;

/// A located syntax error: an [`Ambit`] pinpointing where, plus a message.
/// `Display` is memoized the first time it is formatted, mirroring the
/// original's lazily-computed `Error()` string.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct LocatedError {
    ambit: Ambit,
    msg: String,
    rendered: OnceCell<String>,
}

impl LocatedError {
    pub fn new(ambit: Ambit, msg: impl Into<String>) -> LocatedError {
        LocatedError {
            ambit,
            msg: msg.into(),
            rendered: OnceCell::new(),
        }
    }

    pub fn ambit(&self) -> &Ambit {
        &self.ambit
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    fn render(&self) -> &str {
        self.rendered
            .get_or_init(|| format!("{}: {}", self.ambit.location(), self.msg))
    }
}

/// Summarizes a batch of [`LocatedError`]s into one error: the first `n`
/// formatted in full, then a trailing `and <k> more error(s)` line if
/// truncated. A negative `n` reports every error. `Display` is memoized on
/// first format.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct SummaryError {
    errs: Vec<LocatedError>,
    n: isize,
    rendered: OnceCell<String>,
}

impl SummaryError {
    /// Returns `None` when there is nothing to summarize (matching the
    /// original's `nil` return for an empty error list or `n == 0`).
    pub fn new(errs: Vec<LocatedError>, n: isize) -> Option<SummaryError> {
        if errs.is_empty() || n == 0 {
            return None;
        }
        Some(SummaryError {
            errs,
            n,
            rendered: OnceCell::new(),
        })
    }

    pub fn errors(&self) -> &[LocatedError] {
        &self.errs
    }

    fn render(&self) -> &str {
        self.rendered.get_or_init(|| {
            let mut buf = String::new();
            for (index, err) in self.errs.iter().enumerate() {
                if self.n < 0 || (index as isize) < self.n {
                    buf.push_str(&err.to_string());
                    buf.push('\n');
                } else if index as isize == self.n {
                    buf.push_str(&format!("and {} more error(s)\n", self.errs.len() - index));
                    break;
                } else {
                    break;
                }
            }
            buf
        })
    }
}

/// A declarative error returned from grammar/spec compilation: either a
/// single configuration problem (double declaration, reserved-symbol
/// conflict, ...) or a batch of up to 20 grammar-template errors collected
/// while compiling a `Grammar(...)` text.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("{0}")]
    Config(String),
    #[error("{}", render_grammar_errors(.0))]
    Rules(Vec<LocatedError>),
}

fn render_grammar_errors(errs: &[LocatedError]) -> String {
    const LIMIT: usize = 20;
    let mut buf = String::new();
    for (index, err) in errs.iter().enumerate() {
        if index < LIMIT {
            buf.push_str(&err.to_string());
            buf.push('\n');
        } else if index == LIMIT {
            buf.push_str(&format!("and {} more error(s)\n", errs.len() - LIMIT));
            break;
        } else {
            break;
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn located_error_memoizes_display() {
        let src = Source::from_string("abc");
        let ambit = src.full_ambit().to(1);
        let err = LocatedError::new(ambit, "boom");
        assert_eq!(err.to_string(), "str:1:0:1: boom");
        assert_eq!(err.to_string(), "str:1:0:1: boom");
    }

    #[test]
    fn summary_error_truncates_with_count() {
        let src = Source::from_string("abc");
        let a = src.full_ambit();
        let errs = vec![
            LocatedError::new(a.clone(), "one"),
            LocatedError::new(a.clone(), "two"),
            LocatedError::new(a.clone(), "three"),
        ];
        let summary = SummaryError::new(errs, 2).unwrap();
        let rendered = summary.to_string();
        assert!(rendered.contains("one"));
        assert!(rendered.contains("two"));
        assert!(rendered.contains("and 1 more error(s)"));
        assert!(!rendered.contains("three"));
    }

    #[test]
    fn summary_error_of_empty_list_is_none() {
        assert!(SummaryError::new(Vec::new(), 5).is_none());
    }
}
