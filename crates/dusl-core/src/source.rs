use std::rc::Rc;

use crate::Ambit;

/// An immutable in-memory text buffer, identified by a path for error
/// messages and an optional line-number offset (for text embedded inside a
/// larger file, e.g. a grammar string).
#[derive(Debug)]
pub struct Source {
    pub path: String,
    pub line_offset: usize,
    pub text: Vec<u8>,
}

impl Source {
    pub fn new(path: impl Into<String>, text: impl Into<Vec<u8>>) -> Rc<Source> {
        Rc::new(Source {
            path: path.into(),
            line_offset: 0,
            text: text.into(),
        })
    }

    pub fn with_line_offset(
        path: impl Into<String>,
        line_offset: usize,
        text: impl Into<Vec<u8>>,
    ) -> Rc<Source> {
        Rc::new(Source {
            path: path.into(),
            line_offset,
            text: text.into(),
        })
    }

    pub fn from_string(text: impl Into<String>) -> Rc<Source> {
        Source::new("str", text.into().into_bytes())
    }

    /// Converts a byte offset into a 1-based (line, column) pair. `\r`,
    /// `\n`, and `\r\n` all count as a single line terminator.
    pub fn line_column(&self, pos: usize) -> (usize, usize) {
        let mut line_num = 1 + self.line_offset;
        let mut col_num = 0usize;
        let mut just_read_cr = false;
        for &c in &self.text[..pos.min(self.text.len())] {
            match c {
                b'\r' => {
                    line_num += 1;
                    col_num = 0;
                    just_read_cr = true;
                }
                b'\n' => {
                    if !just_read_cr {
                        line_num += 1;
                        col_num = 0;
                    }
                    just_read_cr = false;
                }
                _ => {
                    col_num += 1;
                    just_read_cr = false;
                }
            }
        }
        (line_num, col_num)
    }

    /// The ambit spanning the whole source, with a leading UTF-8 BOM and a
    /// leading `#`-introduced shebang/header line stripped.
    pub fn full_ambit(self: &Rc<Self>) -> Ambit {
        let text = &self.text;
        let mut start = 0;
        let end = text.len();
        if end >= 3 && text[0] == 0xEF && text[1] == 0xBB && text[2] == 0xBF {
            start += 3;
        }
        let ambit = Ambit {
            source: Rc::clone(self),
            start,
            end,
        };
        if start < end && text[start] == b'#' {
            let (_, rest) = ambit.split_line();
            rest
        } else {
            ambit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_counts_crlf_as_one_terminator() {
        let source = Source::from_string("ab\r\ncd");
        assert_eq!(source.line_column(0), (1, 0));
        assert_eq!(source.line_column(2), (1, 2));
        assert_eq!(source.line_column(4), (2, 0));
        assert_eq!(source.line_column(5), (2, 1));
    }

    #[test]
    fn full_ambit_strips_bom_and_shebang() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"#!/usr/bin/env dusl\nbody");
        let source = Source::new("f", bytes);
        let ambit = source.full_ambit();
        assert_eq!(ambit.to_str(), "body");
    }

    #[test]
    fn line_offset_shifts_reported_line() {
        let source = Source::with_line_offset("f", 91, "x");
        assert_eq!(source.line_column(0), (92, 0));
    }
}
