use std::io::{self, Write};

use crate::error::LocatedError;
use crate::{Ambit, Dump};

/// A binary parse tree node. Empty nodes (`cat == ""`) stand in for "no
/// argument here" on operators that are not fully binary (a prefix
/// operator's left, a postfix operator's right, a nullary operator's
/// both sides) and for the terminal marker at the end of an undented
/// sequence.
#[derive(Debug, Clone)]
pub struct Syntax {
    pub cat: String,
    pub lit: String,
    pub err: String,
    pub ambit: Ambit,
    pub op_ambit: Option<Ambit>,
    pub left: Option<Box<Syntax>>,
    pub right: Option<Box<Syntax>>,
}

impl Syntax {
    /// The canonical empty placeholder: category `""`, no children.
    pub fn empty(ambit: Ambit) -> Syntax {
        Syntax {
            cat: String::new(),
            lit: String::new(),
            err: String::new(),
            ambit,
            op_ambit: None,
            left: None,
            right: None,
        }
    }

    pub fn error(message: impl Into<String>, ambit: Ambit) -> Syntax {
        Syntax {
            cat: "ERR".to_string(),
            lit: String::new(),
            err: message.into(),
            ambit,
            op_ambit: None,
            left: None,
            right: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cat.is_empty()
    }

    fn child_is_empty(child: &Option<Box<Syntax>>) -> bool {
        child.as_deref().is_none_or(Syntax::is_empty)
    }

    /// True iff this is an `OP` node with no left and no right argument.
    pub fn is_zeroary_op(&self, lit: &str) -> bool {
        self.cat == "OP"
            && Self::child_is_empty(&self.left)
            && Self::child_is_empty(&self.right)
            && (lit.is_empty() || self.lit == lit)
    }

    /// True iff this is an `OP` node with only a right argument.
    pub fn is_prefix_op(&self, lit: &str) -> bool {
        self.cat == "OP"
            && Self::child_is_empty(&self.left)
            && !Self::child_is_empty(&self.right)
            && (lit.is_empty() || self.lit == lit)
    }

    /// True iff this is an `OP` node with only a left argument.
    pub fn is_postfix_op(&self, lit: &str) -> bool {
        self.cat == "OP"
            && !Self::child_is_empty(&self.left)
            && Self::child_is_empty(&self.right)
            && (lit.is_empty() || self.lit == lit)
    }

    /// True iff this is an `OP` node with both a left and a right argument.
    pub fn is_infix_op(&self, lit: &str) -> bool {
        self.cat == "OP"
            && !Self::child_is_empty(&self.left)
            && !Self::child_is_empty(&self.right)
            && (lit.is_empty() || self.lit == lit)
    }

    /// First node in pre-order, left-to-right traversal matching `cat`
    /// and `lit` (empty string wildcards either).
    pub fn first(&self, cat: &str, lit: &str) -> Option<&Syntax> {
        if (cat.is_empty() || self.cat == cat) && (lit.is_empty() || self.lit == lit) {
            return Some(self);
        }
        if let Some(found) = self.left.as_deref().and_then(|l| l.first(cat, lit)) {
            return Some(found);
        }
        self.right.as_deref().and_then(|r| r.first(cat, lit))
    }

    /// First `n` nodes (pre-order, left-to-right) matching `cat`/`lit`.
    /// Negative `n` collects every match.
    pub fn first_n(&self, cat: &str, lit: &str, n: isize) -> Vec<&Syntax> {
        let mut list = Vec::new();
        self.list_first_n(&mut list, cat, lit, n);
        list
    }

    fn list_first_n<'a>(&'a self, list: &mut Vec<&'a Syntax>, cat: &str, lit: &str, n: isize) {
        if n >= 0 && list.len() as isize >= n {
            return;
        }
        if (cat.is_empty() || self.cat == cat) && (lit.is_empty() || self.lit == lit) {
            list.push(self);
        }
        if let Some(l) = self.left.as_deref() {
            l.list_first_n(list, cat, lit, n);
        }
        if let Some(r) = self.right.as_deref() {
            r.list_first_n(list, cat, lit, n);
        }
    }

    /// All `ERR` nodes gathered in pre-order, as located errors.
    pub fn errors(&self) -> Vec<LocatedError> {
        let mut errs = Vec::new();
        self.gather_errors(&mut errs);
        errs
    }

    fn gather_errors(&self, errs: &mut Vec<LocatedError>) {
        if self.cat == "ERR" {
            errs.push(LocatedError::new(self.ambit.clone(), self.err.clone()));
            return;
        }
        if let Some(l) = self.left.as_deref() {
            l.gather_errors(errs);
        }
        if let Some(r) = self.right.as_deref() {
            r.gather_errors(errs);
        }
    }

    fn dump_raw(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        writeln!(out, "{prefix}{}:{}:{}:{}", self.cat, self.lit, self.err, self.ambit)?;
        let nested = format!("{prefix}  ");
        if let Some(l) = self.left.as_deref() {
            l.dump_raw(out, &nested)?;
        }
        if let Some(r) = self.right.as_deref() {
            r.dump_raw(out, &nested)?;
        }
        Ok(())
    }

    fn dump_pretty(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        match self.cat.as_str() {
            "SQ" => {
                if let Some(l) = self.left.as_deref() {
                    l.dump_pretty(out, prefix)?;
                }
                if let Some(r) = self.right.as_deref() {
                    if !r.cat.is_empty() {
                        r.dump_pretty(out, prefix)?;
                    }
                }
                return Ok(());
            }
            "SN" => {
                if let Some(l) = self.left.as_deref() {
                    l.dump_pretty(out, prefix)?;
                }
                if let Some(r) = self.right.as_deref() {
                    if !r.cat.is_empty() {
                        r.dump_pretty(out, &format!("{prefix}| "))?;
                    }
                }
                return Ok(());
            }
            "UN" => {
                if self.lit.is_empty() {
                    write!(out, "{prefix}{}", self.ambit.to_str())?;
                } else {
                    writeln!(out, "{prefix}{}", self.lit)?;
                }
                return Ok(());
            }
            _ => {}
        }
        let lit = if self.cat == "ERR" { &self.err } else { &self.lit };
        writeln!(out, "{prefix}{}:{}", self.cat, lit)?;
        let nested = format!("{prefix}  ");
        if let Some(l) = self.left.as_deref() {
            l.dump_pretty(out, &nested)?;
        }
        if let Some(r) = self.right.as_deref() {
            r.dump_pretty(out, &nested)?;
        }
        Ok(())
    }
}

impl Dump for Syntax {
    fn dump(&self, out: &mut dyn Write, prefix: &str, pretty: bool) -> io::Result<()> {
        if pretty {
            self.dump_pretty(out, prefix)
        } else {
            self.dump_raw(out, prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    fn leaf(cat: &str, lit: &str, ambit: Ambit) -> Syntax {
        Syntax {
            cat: cat.to_string(),
            lit: lit.to_string(),
            err: String::new(),
            ambit,
            op_ambit: None,
            left: None,
            right: None,
        }
    }

    #[test]
    fn binding_pattern_queries_match_op_shape() {
        let src = Source::from_string("x");
        let a = src.full_ambit();
        let zeroary = Syntax {
            cat: "OP".to_string(),
            lit: "const".to_string(),
            err: String::new(),
            ambit: a.clone(),
            op_ambit: None,
            left: Some(Box::new(Syntax::empty(a.collapse_left()))),
            right: Some(Box::new(Syntax::empty(a.collapse_right()))),
        };
        assert!(zeroary.is_zeroary_op(""));
        assert!(zeroary.is_zeroary_op("const"));
        assert!(!zeroary.is_zeroary_op("other"));
        assert!(!zeroary.is_prefix_op(""));

        let prefix = Syntax {
            left: Some(Box::new(Syntax::empty(a.collapse_left()))),
            right: Some(Box::new(leaf("ID", "x", a.clone()))),
            ..zeroary.clone()
        };
        assert!(prefix.is_prefix_op(""));
        assert!(!prefix.is_infix_op(""));
    }

    #[test]
    fn errors_are_gathered_pre_order() {
        let src = Source::from_string("a b");
        let a = src.full_ambit();
        let tree = Syntax {
            cat: "GLUE".to_string(),
            lit: String::new(),
            err: String::new(),
            ambit: a.clone(),
            op_ambit: None,
            left: Some(Box::new(Syntax::error("left bad", a.to(1)))),
            right: Some(Box::new(Syntax::error("right bad", a.from(2)))),
        };
        let errs = tree.errors();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].message(), "left bad");
        assert_eq!(errs[1].message(), "right bad");
    }

    #[test]
    fn dump_raw_matches_expected_shape() {
        let src = Source::from_string("1");
        let a = src.full_ambit();
        let node = leaf("NUM", "1", a);
        let mut buf = Vec::new();
        node.dump(&mut buf, "> ", false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "> NUM:1::str[0:1]\n");
    }
}
