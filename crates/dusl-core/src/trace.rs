use std::collections::HashSet;
use std::io::{self, Write};

use crate::{Dump, Syntax};

/// A compiled grammar-rule shape: matches a `Syntax` node's category and/or
/// literal, optionally recursing into `left`/`right` for infix/prefix/
/// postfix rule bodies. A `lbl`-bearing node (an `X`, `XSN`, ... reference
/// inside a rule) marks a point where tracing should recurse independently
/// rather than being matched inline.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub lbl: String,
    pub sub_count: usize,
    pub match_cat: bool,
    pub cat: String,
    pub match_lit: bool,
    pub lit: String,
    pub lit_set: Option<HashSet<String>>,
    pub left: Option<Box<Template>>,
    pub right: Option<Box<Template>>,
}

impl Template {
    pub fn checks_match(&self, node: Option<&Syntax>) -> bool {
        let Some(node) = node else { return false };
        if self.match_cat && self.cat != node.cat {
            return false;
        }
        if self.match_lit {
            let matches = match &self.lit_set {
                Some(set) => set.contains(&node.lit),
                None => self.lit == node.lit,
            };
            if !matches {
                return false;
            }
        }
        if self.left.is_some() {
            let left_ok = self
                .left
                .as_deref()
                .unwrap()
                .checks_match(node.left.as_deref());
            let right_ok = self
                .right
                .as_deref()
                .unwrap()
                .checks_match(node.right.as_deref());
            return left_ok && right_ok;
        }
        true
    }
}

/// A node of the trace tree: the rule label it was traced under, which
/// numbered alternative matched (`idx`), the underlying syntax node, an
/// error message when no alternative matched (`lbl` is then rewritten to
/// `"ERR"`), and one sub-trace per label reference inside the matched
/// template.
#[derive(Debug, Clone)]
pub struct Trace {
    pub lbl: String,
    pub idx: usize,
    pub syn: Syntax,
    pub err: String,
    pub subs: Vec<Option<Trace>>,
}

impl Trace {
    pub fn is_error(&self) -> bool {
        self.lbl == "ERR"
    }

    /// Errors inherited from the underlying syntax tree, followed by
    /// trace-level errors (nodes where no template alternative matched),
    /// both gathered in pre-order.
    pub fn errors(&self) -> Vec<crate::LocatedError> {
        let mut errs: Vec<crate::LocatedError> = self
            .syn
            .errors()
            .into_iter()
            .collect();
        self.gather_trace_errors(&mut errs);
        errs
    }

    fn gather_trace_errors(&self, errs: &mut Vec<crate::LocatedError>) {
        if self.is_error() {
            errs.push(crate::LocatedError::new(self.syn.ambit.clone(), self.err.clone()));
        }
        for sub in self.subs.iter().flatten() {
            sub.gather_trace_errors(errs);
        }
    }

    fn dump_raw(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        writeln!(
            out,
            "{prefix}{}:{}:{}:{}:{}",
            self.lbl, self.idx, self.syn.cat, self.syn.lit, self.syn.ambit
        )?;
        let nested = format!("{prefix}  ");
        for sub in self.subs.iter().flatten() {
            sub.dump_raw(out, &nested)?;
        }
        Ok(())
    }

    fn dump_pretty(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        let text = if self.is_error() { &self.err } else { &self.syn.lit };
        writeln!(out, "{prefix}{}:{}:{}", self.lbl, self.idx, text)?;
        let nested = format!("{prefix}  ");
        for sub in self.subs.iter().flatten() {
            sub.dump_pretty(out, &nested)?;
        }
        Ok(())
    }
}

impl Dump for Trace {
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

    fn leaf(cat: &str, lit: &str) -> Syntax {
        let a = Source::from_string(lit).full_ambit();
        Syntax {
            cat: cat.to_string(),
            lit: lit.to_string(),
            err: String::new(),
            ambit: a,
            op_ambit: None,
            left: None,
            right: None,
        }
    }

    #[test]
    fn template_matches_category_and_literal() {
        let template = Template {
            match_cat: true,
            cat: "NUM".to_string(),
            ..Default::default()
        };
        assert!(template.checks_match(Some(&leaf("NUM", "1"))));
        assert!(!template.checks_match(Some(&leaf("ID", "x"))));
        assert!(!template.checks_match(None));
    }

    #[test]
    fn trace_errors_include_inherited_syntax_errors_first() {
        let syn = Syntax::error("bad token", Source::from_string("x").full_ambit());
        let trace = Trace {
            lbl: "ERR".to_string(),
            idx: 0,
            syn,
            err: "expected: X".to_string(),
            subs: Vec::new(),
        };
        let errs = trace.errors();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].message(), "bad token");
        assert_eq!(errs[1].message(), "expected: X");
    }
}
