//! A prefix trie over operator/bracket literals. Used both as the target
//! language's operator scanner and, with an extended literal set, as the
//! scanner for grammar text itself.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::scanner::{Scan, Scanner};

#[derive(Default)]
pub struct PrfxTree {
    cat: String,
    children: BTreeMap<char, PrfxTree>,
}

impl PrfxTree {
    pub fn new() -> PrfxTree {
        PrfxTree::default()
    }

    pub fn add(&mut self, cat: &str, lit: &str) {
        let mut node = self;
        for c in lit.chars() {
            node = node.children.entry(c).or_default();
        }
        node.cat = cat.to_string();
    }

    /// Looks up the category of a literal previously declared verbatim
    /// (not a prefix walk: `lit` must match exactly).
    pub fn lookup(&self, lit: &str) -> String {
        let mut node = self;
        for c in lit.chars() {
            match node.children.get(&c) {
                Some(next) => node = next,
                None => return String::new(),
            }
        }
        node.cat.clone()
    }

    pub fn dump(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        for (c, child) in &self.children {
            let nested = format!("{prefix}{c}");
            if child.cat.is_empty() {
                writeln!(out, "{nested} ...")?;
            } else {
                writeln!(out, "{nested} [accept] {:?}", child.cat)?;
            }
            child.dump(out, &nested)?;
        }
        Ok(())
    }

    pub fn dump_to_string(&self) -> String {
        let mut buf = Vec::new();
        self.dump(&mut buf, "pt> ").expect("in-memory write never fails");
        String::from_utf8(buf).expect("dump output is always valid UTF-8")
    }
}

impl Scanner for PrfxTree {
    fn scan(&self) -> Box<dyn Scan + '_> {
        Box::new(PrfxTreeScan {
            root: self,
            state: self,
        })
    }
}

struct PrfxTreeScan<'a> {
    root: &'a PrfxTree,
    state: &'a PrfxTree,
}

impl<'a> Scan for PrfxTreeScan<'a> {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state.children.get(&c) {
            Some(next) => {
                self.state = next;
                (next.cat.clone(), !next.children.is_empty())
            }
            None => (String::new(), false),
        }
    }
    fn reset(&mut self) {
        self.state = self.root;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_exact_declared_literal() {
        let mut tree = PrfxTree::new();
        tree.add("OP", "+=");
        tree.add("OP", "++");
        assert_eq!(tree.lookup("+="), "OP");
        assert_eq!(tree.lookup("+"), "");
    }

    #[test]
    fn consume_walks_and_continues_while_more_children_remain() {
        let mut tree = PrfxTree::new();
        tree.add("OP", "++");
        tree.add("OP", "+");
        let mut scan = tree.scan();
        let (cat, cont) = scan.consume('+');
        assert_eq!(cat, "OP");
        assert!(cont);
        let (cat, cont) = scan.consume('+');
        assert_eq!(cat, "OP");
        assert!(!cont);
    }

    #[test]
    fn dump_reports_sorted_children_with_accept_markers() {
        let mut tree = PrfxTree::new();
        tree.add("OP", "++");
        let dumped = tree.dump_to_string();
        assert!(dumped.contains("pt> + ...\n"));
        assert!(dumped.contains("pt> ++ [accept] \"OP\"\n"));
    }
}
