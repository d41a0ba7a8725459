//! Groups a flat token stream into a (possibly nested) list of [`Span`]s,
//! matching brackets declared via a precedence-over-bracket-pairs table.

use std::collections::HashMap;
use std::rc::Rc;

use dusl_core::{Source, Span, Token};

use crate::tokenizer::Tokenizer;
use crate::undent::undent;

pub struct Spanner {
    tokenizer: Tokenizer,
    precedence_b: HashMap<String, u32>,
}

impl Spanner {
    pub fn new(tokenizer: Tokenizer, precedence_b: HashMap<String, u32>) -> Spanner {
        Spanner {
            tokenizer,
            precedence_b,
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenizes `ambit` and groups the result into top-level spans. Any
    /// stray closing bracket is reported as an `ERR` span and skipped so
    /// scanning can continue.
    pub fn span(&self, ambit: &dusl_core::Ambit) -> Vec<Span> {
        let mut tokens = self.tokenizer.tokenize(ambit);
        let mut spans = Vec::new();
        loop {
            let (mut group, remaining) = self.span_inner(tokens);
            spans.append(&mut group);
            tokens = remaining;
            let Some(stray) = tokens.first() else { break };
            spans.push(Span {
                cat: "ERR".to_string(),
                lit: String::new(),
                err: format!("unexpected closing bracket: '{}'", stray.lit),
                ambit: stray.ambit.clone(),
                sub_ambit: None,
                children: Vec::new(),
            });
            tokens.remove(0);
        }
        spans
    }

    /// Consumes tokens until the first `CB` (or exhaustion), recursing on
    /// `OB` to build a `BB` span. Returns the spans built plus whatever
    /// tokens remain (starting at the terminating `CB`, if any).
    fn span_inner(&self, mut tokens: Vec<Token>) -> (Vec<Span>, Vec<Token>) {
        let mut spans = Vec::new();
        while let Some(token) = tokens.first() {
            if token.cat == "CB" {
                break;
            }
            let token = tokens.remove(0);
            if token.cat == "OB" {
                let (children, rest) = self.span_inner(tokens);
                tokens = rest;
                let Some(close) = tokens.first().cloned() else {
                    let ambit = match children.last() {
                        Some(last) => token.ambit.merge(&last.ambit),
                        None => token.ambit.clone(),
                    };
                    spans.push(Span {
                        cat: "ERR".to_string(),
                        lit: String::new(),
                        err: format!(
                            "missing closing bracket: corresponding to opening bracket: '{}'",
                            token.lit
                        ),
                        ambit,
                        sub_ambit: None,
                        children,
                    });
                    return (spans, tokens);
                };
                tokens.remove(0);
                let brcat = format!("{} {}", token.lit, close.lit);
                if close.cat != "CB" || !self.precedence_b.contains_key(&brcat) {
                    spans.push(Span {
                        cat: "ERR".to_string(),
                        lit: String::new(),
                        err: format!("non-matching brackets: '{brcat}'"),
                        ambit: token.ambit.merge(&close.ambit),
                        sub_ambit: None,
                        children,
                    });
                } else {
                    let sub_ambit = token.ambit.merge(&close.ambit).subtract_left(&token.ambit).subtract_right(&close.ambit);
                    spans.push(Span {
                        cat: "BB".to_string(),
                        lit: brcat,
                        err: String::new(),
                        ambit: token.ambit.merge(&close.ambit),
                        sub_ambit: Some(sub_ambit),
                        children,
                    });
                }
            } else {
                spans.push(Span {
                    cat: token.cat.clone(),
                    lit: token.lit.clone(),
                    err: token.err.clone(),
                    ambit: token.ambit.clone(),
                    sub_ambit: None,
                    children: Vec::new(),
                });
            }
        }
        (spans, tokens)
    }

    pub fn span_undent(&self, source: &Rc<Source>) -> Vec<(dusl_core::Ambit, Vec<Span>)> {
        let tree = undent(source);
        let mut out = Vec::new();
        collect_un_spans(&tree, self, &mut out);
        out
    }
}

fn collect_un_spans(
    node: &dusl_core::Syntax,
    spanner: &Spanner,
    out: &mut Vec<(dusl_core::Ambit, Vec<Span>)>,
) {
    if node.cat == "UN" {
        out.push((node.ambit.clone(), spanner.span(&node.ambit)));
        return;
    }
    if let Some(l) = node.left.as_deref() {
        collect_un_spans(l, spanner, out);
    }
    if let Some(r) = node.right.as_deref() {
        collect_un_spans(r, spanner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prfx::PrfxTree;
    use crate::scanner::{sequence_scanners, Scanner};

    fn test_spanner() -> Spanner {
        let mut brackets = PrfxTree::new();
        brackets.add("OB", "(");
        brackets.add("CB", ")");
        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(brackets), crate::scanner::default_scanner()];
        let tokenizer = Tokenizer::new(sequence_scanners(scanners));
        let mut precedence_b = HashMap::new();
        precedence_b.insert("( )".to_string(), 1);
        Spanner::new(tokenizer, precedence_b)
    }

    #[test]
    fn span_groups_brackets_into_bb_nodes() {
        let source = Source::from_string("(a b)");
        let spanner = test_spanner();
        let spans = spanner.span(&source.full_ambit());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].cat, "BB");
        assert_eq!(spans[0].lit, "( )");
        assert_eq!(spans[0].children.len(), 3);
    }

    #[test]
    fn stray_closing_bracket_becomes_err_span() {
        let source = Source::from_string("a)");
        let spanner = test_spanner();
        let spans = spanner.span(&source.full_ambit());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].cat, "ERR");
    }

    #[test]
    fn missing_closing_bracket_is_reported() {
        let source = Source::from_string("(a");
        let spanner = test_spanner();
        let spans = spanner.span(&source.full_ambit());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].cat, "ERR");
        assert!(spans[0].err.contains("missing closing bracket"));
    }
}
