//! Turns an [`Ambit`] into a flat list of [`Token`]s by repeatedly running
//! a [`Scanner`] forward and taking the furthest point at which it last
//! reported a category.

use std::rc::Rc;

use dusl_core::{Ambit, Source, Token};

use crate::scanner::Scanner;
use crate::undent::undent;

pub struct Tokenizer {
    scanner: Box<dyn Scanner>,
}

impl Tokenizer {
    pub fn new(scanner: Box<dyn Scanner>) -> Tokenizer {
        Tokenizer { scanner }
    }

    /// Finds the longest token recognized at the start of `ambit`. Returns
    /// `("", token_ambit, ambit)` when nothing at all is recognized
    /// (`token_ambit` is then empty).
    fn split_on_token(&self, ambit: &Ambit) -> (String, Ambit, Ambit) {
        let mut scan = self.scanner.scan();
        let mut token_cat = String::new();
        let mut token_end = ambit.start;
        for (offset, c) in ambit.to_str().char_indices() {
            let (cat, cont) = scan.consume(c);
            if !cat.is_empty() {
                token_cat = cat;
                token_end = ambit.start + offset + c.len_utf8();
            }
            if !cont {
                break;
            }
        }
        let (token_ambit, rest_ambit) = ambit.split_at_abs(token_end);
        (token_cat, token_ambit, rest_ambit)
    }

    /// Consumes characters one at a time until a token becomes
    /// recognizable again (or the ambit is exhausted), and returns the
    /// span that was skipped as unrecognized.
    fn split_on_error(&self, ambit: &Ambit) -> Ambit {
        let mut rest = ambit.clone();
        loop {
            if rest.is_empty() {
                return ambit.to(rest.start);
            }
            let mut chars = rest.to_str().chars();
            let Some(c) = chars.next() else {
                return ambit.to(rest.start);
            };
            let next_start = rest.start + c.len_utf8();
            let candidate = rest.from(next_start);
            let (cat, _, _) = self.split_on_token(&candidate);
            if !cat.is_empty() {
                return ambit.to(next_start);
            }
            rest = candidate;
        }
    }

    /// Tokenizes the whole of `ambit`, emitting `ERR` tokens for
    /// unrecognized stretches instead of failing.
    pub fn tokenize(&self, ambit: &Ambit) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut cursor = ambit.clone();
        while !cursor.is_empty() {
            let (cat, token_ambit, rest) = self.split_on_token(&cursor);
            if cat.is_empty() {
                let err_ambit = self.split_on_error(&cursor);
                let text = err_ambit.to_str().to_string();
                tokens.push(Token {
                    cat: "ERR".to_string(),
                    lit: text.clone(),
                    err: format!("unexpected character(s): '{text}'"),
                    ambit: err_ambit.clone(),
                });
                cursor = cursor.from(err_ambit.end);
            } else {
                let lit = token_ambit.to_str().to_string();
                tokens.push(Token {
                    cat,
                    lit,
                    err: String::new(),
                    ambit: token_ambit,
                });
                cursor = rest;
            }
        }
        tokens
    }

    /// Maps every `UN` leaf of an undented source through [`Self::tokenize`],
    /// for callers that only need a flat token view of a whole source
    /// rather than the full undent tree.
    pub fn tokenize_undent(&self, source: &Rc<Source>) -> Vec<(Ambit, Vec<Token>)> {
        let tree = undent(source);
        let mut out = Vec::new();
        collect_un_tokens(&tree, self, &mut out);
        out
    }
}

fn collect_un_tokens(node: &dusl_core::Syntax, tokenizer: &Tokenizer, out: &mut Vec<(Ambit, Vec<Token>)>) {
    if node.cat == "UN" {
        out.push((node.ambit.clone(), tokenizer.tokenize(&node.ambit)));
        return;
    }
    if let Some(l) = node.left.as_deref() {
        collect_un_tokens(l, tokenizer, out);
    }
    if let Some(r) = node.right.as_deref() {
        collect_un_tokens(r, tokenizer, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prfx::PrfxTree;
    use crate::scanner::{sequence_scanners, Scanner};

    fn test_tokenizer() -> Tokenizer {
        let mut ops = PrfxTree::new();
        ops.add("OP", "+=");
        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(ops), crate::scanner::default_scanner()];
        Tokenizer::new(sequence_scanners(scanners))
    }

    #[test]
    fn tokenize_splits_identifiers_operators_and_whitespace() {
        let source = Source::from_string("a += 1");
        let tokenizer = test_tokenizer();
        let tokens = tokenizer.tokenize(&source.full_ambit());
        let cats: Vec<&str> = tokens.iter().map(|t| t.cat.as_str()).collect();
        assert_eq!(cats, vec!["ID", "WS", "OP", "WS", "NUM"]);
    }

    #[test]
    fn tokenize_emits_err_for_unrecognized_characters() {
        let source = Source::from_string("a @ b");
        let tokenizer = test_tokenizer();
        let tokens = tokenizer.tokenize(&source.full_ambit());
        let err = tokens.iter().find(|t| t.cat == "ERR").expect("expected an ERR token");
        assert_eq!(err.lit, "@");
        assert_eq!(err.err, "unexpected character(s): '@'");
    }
}
