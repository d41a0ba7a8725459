//! The Sparser ("superpermissive parser"): turns a flat span sequence into
//! a fully split binary [`Syntax`] tree using the five binding-pattern
//! precedence tables. Never fails — unparseable structure becomes an
//! `ERR` node inside the tree rather than a `Result::Err`.

use std::rc::Rc;

use dusl_core::{Ambit, Source, Span, Syntax};

use crate::precedence::{PrecedenceTables, MAX_PRECEDENCE};
use crate::spanner::Spanner;
use crate::undent::undent;

pub struct Sparser {
    spanner: Spanner,
    precedence: PrecedenceTables,
}

impl Sparser {
    pub fn new(spanner: Spanner, precedence: PrecedenceTables) -> Sparser {
        Sparser { spanner, precedence }
    }

    pub fn spanner(&self) -> &Spanner {
        &self.spanner
    }

    /// Sparses a single ambit (one unparsed sentence) into a binary tree.
    pub fn sparse(&self, ambit: &Ambit) -> Syntax {
        let spans = self.spanner.span(ambit);
        self.sparse_spans(ambit.clone(), &spans, 1)
    }

    /// Undents `source`, then replaces each `UN` leaf with the result of
    /// sparsing its ambit, rebuilding the tree top-down (there is no
    /// mutation pass here: `Syntax` has no interior mutability).
    pub fn sparse_undent(&self, source: &Rc<Source>) -> Syntax {
        self.sparse_sq(undent(source))
    }

    fn sparse_sq(&self, node: Syntax) -> Syntax {
        match node.cat.as_str() {
            "SQ" => Syntax {
                left: node.left.map(|l| Box::new(self.sparse_sq(*l))),
                right: node.right.map(|r| Box::new(self.sparse_sq(*r))),
                ..node
            },
            "SN" => {
                let un = node.left.expect("SN always carries a UN left child");
                let sparsed = self.sparse(&un.ambit);
                Syntax {
                    left: Some(Box::new(sparsed)),
                    right: node.right.map(|r| Box::new(self.sparse_sq(*r))),
                    ..node
                }
            }
            _ => node,
        }
    }

    fn is_exclusively_zeroary(&self, lit: &str) -> bool {
        self.precedence.efe.contains_key(lit)
            && !self.precedence.efa.contains_key(lit)
            && !self.precedence.afe.contains_key(lit)
            && !self.precedence.afb.contains_key(lit)
            && !self.precedence.bfa.contains_key(lit)
    }

    fn sparse_leaf(&self, ambit: &Ambit, span: &Span, min_precedence: u32) -> Syntax {
        let lit = &span.lit;
        if span.children.is_empty() {
            if span.cat == "OP" {
                let prec = self.precedence.efe.get(lit).copied().unwrap_or(0);
                if prec < min_precedence {
                    return Syntax::error(format!("unexpected: {lit}"), ambit.clone());
                }
                return Syntax {
                    cat: "OP".to_string(),
                    lit: lit.clone(),
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(span.ambit.clone()),
                    left: Some(Box::new(Syntax::empty(span.ambit.collapse_left()))),
                    right: Some(Box::new(Syntax::empty(span.ambit.collapse_right()))),
                };
            }
            return Syntax {
                cat: span.cat.clone(),
                lit: lit.clone(),
                err: span.err.clone(),
                ambit: ambit.clone(),
                op_ambit: Some(span.ambit.clone()),
                left: None,
                right: None,
            };
        }
        // span.cat == "BB"
        let Some(&prec) = self.precedence.b.get(lit) else {
            return Syntax::error(format!("unexpected: {lit}"), ambit.clone());
        };
        Syntax {
            cat: span.cat.clone(),
            lit: lit.clone(),
            err: String::new(),
            ambit: span.ambit.clone(),
            op_ambit: None,
            left: Some(Box::new(self.sparse_spans(
                span.sub_ambit.clone().expect("BB span always carries a sub-ambit"),
                &span.children,
                prec,
            ))),
            right: Some(Box::new(Syntax::empty(span.ambit.collapse_right()))),
        }
    }

    fn sparse_spans(&self, ambit: Ambit, spans: &[Span], min_precedence: u32) -> Syntax {
        let (ambit, spans) = trim_spans(ambit, spans);
        if spans.is_empty() {
            return Syntax::empty(ambit);
        }
        if spans.len() == 1 {
            return self.sparse_leaf(&ambit, &spans[0], min_precedence);
        }
        let l = spans.len() - 1;

        if spans[0].cat != "OP" && spans[1].cat == "WS" {
            let juxtaposition = if spans.len() == 2 {
                true
            } else {
                let cat = spans[2].cat.as_str();
                cat != "ERR" && (cat != "OP" || self.is_exclusively_zeroary(&spans[2].lit))
            };
            if juxtaposition {
                let ws = &spans[1];
                return Syntax {
                    cat: "JUXT".to_string(),
                    lit: " ".to_string(),
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(ws.ambit.clone()),
                    left: Some(Box::new(self.sparse_spans(spans[0].ambit.clone(), &spans[..1], min_precedence))),
                    right: Some(Box::new(self.sparse_spans(
                        ambit.subtract_left(&ws.ambit),
                        &spans[1..],
                        min_precedence,
                    ))),
                };
            }
        }

        let mut split_loc: Option<usize> = None;
        let mut split_precedence = MAX_PRECEDENCE + 1;
        let mut split_prec_left = 0u32;
        let mut split_prec_right = 0u32;

        if spans[0].cat == "OP" {
            let lit = spans[0].lit.clone();
            let op_ambit = spans[0].ambit.clone();
            let prec = self.precedence.efa.get(&lit).copied().unwrap_or(0);
            if prec == min_precedence {
                return Syntax {
                    cat: "OP".to_string(),
                    lit,
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(op_ambit.clone()),
                    left: Some(Box::new(Syntax::empty(op_ambit.collapse_left()))),
                    right: Some(Box::new(self.sparse_spans(ambit.subtract_left(&op_ambit), &spans[1..], prec))),
                };
            }
            if prec > min_precedence && prec < split_precedence {
                split_loc = Some(0);
                split_precedence = prec;
                split_prec_right = prec;
            }
        }

        if spans[l].cat == "OP" {
            let lit = spans[l].lit.clone();
            let op_ambit = spans[l].ambit.clone();
            let prec = self.precedence.afe.get(&lit).copied().unwrap_or(0);
            if prec == min_precedence {
                return Syntax {
                    cat: "OP".to_string(),
                    lit,
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(op_ambit.clone()),
                    left: Some(Box::new(self.sparse_spans(ambit.subtract_right(&op_ambit), &spans[..l], prec))),
                    right: Some(Box::new(Syntax::empty(op_ambit.collapse_right()))),
                };
            }
            if prec >= min_precedence && prec < split_precedence {
                split_loc = Some(l);
                split_precedence = prec;
                split_prec_left = prec;
            }
        }

        for index_lr in 1..l {
            if spans[index_lr].cat == "OP" {
                let lit = spans[index_lr].lit.clone();
                let prec = self.precedence.afb.get(&lit).copied().unwrap_or(0);
                if prec >= min_precedence
                    && prec < split_precedence
                    && self.check_infix_candidate(spans, index_lr, prec, prec + 1)
                {
                    if prec == min_precedence {
                        let op_ambit = spans[index_lr].ambit.clone();
                        return Syntax {
                            cat: "OP".to_string(),
                            lit,
                            err: String::new(),
                            ambit: ambit.clone(),
                            op_ambit: Some(op_ambit.clone()),
                            left: Some(Box::new(self.sparse_spans(
                                ambit.subtract_right(&op_ambit),
                                &spans[..index_lr],
                                prec + 1,
                            ))),
                            right: Some(Box::new(self.sparse_spans(
                                ambit.subtract_left(&op_ambit),
                                &spans[index_lr + 1..],
                                prec,
                            ))),
                        };
                    }
                    split_loc = Some(index_lr);
                    split_precedence = prec;
                    split_prec_left = prec + 1;
                    split_prec_right = prec;
                }
            }
            let index_rl = l - index_lr;
            if spans[index_rl].cat == "OP" {
                let lit = spans[index_rl].lit.clone();
                let prec = self.precedence.bfa.get(&lit).copied().unwrap_or(0);
                if prec >= min_precedence
                    && prec < split_precedence
                    && self.check_infix_candidate(spans, index_rl, prec + 1, prec)
                {
                    if prec == min_precedence {
                        let op_ambit = spans[index_rl].ambit.clone();
                        return Syntax {
                            cat: "OP".to_string(),
                            lit,
                            err: String::new(),
                            ambit: ambit.clone(),
                            op_ambit: Some(op_ambit.clone()),
                            left: Some(Box::new(self.sparse_spans(
                                ambit.subtract_right(&op_ambit),
                                &spans[..index_rl],
                                prec,
                            ))),
                            right: Some(Box::new(self.sparse_spans(
                                ambit.subtract_left(&op_ambit),
                                &spans[index_rl + 1..],
                                prec + 1,
                            ))),
                        };
                    }
                    split_loc = Some(index_rl);
                    split_precedence = prec;
                    split_prec_left = prec;
                    split_prec_right = prec + 1;
                }
            }
        }

        if let Some(loc) = split_loc {
            let split_span = spans[loc].clone();
            if loc == 0 {
                return Syntax {
                    cat: split_span.cat,
                    lit: split_span.lit,
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(split_span.ambit.clone()),
                    left: Some(Box::new(Syntax::empty(split_span.ambit.collapse_left()))),
                    right: Some(Box::new(self.sparse_spans(
                        ambit.subtract_left(&split_span.ambit),
                        &spans[1..],
                        split_prec_right,
                    ))),
                };
            }
            if loc == l {
                return Syntax {
                    cat: split_span.cat,
                    lit: split_span.lit,
                    err: String::new(),
                    ambit: ambit.clone(),
                    op_ambit: Some(split_span.ambit.clone()),
                    left: Some(Box::new(self.sparse_spans(
                        ambit.subtract_right(&split_span.ambit),
                        &spans[..l],
                        split_prec_left,
                    ))),
                    right: Some(Box::new(Syntax::empty(split_span.ambit.collapse_right()))),
                };
            }
            return Syntax {
                cat: split_span.cat,
                lit: split_span.lit,
                err: String::new(),
                ambit: ambit.clone(),
                op_ambit: Some(split_span.ambit.clone()),
                left: Some(Box::new(self.sparse_spans(
                    ambit.subtract_right(&split_span.ambit),
                    &spans[..loc],
                    split_prec_left,
                ))),
                right: Some(Box::new(self.sparse_spans(
                    ambit.subtract_left(&split_span.ambit),
                    &spans[loc + 1..],
                    split_prec_right,
                ))),
            };
        }

        let first_span = spans[0].ambit.clone();
        let second_span = spans[1].ambit.clone();
        if spans[1].cat == "WS" {
            return Syntax {
                cat: "JUXT".to_string(),
                lit: " ".to_string(),
                err: String::new(),
                ambit: ambit.clone(),
                op_ambit: Some(second_span.clone()),
                left: Some(Box::new(self.sparse_spans(
                    ambit.subtract_right(&second_span),
                    &spans[..1],
                    min_precedence,
                ))),
                right: Some(Box::new(self.sparse_spans(
                    ambit.subtract_left(&second_span),
                    &spans[2..],
                    min_precedence,
                ))),
            };
        }
        Syntax {
            cat: "GLUE".to_string(),
            lit: String::new(),
            err: String::new(),
            ambit: ambit.clone(),
            op_ambit: Some(second_span.collapse_left()),
            left: Some(Box::new(self.sparse_spans(
                ambit.subtract_right(&second_span),
                &spans[..1],
                min_precedence,
            ))),
            right: Some(Box::new(self.sparse_spans(
                ambit.subtract_left(&first_span),
                &spans[1..],
                min_precedence,
            ))),
        }
    }

    /// Scanning outward from `spans[index]`, checks that no neighboring
    /// operator claims argument-bearing status at a higher precedence on
    /// the side `spans[index]` wants to claim — i.e. that the candidate
    /// infix operator actually has an argument on both sides.
    fn check_infix_candidate(
        &self,
        spans: &[Span],
        index: usize,
        mut min_prec_left: u32,
        mut min_prec_right: u32,
    ) -> bool {
        let mut index_rl = index as isize - 1;
        while index_rl >= 0 {
            let span = &spans[index_rl as usize];
            if span.cat != "WS" {
                if span.cat != "OP" {
                    break;
                }
                let prec = self.precedence.efe.get(&span.lit).copied().unwrap_or(0);
                if prec >= min_prec_left {
                    break;
                }
                let prec = self.precedence.afe.get(&span.lit).copied().unwrap_or(0);
                if prec < min_prec_left {
                    return false;
                }
                min_prec_left = prec;
            }
            index_rl -= 1;
        }
        if index_rl < 0 {
            return false;
        }

        let l = spans.len() - 1;
        let mut index_lr = index + 1;
        while index_lr <= l {
            let span = &spans[index_lr];
            if span.cat != "WS" {
                if span.cat != "OP" {
                    break;
                }
                let prec = self.precedence.efe.get(&span.lit).copied().unwrap_or(0);
                if prec >= min_prec_right {
                    break;
                }
                let prec = self.precedence.efa.get(&span.lit).copied().unwrap_or(0);
                if prec < min_prec_right {
                    return false;
                }
                min_prec_right = prec;
            }
            index_lr += 1;
        }
        index_lr <= l
    }
}

fn trim_spans(ambit: Ambit, spans: &[Span]) -> (Ambit, &[Span]) {
    let (ambit, spans) = trim_spans_right(ambit, spans);
    trim_spans_left(ambit, spans)
}

fn trim_spans_left(mut ambit: Ambit, spans: &[Span]) -> (Ambit, &[Span]) {
    for (index, span) in spans.iter().enumerate() {
        if span.cat != "WS" {
            return (ambit, &spans[index..]);
        }
        ambit = ambit.subtract_left(&span.ambit);
    }
    (ambit, &[])
}

fn trim_spans_right(mut ambit: Ambit, spans: &[Span]) -> (Ambit, &[Span]) {
    for index in (0..spans.len()).rev() {
        if spans[index].cat != "WS" {
            return (ambit, &spans[..=index]);
        }
        ambit = ambit.subtract_right(&spans[index].ambit);
    }
    (ambit, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prfx::PrfxTree;
    use crate::scanner::{default_scanner, sequence_scanners, Scanner};
    use crate::tokenizer::Tokenizer;
    use dusl_core::Dump;

    fn test_sparser() -> Sparser {
        let mut ops = PrfxTree::new();
        ops.add("OP", "+");
        ops.add("OP", "-");
        ops.add("OB", "(");
        ops.add("CB", ")");
        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(ops), default_scanner()];
        let tokenizer = Tokenizer::new(sequence_scanners(scanners));

        let mut precedence = PrecedenceTables::new();
        precedence.efa.insert("+".to_string(), 12);
        precedence.efa.insert("-".to_string(), 12);
        precedence.bfa.insert("+".to_string(), 11);
        precedence.bfa.insert("-".to_string(), 11);
        precedence.b.insert("( )".to_string(), 10);

        let spanner = Spanner::new(tokenizer, precedence.b.clone());
        Sparser::new(spanner, precedence)
    }

    #[test]
    fn sparses_mixed_prefix_infix_and_brackets_exactly() {
        let source = Source::new("tst", "1 + +(5 --4) + x".as_bytes().to_vec());
        let sparser = test_sparser();
        let tree = sparser.sparse(&source.full_ambit());
        let dumped = tree.dump_to_string(false);
        let expected = "\
OP:+::tst[0:16]
  OP:+::tst[0:12]
    NUM:1::tst[0:1]
    OP:+::tst[4:12]
      :::tst[4:4]
      BB:( )::tst[5:12]
        OP:-::tst[6:11]
          NUM:5::tst[6:7]
          OP:-::tst[9:11]
            :::tst[9:9]
            NUM:4::tst[10:11]
        :::tst[12:12]
  ID:x::tst[15:16]
";
        assert_eq!(dumped, expected);
    }

    #[test]
    fn sparse_undent_recurses_into_each_sentence() {
        let source = Source::new(
            "tst",
            "func (1 + 2)\n  a + b\n".as_bytes().to_vec(),
        );
        let sparser = test_sparser();
        let tree = sparser.sparse_undent(&source);
        assert_eq!(tree.cat, "SQ");
        let sentence = tree.left.as_deref().unwrap();
        assert_eq!(sentence.cat, "SN");
        let juxt = sentence.left.as_deref().unwrap();
        assert_eq!(juxt.cat, "JUXT");
        let sub_seq = sentence.right.as_deref().unwrap();
        let inner_sentence = sub_seq.left.as_deref().unwrap();
        let op = inner_sentence.left.as_deref().unwrap();
        assert_eq!(op.cat, "OP");
        assert_eq!(op.lit, "+");
    }

    #[test]
    fn unknown_bracket_literal_is_an_error() {
        let mut precedence = PrecedenceTables::new();
        precedence.b.insert("( )".to_string(), 1);
        let mut ops = PrfxTree::new();
        ops.add("OB", "(");
        ops.add("CB", ")");
        ops.add("OB", "[");
        ops.add("CB", "]");
        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(ops), default_scanner()];
        let tokenizer = Tokenizer::new(sequence_scanners(scanners));
        let spanner = Spanner::new(tokenizer, precedence.b.clone());
        let sparser = Sparser::new(spanner, precedence);

        let source = Source::from_string("[a]");
        let tree = sparser.sparse(&source.full_ambit());
        assert_eq!(tree.cat, "ERR");
    }
}
