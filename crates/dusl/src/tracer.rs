//! The Tracer: a top-down deterministic tree automaton. Walks a [`Syntax`]
//! tree against a table of [`Template`] alternatives per label, producing a
//! [`Trace`] tree. A node with no matching alternative becomes an `ERR`
//! trace instead of failing the whole walk.
//!
//! The original walks this with an explicit LIFO worklist mutating shared
//! `*Trace` pointers; since the result is a plain tree with no back-edges,
//! this port instead recurses directly and builds each [`Trace`] bottom-up
//! as an owned value (no interior mutability, matching the rest of the
//! port's tree types).

use std::collections::HashMap;
use std::rc::Rc;

use dusl_core::{Source, Syntax, Template, Trace};

use crate::sparser::Sparser;

pub struct Tracer {
    sparser: Sparser,
    templates: HashMap<String, Vec<Template>>,
    descriptions: HashMap<String, String>,
}

impl Tracer {
    pub fn new(
        sparser: Sparser,
        templates: HashMap<String, Vec<Template>>,
        descriptions: HashMap<String, String>,
    ) -> Tracer {
        Tracer {
            sparser,
            templates,
            descriptions,
        }
    }

    pub fn sparser(&self) -> &Sparser {
        &self.sparser
    }

    pub fn descriptions(&self) -> &HashMap<String, String> {
        &self.descriptions
    }

    pub fn trace(&self, ambit: &dusl_core::Ambit, lbl: &str) -> Trace {
        let root = self.sparser.sparse(ambit);
        self.label(root, lbl)
    }

    pub fn trace_undent(&self, source: &Rc<Source>, lbl: &str) -> Trace {
        let root = self.sparser.sparse_undent(source);
        self.label(root, lbl)
    }

    fn label(&self, node: Syntax, lbl: &str) -> Trace {
        if let Some(templates) = self.templates.get(lbl) {
            for (idx, template) in templates.iter().enumerate() {
                if template.checks_match(Some(&node)) {
                    let mut subs: Vec<Option<Trace>> = (0..template.sub_count).map(|_| None).collect();
                    self.perform_match(template, &node, &mut subs, 0);
                    return Trace {
                        lbl: lbl.to_string(),
                        idx,
                        syn: node,
                        err: String::new(),
                        subs,
                    };
                }
            }
        }
        let err = format!(
            "expected: {}",
            self.descriptions.get(lbl).map(String::as_str).unwrap_or("")
        );
        Trace {
            lbl: "ERR".to_string(),
            idx: 0,
            syn: node,
            err,
            subs: Vec::new(),
        }
    }

    fn perform_match(
        &self,
        template: &Template,
        node: &Syntax,
        subs: &mut [Option<Trace>],
        subi: usize,
    ) -> usize {
        if !template.lbl.is_empty() {
            subs[subi] = Some(self.label(node.clone(), &template.lbl));
            return subi + 1;
        }
        if let (Some(left_t), Some(right_t)) = (template.left.as_deref(), template.right.as_deref()) {
            let left_node = node.left.as_deref().expect("a matched template's left shape implies a left child");
            let right_node = node.right.as_deref().expect("a matched template's right shape implies a right child");
            let subi = self.perform_match(left_t, left_node, subs, subi);
            return self.perform_match(right_t, right_node, subs, subi);
        }
        subi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::PrecedenceTables;
    use crate::prfx::PrfxTree;
    use crate::scanner::{default_scanner, sequence_scanners, Scanner};
    use crate::spanner::Spanner;
    use crate::tokenizer::Tokenizer;
    use dusl_core::Source;

    fn test_tracer() -> Tracer {
        let mut ops = PrfxTree::new();
        ops.add("OP", "+");
        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(ops), default_scanner()];
        let tokenizer = Tokenizer::new(sequence_scanners(scanners));
        let mut precedence = PrecedenceTables::new();
        precedence.bfa.insert("+".to_string(), 11);
        let spanner = Spanner::new(tokenizer, precedence.b.clone());
        let sparser = Sparser::new(spanner, precedence);

        // X is> NUM or> X + X
        let num_template = Template {
            match_cat: true,
            cat: "NUM".to_string(),
            ..Default::default()
        };
        let plus_template = Template {
            match_cat: true,
            cat: "OP".to_string(),
            match_lit: true,
            lit: "+".to_string(),
            left: Some(Box::new(Template { lbl: "X".to_string(), sub_count: 1, ..Default::default() })),
            right: Some(Box::new(Template { lbl: "X".to_string(), sub_count: 1, ..Default::default() })),
            sub_count: 2,
            ..Default::default()
        };

        let mut templates = HashMap::new();
        templates.insert("X".to_string(), vec![num_template, plus_template]);
        let mut descriptions = HashMap::new();
        descriptions.insert("X".to_string(), "NUM or X + X".to_string());

        Tracer::new(sparser, templates, descriptions)
    }

    #[test]
    fn traces_a_leaf_match_directly() {
        let tracer = test_tracer();
        let source = Source::from_string("1");
        let trace = tracer.trace(&source.full_ambit(), "X");
        assert_eq!(trace.lbl, "X");
        assert_eq!(trace.idx, 0);
        assert!(trace.subs.is_empty());
    }

    #[test]
    fn traces_an_infix_rule_recursing_into_both_arguments() {
        let tracer = test_tracer();
        let source = Source::from_string("1 + 2");
        let trace = tracer.trace(&source.full_ambit(), "X");
        assert_eq!(trace.lbl, "X");
        assert_eq!(trace.idx, 1);
        assert_eq!(trace.subs.len(), 2);
        let left = trace.subs[0].as_ref().unwrap();
        let right = trace.subs[1].as_ref().unwrap();
        assert_eq!(left.lbl, "X");
        assert_eq!(left.syn.lit, "1");
        assert_eq!(right.lbl, "X");
        assert_eq!(right.syn.lit, "2");
    }

    #[test]
    fn unmatched_node_becomes_an_error_trace() {
        let tracer = test_tracer();
        let source = Source::from_string("\"str\"");
        let trace = tracer.trace(&source.full_ambit(), "X");
        assert_eq!(trace.lbl, "ERR");
        assert_eq!(trace.err, "expected: NUM or X + X");
    }
}
