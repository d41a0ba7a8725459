//! The grammar compiler: a fluent [`Spec`] builder that declares lexical
//! categories, operator binding patterns, brackets, and labels, then
//! compiles a grammar-rule text against them into a [`Lang`] — a frozen,
//! reusable tokenizer/spanner/sparser/tracer bundle.
//!
//! Grammar text is itself parsed by the same Sparser/Tracer machinery used
//! for the target language, instantiated over a second, tiny "meta"
//! precedence table (`is>`, `or>`, `<empty`) layered in front of the
//! declared operators. Every bare identifier in grammar text becomes a `$`
//! node referencing a declared symbol rather than a plain `ID` token —
//! that's what lets `X is> NUM or> X + X` read as rule syntax instead of
//! language syntax.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use dusl_core::{GrammarError, LocatedError, Source, Syntax, Template};

use crate::precedence::PrecedenceTables;
use crate::prfx::PrfxTree;
use crate::scanner::{sequence_scanners, MetaSymbolScanner, Scanner};
use crate::spanner::Spanner;
use crate::sparser::Sparser;
use crate::tokenizer::Tokenizer;
use crate::tracer::Tracer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Efe,
    Efa,
    Afe,
    Afb,
    Bfa,
    Brackets,
}

impl Pattern {
    fn as_str(self) -> &'static str {
        match self {
            Pattern::Efe => "EFE",
            Pattern::Efa => "EFA",
            Pattern::Afe => "AFE",
            Pattern::Afb => "AFB",
            Pattern::Bfa => "BFA",
            Pattern::Brackets => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Label,
    SentenceLabel,
    SequenceLabel,
    Literal,
    Category,
    ShorthandOperator,
}

impl SymbolKind {
    fn type_name(self) -> &'static str {
        match self {
            SymbolKind::Label => "label",
            SymbolKind::SentenceLabel => "sentence label",
            SymbolKind::SequenceLabel => "sequence label",
            SymbolKind::Literal => "literal",
            SymbolKind::Category => "category",
            SymbolKind::ShorthandOperator => "shorthand operator",
        }
    }
}

#[derive(Debug, Clone)]
struct SpecSymbol {
    symb: String,
    kind: SymbolKind,
    cat: String,
    lit: String,
    desc: String,
    ops: Vec<String>,
}

/// A fluent declaration of a micro-language's lexicon and grammar.
/// Terminates with [`Spec::grammar`], which compiles a rule-text against
/// everything declared so far into a [`Lang`].
#[derive(Default)]
pub struct Spec {
    scanner: Option<Rc<dyn Scanner>>,
    layers: Vec<(Pattern, Vec<String>)>,
    symbols: Vec<SpecSymbol>,
}

impl Spec {
    pub fn new() -> Spec {
        Spec::default()
    }

    /// Declares the scanner that recognizes everything not covered by a
    /// declared operator/bracket literal (identifiers, numbers, strings,
    /// whitespace, ...). Can be called more than once; later calls shadow
    /// earlier ones (tried first).
    pub fn lexical(mut self, scanner: impl Scanner + 'static) -> Spec {
        let scanner: Rc<dyn Scanner> = Rc::new(scanner);
        self.scanner = Some(match self.scanner.take() {
            None => scanner,
            Some(existing) => {
                Rc::new(crate::scanner::SeqScanner::new(scanner, existing)) as Rc<dyn Scanner>
            }
        });
        self
    }

    fn layer(mut self, pattern: Pattern, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layers
            .push((pattern, ops.into_iter().map(Into::into).collect()));
        self
    }

    /// Nullary operators (no left, no right argument): standalone keywords.
    pub fn operator_efe(self, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Efe, ops)
    }

    /// Prefix operators (right argument only).
    pub fn operator_efa(self, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Efa, ops)
    }

    /// Postfix operators (left argument only).
    pub fn operator_afe(self, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Afe, ops)
    }

    /// Right-associative infix-like operators.
    pub fn operator_afb(self, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Afb, ops)
    }

    /// Left-associative infix-like operators.
    pub fn operator_bfa(self, ops: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Bfa, ops)
    }

    /// Bracket pairs, each given as `"open close"` (e.g. `"( )"`).
    pub fn brackets(self, pairs: impl IntoIterator<Item = impl Into<String>>) -> Spec {
        self.layer(Pattern::Brackets, pairs)
    }

    fn symbol(
        mut self,
        kind: SymbolKind,
        symb: impl Into<String>,
        cat: impl Into<String>,
        lit: impl Into<String>,
        desc: impl Into<String>,
    ) -> Spec {
        self.symbols.push(SpecSymbol {
            symb: symb.into(),
            kind,
            cat: cat.into(),
            lit: lit.into(),
            desc: desc.into(),
            ops: Vec::new(),
        });
        self
    }

    /// Declares a lexical category name used in templates (e.g. `NUM`).
    pub fn category(self, cat: impl Into<String>, desc: impl Into<String>) -> Spec {
        let cat = cat.into();
        self.symbol(SymbolKind::Category, cat.clone(), cat, "", desc)
    }

    /// Declares a rule label matchable within a single sentence.
    pub fn label(self, lbl: impl Into<String>, desc: impl Into<String>) -> Spec {
        let lbl = lbl.into();
        self.symbol(SymbolKind::Label, lbl, "", "", desc)
    }

    /// Declares a rule label usable as a multi-sentence rule head, matching
    /// exactly one sentence.
    pub fn sentence_label(self, lbl: impl Into<String>, desc: impl Into<String>) -> Spec {
        let lbl = lbl.into();
        self.symbol(SymbolKind::SentenceLabel, lbl, "", "", desc)
    }

    /// Declares a rule label usable as a multi-sentence rule head, matching
    /// a whole sequence of sentences.
    pub fn sequence_label(self, lbl: impl Into<String>, desc: impl Into<String>) -> Spec {
        let lbl = lbl.into();
        self.symbol(SymbolKind::SequenceLabel, lbl, "", "", desc)
    }

    /// In grammar text, treats `lit` as a lexical token of category `cat`
    /// instead of a placeholder symbol reference.
    pub fn literal(self, lit: impl Into<String>, cat: impl Into<String>) -> Spec {
        let lit = lit.into();
        let cat = cat.into();
        self.symbol(SymbolKind::Literal, lit.clone(), cat, lit, "")
    }

    /// Introduces `op` as a shorthand that matches any operator literal in
    /// `ops` (which may themselves be other shorthand operators, flattened
    /// recursively) at the loosest precedence among them, per table.
    pub fn shorthand_operator(
        mut self,
        op: impl Into<String>,
        ops: impl IntoIterator<Item = impl Into<String>>,
    ) -> Spec {
        self.symbols.push(SpecSymbol {
            symb: op.into(),
            kind: SymbolKind::ShorthandOperator,
            cat: String::new(),
            lit: String::new(),
            desc: String::new(),
            ops: ops.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Compiles `text` (attributed to the synthetic path `<grammar>`) into
    /// a [`Lang`].
    pub fn grammar(self, text: &str) -> Result<Lang, GrammarError> {
        self.grammar_at("<grammar>", 0, text)
    }

    /// Compiles `text`, attributing errors to `path`/`line_offset` (for a
    /// grammar embedded inside a larger file).
    pub fn grammar_at(
        mut self,
        path: impl Into<String>,
        line_offset: usize,
        text: &str,
    ) -> Result<Lang, GrammarError> {
        let mut precedence = PrecedenceTables::new();
        let layer_count = self.layers.len();
        for (index, (pattern, ops)) in self.layers.iter().enumerate() {
            let prec = 10 + (layer_count - 1 - index) as u32;
            let table = match pattern {
                Pattern::Efe => &mut precedence.efe,
                Pattern::Efa => &mut precedence.efa,
                Pattern::Afe => &mut precedence.afe,
                Pattern::Afb => &mut precedence.afb,
                Pattern::Bfa => &mut precedence.bfa,
                Pattern::Brackets => &mut precedence.b,
            };
            for op in ops {
                if table.contains_key(op) {
                    return Err(GrammarError::Config(format!(
                        "double declaration of {} operator/bracket: '{op}'",
                        pattern.as_str()
                    )));
                }
                table.insert(op.clone(), prec);
            }
        }

        let mut prfx = PrfxTree::new();
        let mut prfx_meta = PrfxTree::new();
        for table in [
            &precedence.afe,
            &precedence.efa,
            &precedence.afb,
            &precedence.bfa,
            &precedence.efe,
        ] {
            for op in table.keys() {
                prfx.add("OP", op);
                prfx_meta.add("OP", op);
            }
        }

        for brs in precedence.b.keys() {
            let parts: Vec<&str> = brs.split(' ').collect();
            if parts.len() < 2 {
                return Err(GrammarError::Config(format!(
                    "expected pair of brackets separated by blank space: '{brs}'"
                )));
            }
            if parts.len() > 2 {
                return Err(GrammarError::Config(format!(
                    "expected pair of brackets separated by single blank space: '{brs}'"
                )));
            }
            let (ob, cb) = (parts[0], parts[1]);
            let ob_existing = prfx.lookup(ob);
            if ob_existing == "OP" {
                return Err(GrammarError::Config(format!(
                    "declared open bracket conflicts with declared operator: '{ob}'"
                )));
            }
            if ob_existing == "CB" {
                return Err(GrammarError::Config(format!(
                    "declared open bracket conflicts with declared close bracket: '{ob}'"
                )));
            }
            if !ob_existing.is_empty() {
                return Err(GrammarError::Config(format!(
                    "double declaration of open bracket: '{ob}'"
                )));
            }
            let cb_existing = prfx.lookup(cb);
            if cb_existing == "OP" {
                return Err(GrammarError::Config(format!(
                    "declared close bracket conflicts with declared operator: '{cb}'"
                )));
            }
            if cb_existing == "CB" {
                return Err(GrammarError::Config(format!(
                    "declared close bracket conflicts with declared open bracket: '{cb}'"
                )));
            }
            if !cb_existing.is_empty() {
                return Err(GrammarError::Config(format!(
                    "double declaration of close bracket: '{cb}'"
                )));
            }
            prfx.add("OB", ob);
            prfx.add("CB", cb);
            prfx_meta.add("OB", ob);
            prfx_meta.add("CB", cb);
        }

        for meta_op in ["is>", "or>", "<empty"] {
            if !prfx.lookup(meta_op).is_empty() {
                return Err(GrammarError::Config(format!(
                    "conflicting declaration of meta operator: '{meta_op}'"
                )));
            }
        }
        prfx_meta.add("OP", "is>");
        prfx_meta.add("OP", "or>");
        prfx_meta.add("OP", "<empty");
        precedence.afb.insert("is>".to_string(), 1);
        precedence.afe.insert("is>".to_string(), 2);
        precedence.afb.insert("or>".to_string(), 3);
        precedence.efe.insert("or>".to_string(), 4);
        precedence.efe.insert("<empty".to_string(), 5);

        let mut symbol_table: indexmap::IndexMap<String, SpecSymbol> = indexmap::IndexMap::new();
        let reserved: &[(&str, &str)] = &[
            ("ERR", "error category"),
            ("OP", "operator category"),
            ("OB", "open-bracket category"),
            ("CB", "close-bracket category"),
            ("BB", "bracket-pair category"),
            ("WS", "whitespace category"),
        ];
        for symbol in std::mem::take(&mut self.symbols) {
            let symb = symbol.symb.clone();
            let trimmed = symb.trim();
            if trimmed.is_empty() {
                return Err(GrammarError::Config(format!(
                    "cannot declare empty string as {}",
                    symbol.kind.type_name()
                )));
            }
            if trimmed != symb {
                return Err(GrammarError::Config(format!(
                    "leading/trailing whitespace in {}: '{symb}'",
                    symbol.kind.type_name()
                )));
            }
            for (i, c) in symb.char_indices() {
                if c.is_ascii_alphabetic() || c == '_' {
                    continue;
                }
                if i > 0 && c.is_ascii_digit() {
                    continue;
                }
                return Err(GrammarError::Config(format!(
                    "unexpected character in {}: '{symb}'",
                    symbol.kind.type_name()
                )));
            }
            for (res, desc) in reserved {
                if symb == *res {
                    return Err(GrammarError::Config(format!(
                        "{} conflicts with reserved {desc}: '{symb}'",
                        symbol.kind.type_name()
                    )));
                }
            }
            if !prfx.lookup(&symb).is_empty() {
                return Err(GrammarError::Config(format!(
                    "{} conflicts with declared operator/bracket: '{symb}'",
                    symbol.kind.type_name()
                )));
            }
            if let Some(existing) = symbol_table.get(&symb) {
                if existing.kind.type_name() == symbol.kind.type_name() {
                    return Err(GrammarError::Config(format!(
                        "double declaration of {}: '{symb}'",
                        symbol.kind.type_name()
                    )));
                }
                return Err(GrammarError::Config(format!(
                    "{} conflicts with {}: '{symb}'",
                    symbol.kind.type_name(),
                    existing.kind.type_name()
                )));
            }

            match symbol.kind {
                SymbolKind::Label
                | SymbolKind::SentenceLabel
                | SymbolKind::SequenceLabel
                | SymbolKind::Category => {}
                SymbolKind::Literal => {
                    prfx_meta.add(&symbol.cat, &symbol.lit);
                }
                SymbolKind::ShorthandOperator => {
                    let mut ops = Vec::new();
                    let mut seen = HashSet::new();
                    flatten_shorthand_ops(&symbol_table, &symbol.ops, &mut seen, &mut ops);
                    let mut p_efe = 0u32;
                    let mut p_efa = 0u32;
                    let mut p_afe = 0u32;
                    let mut p_bfa = 0u32;
                    let mut p_afb = 0u32;
                    for op in &ops {
                        if prfx.lookup(op) != "OP" {
                            return Err(GrammarError::Config(format!(
                                "undeclared symbol: '{op}': in definition of shorthand operator: '{symb}'"
                            )));
                        }
                        if let Some(&p) = precedence.efe.get(op) {
                            if p_efe == 0 || p < p_efe {
                                p_efe = p;
                            }
                        }
                        if let Some(&p) = precedence.efa.get(op) {
                            if p_efa == 0 || p < p_efa {
                                p_efa = p;
                            }
                        }
                        if let Some(&p) = precedence.afe.get(op) {
                            if p_afe == 0 || p < p_afe {
                                p_afe = p;
                            }
                        }
                        if let Some(&p) = precedence.bfa.get(op) {
                            if p_bfa == 0 || p < p_bfa {
                                p_bfa = p;
                            }
                        }
                        if let Some(&p) = precedence.afb.get(op) {
                            if p_afb == 0 || p < p_afb {
                                p_afb = p;
                            }
                        }
                    }
                    precedence.efe.insert(symb.clone(), p_efe);
                    precedence.efa.insert(symb.clone(), p_efa);
                    precedence.afe.insert(symb.clone(), p_afe);
                    precedence.bfa.insert(symb.clone(), p_bfa);
                    precedence.afb.insert(symb.clone(), p_afb);
                    prfx_meta.add("OP", &symb);
                }
            }
            symbol_table.insert(symb, symbol);
        }

        let scanner: Box<dyn Scanner> = match &self.scanner {
            Some(user) => sequence_scanners(vec![Box::new(prfx), Box::new(Rc::clone(user))]),
            None => Box::new(prfx),
        };
        let meta_scanner: Box<dyn Scanner> = match &self.scanner {
            Some(user) => sequence_scanners(vec![
                Box::new(prfx_meta),
                Box::new(MetaSymbolScanner),
                Box::new(Rc::clone(user)),
            ]),
            None => sequence_scanners(vec![Box::new(prfx_meta), Box::new(MetaSymbolScanner)]),
        };

        let meta_tokenizer = Tokenizer::new(meta_scanner);
        let meta_spanner = Spanner::new(meta_tokenizer, precedence.b.clone());
        let meta_sparser = Sparser::new(meta_spanner, precedence.clone());

        let grammar_source = Source::with_line_offset(path, line_offset, text.as_bytes().to_vec());
        let grammar_tree = meta_sparser.sparse_undent(&grammar_source);

        let mut compiler = TemplateCompiler {
            symbol_table: &symbol_table,
            templates: HashMap::new(),
            errs: Vec::new(),
        };
        for err_node in grammar_tree.first_n("ERR", "", 20) {
            let message = err_node.err.clone();
            compiler.err(err_node, message);
        }
        compiler.top_sequence(&grammar_tree);

        if !compiler.errs.is_empty() {
            return Err(GrammarError::Rules(compiler.errs));
        }

        let descriptions: HashMap<String, String> = symbol_table
            .iter()
            .map(|(k, v)| (k.clone(), v.desc.clone()))
            .collect();

        let tokenizer = Tokenizer::new(scanner);
        let spanner = Spanner::new(tokenizer, precedence.b.clone());
        let sparser = Sparser::new(spanner, precedence);
        let tracer = Tracer::new(sparser, compiler.templates, descriptions);

        Ok(Lang { tracer })
    }
}

fn flatten_shorthand_ops(
    symbol_table: &indexmap::IndexMap<String, SpecSymbol>,
    ops: &[String],
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    for op in ops {
        if let Some(existing) = symbol_table.get(op) {
            if existing.kind == SymbolKind::ShorthandOperator {
                if seen.insert(op.clone()) {
                    flatten_shorthand_ops(symbol_table, &existing.ops, seen, out);
                }
                continue;
            }
        }
        out.push(op.clone());
    }
}

fn sub_count_or_zero(template: &Option<Template>) -> usize {
    template.as_ref().map(|t| t.sub_count).unwrap_or(0)
}

/// Walks a parsed grammar-rule tree (produced by the meta-sparser) and
/// builds a `Template` table, one entry per declared label. Grounded on
/// the original's single-pass recursive-descent rule compiler: `topSequence`
/// dispatches each top-level sentence to either a single-sentence rule
/// (`<lbl> is> <expr> or> <expr>...`, all on one line) or a multi-sentence
/// rule (`<lbl> is>` alone, followed by an indented body).
struct TemplateCompiler<'a> {
    symbol_table: &'a indexmap::IndexMap<String, SpecSymbol>,
    templates: HashMap<String, Vec<Template>>,
    errs: Vec<LocatedError>,
}

impl TemplateCompiler<'_> {
    fn err(&mut self, node: &Syntax, message: impl Into<String>) {
        let ambit = node.op_ambit.clone().unwrap_or_else(|| node.ambit.clone());
        self.errs.push(LocatedError::new(ambit, message.into()));
    }

    fn top_sequence(&mut self, node: &Syntax) {
        if node.cat == "SQ" {
            if let Some(sn) = node.left.as_deref().filter(|l| l.cat == "SN") {
                let is_multi = sn.right.as_deref().is_some_and(|r| r.cat == "SQ");
                if is_multi {
                    self.multi_sentence_rule(node);
                } else {
                    let head = sn.left.as_deref().expect("SN always carries a head");
                    self.single_sentence_rule(head);
                    let rest = node.right.as_deref().expect("SQ always has a right");
                    self.top_sequence(rest);
                }
                return;
            }
        }
        if node.is_empty() {
            return;
        }
        self.err(node, "expected rule".to_string());
    }

    fn multi_sentence_rule(&mut self, node: &Syntax) {
        let sn_node = node
            .left
            .as_deref()
            .expect("multi_sentence_rule only called when left is SN");
        let head = sn_node
            .left
            .as_deref()
            .expect("SN always carries a head expression");
        let (sn, lbl) = self.multi_sentence_rule_head(head);
        let body = sn_node
            .right
            .as_deref()
            .expect("multi_sentence_rule only called when right is SQ");
        self.multi_sentence_rule_body(body, sn, &lbl);
        let cont = node.right.as_deref().expect("SQ always has a right");
        self.multi_sentence_rule_continuation(cont, sn, &lbl);
    }

    fn multi_sentence_rule_continuation(&mut self, node: &Syntax, sn: bool, lbl: &str) {
        let or_cont = node.cat == "SQ"
            && node.left.as_deref().is_some_and(|l| {
                l.cat == "SN"
                    && l.left
                        .as_deref()
                        .is_some_and(|h| h.is_zeroary_op("or>"))
            });
        if or_cont {
            let sn_node = node.left.as_deref().unwrap();
            let body = sn_node
                .right
                .as_deref()
                .expect("or> continuation always carries a body");
            self.multi_sentence_rule_body(body, sn, lbl);
            let rest = node.right.as_deref().expect("SQ always has a right");
            self.multi_sentence_rule_continuation(rest, sn, lbl);
        } else {
            self.top_sequence(node);
        }
    }

    fn multi_sentence_rule_head(&mut self, node: &Syntax) -> (bool, String) {
        if !node.is_postfix_op("is>") {
            self.err(node, "expected: <label> is>".to_string());
            return (false, String::new());
        }
        let left = node.left.as_deref().expect("postfix op always has a left");
        if left.cat != "$" {
            self.err(left, "expected: <label> is>".to_string());
            return (false, String::new());
        }
        let kind = match self.symbol_table.get(&left.lit) {
            Some(symbol) => symbol.kind,
            None => {
                let msg = format!("undeclared symbol: '{}'", left.lit);
                self.err(left, msg);
                return (false, String::new());
            }
        };
        match kind {
            SymbolKind::SentenceLabel => (true, left.lit.clone()),
            SymbolKind::SequenceLabel => (false, left.lit.clone()),
            SymbolKind::Label => {
                self.err(
                    left,
                    format!(
                        "expected sequence label instead of ordinary label: '{}'",
                        left.lit
                    ),
                );
                (false, String::new())
            }
            SymbolKind::Literal => {
                self.err(
                    left,
                    format!("expected sequence label instead of literal: '{}'", left.lit),
                );
                (false, String::new())
            }
            SymbolKind::Category => {
                self.err(
                    left,
                    format!(
                        "expected sequence label instead of category: '{}'",
                        left.lit
                    ),
                );
                (false, String::new())
            }
            SymbolKind::ShorthandOperator => {
                self.err(
                    left,
                    format!("expected sequence label instead of: '{}'", left.lit),
                );
                (false, String::new())
            }
        }
    }

    fn multi_sentence_rule_body(&mut self, node: &Syntax, sn: bool, lbl: &str) {
        let Some(mut template) = self.multi_sentence_template(node) else {
            return;
        };
        if lbl.is_empty() {
            return;
        }
        if sn {
            let shape_ok = template.cat == "SQ"
                && template.left.as_deref().is_some_and(|l| l.cat == "SN")
                && template.right.as_deref().is_some_and(|r| r.cat.is_empty());
            if !shape_ok {
                self.err(
                    node,
                    format!("cannot match sequence with sentence label: '{lbl}'"),
                );
                return;
            }
            template = *template.left.take().expect("shape check above guarantees a left");
        }
        self.templates.entry(lbl.to_string()).or_default().push(template);
    }

    fn single_sentence_rule(&mut self, node: &Syntax) {
        if !node.is_infix_op("is>") {
            self.err(node, "expected: <label> is> ...".to_string());
            return;
        }
        let left = node.left.as_deref().expect("infix op always has a left");
        if left.cat != "$" {
            self.err(left, "expected: <label> is> ...".to_string());
            return;
        }
        let kind = match self.symbol_table.get(&left.lit) {
            Some(s) => s.kind,
            None => {
                let msg = format!("undeclared symbol: '{}'", left.lit);
                self.err(left, msg);
                return;
            }
        };
        let (sn, lbl) = match kind {
            SymbolKind::SequenceLabel => {
                self.err(
                    left,
                    format!(
                        "missing indented body for sequence label: '{}'",
                        left.lit
                    ),
                );
                return;
            }
            SymbolKind::SentenceLabel => (true, left.lit.clone()),
            SymbolKind::Label => (false, left.lit.clone()),
            SymbolKind::Literal => {
                self.err(
                    left,
                    format!("expected label instead of literal: '{}'", left.lit),
                );
                return;
            }
            SymbolKind::Category => {
                self.err(
                    left,
                    format!("expected label instead of category: '{}'", left.lit),
                );
                return;
            }
            SymbolKind::ShorthandOperator => {
                self.err(left, format!("expected label instead of: '{}'", left.lit));
                return;
            }
        };
        let right = node.right.as_deref().expect("infix op always has a right");
        self.single_sentence_rule_body(right, sn, &lbl);
    }

    fn single_sentence_rule_body(&mut self, node: &Syntax, sn: bool, lbl: &str) {
        if node.cat == "OP" && node.lit == "or>" {
            let left = node.left.as_deref().expect("or> is parsed as infix here");
            let right = node.right.as_deref().expect("or> is parsed as infix here");
            self.single_sentence_rule_body(left, sn, lbl);
            self.single_sentence_rule_body(right, sn, lbl);
            return;
        }
        let Some(mut template) = self.intra_sentence_template(node) else {
            return;
        };
        if sn {
            let sub_count = template.sub_count;
            template = Template {
                match_cat: true,
                cat: "SN".to_string(),
                sub_count,
                left: Some(Box::new(template)),
                right: Some(Box::new(Template {
                    match_cat: true,
                    cat: String::new(),
                    ..Default::default()
                })),
                ..Default::default()
            };
        }
        self.templates.entry(lbl.to_string()).or_default().push(template);
    }

    fn intra_sentence_template(&mut self, node: &Syntax) -> Option<Template> {
        if node.is_empty() {
            self.err(node, "expected template expression".to_string());
            return None;
        }
        self.possibly_empty_intra_sentence_template(Some(node))
    }

    fn possibly_empty_intra_sentence_template(&mut self, node: Option<&Syntax>) -> Option<Template> {
        let node = node?;
        if node.cat == "$" {
            let found = self
                .symbol_table
                .get(&node.lit)
                .map(|s| (s.kind, s.cat.clone(), s.lit.clone()));
            return match found {
                None => {
                    self.err(node, format!("undeclared symbol: '{}'", node.lit));
                    None
                }
                Some((SymbolKind::SequenceLabel, ..)) => {
                    self.err(
                        node,
                        format!(
                            "nested expression cannot be labeled with sequence label: '{}'",
                            node.lit
                        ),
                    );
                    None
                }
                Some((SymbolKind::SentenceLabel, ..)) => {
                    self.err(
                        node,
                        format!(
                            "nested expression cannot be labeled with sentence label: '{}'",
                            node.lit
                        ),
                    );
                    None
                }
                Some((SymbolKind::Label, ..)) => Some(Template {
                    lbl: node.lit.clone(),
                    sub_count: 1,
                    ..Default::default()
                }),
                Some((SymbolKind::Literal, cat, lit)) => Some(Template {
                    match_cat: true,
                    cat,
                    match_lit: true,
                    lit,
                    ..Default::default()
                }),
                Some((SymbolKind::Category, cat, _)) => Some(Template {
                    match_cat: true,
                    cat,
                    ..Default::default()
                }),
                Some((SymbolKind::ShorthandOperator, ..)) => {
                    self.err(node, format!("unknown symbol: '{}'", node.lit));
                    None
                }
            };
        }
        if node.is_zeroary_op("<empty") {
            return Some(Template {
                match_cat: true,
                cat: String::new(),
                ..Default::default()
            });
        }
        let shorthand = self.symbol_table.get(&node.lit).and_then(|s| {
            if s.kind == SymbolKind::ShorthandOperator {
                Some((s.symb.clone(), s.ops.iter().cloned().collect::<HashSet<String>>()))
            } else {
                None
            }
        });
        if let Some((symb, lit_set)) = shorthand {
            let left = self.possibly_empty_intra_sentence_template(node.left.as_deref());
            let right = self.possibly_empty_intra_sentence_template(node.right.as_deref());
            let sub_count = sub_count_or_zero(&left) + sub_count_or_zero(&right);
            return Some(Template {
                match_cat: true,
                cat: "OP".to_string(),
                match_lit: true,
                lit: symb,
                lit_set: Some(lit_set),
                left: left.map(Box::new),
                right: right.map(Box::new),
                sub_count,
            });
        }
        let left = self.possibly_empty_intra_sentence_template(node.left.as_deref());
        let right = self.possibly_empty_intra_sentence_template(node.right.as_deref());
        let sub_count = sub_count_or_zero(&left) + sub_count_or_zero(&right);
        Some(Template {
            match_cat: true,
            cat: node.cat.clone(),
            match_lit: true,
            lit: node.lit.clone(),
            left: left.map(Box::new),
            right: right.map(Box::new),
            sub_count,
            ..Default::default()
        })
    }

    fn multi_sentence_template(&mut self, node: &Syntax) -> Option<Template> {
        if node.is_empty() {
            self.err(node, "expected template expression".to_string());
            return None;
        }
        self.possibly_empty_multi_sentence_template(Some(node))
    }

    fn possibly_empty_multi_sentence_template(&mut self, node: Option<&Syntax>) -> Option<Template> {
        let node = node?;
        if node.cat == "SQ" {
            if let Some(sn_left) = node.left.as_deref().filter(|l| l.cat == "SN") {
                if let Some(head) = sn_left.left.as_deref() {
                    if head.cat == "$" {
                        let seq_label = self
                            .symbol_table
                            .get(&head.lit)
                            .filter(|s| s.kind == SymbolKind::SequenceLabel)
                            .map(|_| head.lit.clone());
                        if let Some(lbl) = seq_label {
                            return Some(Template {
                                lbl,
                                sub_count: 1,
                                ..Default::default()
                            });
                        }
                    } else if head.is_zeroary_op("<empty") {
                        return Some(Template {
                            match_cat: true,
                            cat: String::new(),
                            ..Default::default()
                        });
                    }
                }
            }
            let left = self.possibly_empty_multi_sentence_template(node.left.as_deref());
            let right = self.possibly_empty_multi_sentence_template(node.right.as_deref());
            let sub_count = sub_count_or_zero(&left) + sub_count_or_zero(&right);
            return Some(Template {
                match_cat: true,
                cat: "SQ".to_string(),
                left: left.map(Box::new),
                right: right.map(Box::new),
                sub_count,
                ..Default::default()
            });
        }
        if node.cat == "SN" {
            if let Some(left_node) = node.left.as_deref() {
                if left_node.cat == "$" {
                    let sent_label = self
                        .symbol_table
                        .get(&left_node.lit)
                        .filter(|s| s.kind == SymbolKind::SentenceLabel)
                        .map(|_| left_node.lit.clone());
                    if let Some(lbl) = sent_label {
                        return Some(Template {
                            lbl,
                            sub_count: 1,
                            ..Default::default()
                        });
                    }
                }
            }
            let left = self.possibly_empty_intra_sentence_template(node.left.as_deref());
            let right = self.possibly_empty_multi_sentence_template(node.right.as_deref());
            let sub_count = sub_count_or_zero(&left) + sub_count_or_zero(&right);
            return Some(Template {
                match_cat: true,
                cat: "SN".to_string(),
                left: left.map(Box::new),
                right: right.map(Box::new),
                sub_count,
                ..Default::default()
            });
        }
        self.possibly_empty_intra_sentence_template(Some(node))
    }
}

/// A compiled micro-language: immutable tables wired into a ready-to-use
/// tokenizer/spanner/sparser/tracer chain. Cheap to keep around and reuse
/// across many inputs — none of these types carry any per-run state.
pub struct Lang {
    tracer: Tracer,
}

impl Lang {
    pub fn tokenizer(&self) -> &Tokenizer {
        self.tracer.sparser().spanner().tokenizer()
    }

    pub fn spanner(&self) -> &Spanner {
        self.tracer.sparser().spanner()
    }

    pub fn sparser(&self) -> &Sparser {
        self.tracer.sparser()
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::default_scanner;
    use dusl_core::Source;
    use indoc::indoc;

    #[test]
    fn compiles_a_small_infix_grammar_and_traces_input() {
        let lang = Spec::new()
            .lexical(default_scanner())
            .category("NUM", "number")
            .operator_bfa(["+"])
            .label("X", "NUM or X + X")
            .grammar("X is> NUM or> X + X")
            .expect("grammar compiles");

        let source = Source::from_string("1 + 2");
        let trace = lang.tracer().trace_undent(&source, "X");
        assert_eq!(trace.lbl, "X");
        assert_eq!(trace.idx, 1);
        assert_eq!(trace.subs.len(), 2);
        assert_eq!(trace.subs[0].as_ref().unwrap().syn.lit, "1");
        assert_eq!(trace.subs[1].as_ref().unwrap().syn.lit, "2");
    }

    #[test]
    fn undeclared_symbol_in_grammar_is_reported() {
        let err = Spec::new()
            .category("NUM", "number")
            .label("X", "NUM")
            .grammar("X is> goo")
            .expect_err("goo was never declared");
        let message = err.to_string();
        assert!(message.contains("undeclared symbol: 'goo'"), "{message}");
    }

    #[test]
    fn double_declaration_of_an_operator_is_a_config_error() {
        let err = Spec::new()
            .operator_bfa(["+"])
            .operator_bfa(["+"])
            .grammar("")
            .expect_err("double declaration of + as BFA");
        assert!(matches!(err, GrammarError::Config(_)));
    }

    #[test]
    fn sequence_label_compiles_a_repeated_rule() {
        let lang = Spec::new()
            .lexical(default_scanner())
            .category("NUM", "number")
            .sequence_label("XSQ", "zero or more X, one per line")
            .sentence_label("XSN", "one X")
            .label("X", "a number")
            .grammar(indoc! {"
                XSQ is> XSN XSQ or> <empty
                XSN is> X
                X is> NUM
            "})
            .expect("grammar compiles");

        let source = Source::from_string("1\n2\n3\n");
        let trace = lang.tracer().trace_undent(&source, "XSQ");
        assert!(!trace.is_error(), "{trace:?}");
    }
}
