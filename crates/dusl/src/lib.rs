//! DUSL: a toolkit for defining small indentation-sensitive languages.
//!
//! The pipeline runs bottom-up: [`undent`] splits raw text into a tree of
//! sequences and sentences by 2-space indentation; [`tokenizer`] turns one
//! sentence's text into tokens; [`spanner`] groups tokens by bracket
//! nesting; [`sparser`] turns a span list into a binary parse tree using
//! precedence-climbing; [`tracer`] labels that tree against a compiled
//! grammar. [`spec`] is the fluent builder that compiles a grammar-rule
//! text into the [`Lang`] a [`tracer::Tracer`] runs against.

pub mod diagnostics;
pub mod precedence;
pub mod prfx;
pub mod scanner;
pub mod spanner;
pub mod sparser;
pub mod spec;
pub mod tokenizer;
pub mod tracer;
pub mod undent;

pub use diagnostics::Diagnostics;
pub use precedence::{PrecedenceTables, MAX_PRECEDENCE};
pub use prfx::PrfxTree;
pub use scanner::{
    compose_scanners, default_scanner, sequence_scanners, CompScanner, EmptyScanner, Scan,
    Scanner, SeqScanner, SimpleRawStringScanner,
};
pub use spanner::Spanner;
pub use sparser::Sparser;
pub use spec::{Lang, Spec};
pub use tokenizer::Tokenizer;
pub use tracer::Tracer;
pub use undent::undent;
