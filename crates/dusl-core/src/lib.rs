//! Core data model for DUSL: the types shared by every pipeline stage
//! (scanning, tokenizing, spanning, sparsing, tracing) without pulling in
//! any of the logic that builds them.

pub mod ambit;
pub mod dump;
pub mod error;
pub mod source;
pub mod span;
pub mod syntax;
pub mod token;
pub mod trace;

pub use ambit::Ambit;
pub use dump::Dump;
pub use error::{GrammarError, LocatedError, SummaryError};
pub use source::Source;
pub use span::Span;
pub use syntax::Syntax;
pub use token::Token;
pub use trace::{Template, Trace};
