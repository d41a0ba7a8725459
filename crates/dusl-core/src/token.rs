use crate::Ambit;

/// A single lexical token: a category (`ID`, `NUM`, `OP`, `WS`, `ERR`, ...),
/// the literal text scanned (only populated where it matters, e.g. `OP`
/// and `ERR`), an error message when `cat == "ERR"`, and the source ambit.
#[derive(Debug, Clone)]
pub struct Token {
    pub cat: String,
    pub lit: String,
    pub err: String,
    pub ambit: Ambit,
}

impl std::fmt::Display for Token {
    /// Bare category for whitespace (`WS`), `cat:lit` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lit.trim().is_empty() {
            write!(f, "{}", self.cat)
        } else {
            write!(f, "{}:{}", self.cat, self.lit)
        }
    }
}

impl Token {
    pub fn is_whitespace(&self) -> bool {
        self.cat == "WS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn display_hides_literal_for_whitespace() {
        let a = Source::from_string("  ").full_ambit();
        let tok = Token {
            cat: "WS".to_string(),
            lit: "  ".to_string(),
            err: String::new(),
            ambit: a,
        };
        assert_eq!(tok.to_string(), "WS");
    }

    #[test]
    fn display_shows_literal_otherwise() {
        let a = Source::from_string("+=").full_ambit();
        let tok = Token {
            cat: "OP".to_string(),
            lit: "+=".to_string(),
            err: String::new(),
            ambit: a,
        };
        assert_eq!(tok.to_string(), "OP:+=");
    }
}
