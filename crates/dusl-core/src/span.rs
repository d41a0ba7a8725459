use crate::Ambit;

/// A token, or a bracketed group of spans (`cat == "BB"`, with `lit` holding
/// `"<open> <close>"` and `children` the spans found between the brackets).
#[derive(Debug, Clone)]
pub struct Span {
    pub cat: String,
    pub lit: String,
    pub err: String,
    pub ambit: Ambit,
    pub sub_ambit: Option<Ambit>,
    pub children: Vec<Span>,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.children.is_empty() {
            return if self.lit.trim().is_empty() {
                write!(f, "{}", self.cat)
            } else {
                write!(f, "{}:{}", self.cat, self.lit)
            };
        }
        match self.lit.split_once(' ') {
            Some((open, close)) => {
                write!(f, "{open}")?;
                for (index, child) in self.children.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, "{close}")
            }
            None => write!(f, "{}:sublist", self.cat),
        }
    }
}

impl Span {
    pub fn is_bracket(&self) -> bool {
        self.cat == "BB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn display_renders_bracket_with_children() {
        let a = Source::from_string("(a)").full_ambit();
        let leaf = Span {
            cat: "ID".to_string(),
            lit: "a".to_string(),
            err: String::new(),
            ambit: a.clone(),
            sub_ambit: None,
            children: Vec::new(),
        };
        let bb = Span {
            cat: "BB".to_string(),
            lit: "( )".to_string(),
            err: String::new(),
            ambit: a.clone(),
            sub_ambit: Some(a.clone()),
            children: vec![leaf],
        };
        assert_eq!(bb.to_string(), "(ID:a)");
    }

    #[test]
    fn display_hides_literal_for_whitespace_leaf() {
        let a = Source::from_string(" ").full_ambit();
        let ws = Span {
            cat: "WS".to_string(),
            lit: " ".to_string(),
            err: String::new(),
            ambit: a,
            sub_ambit: None,
            children: Vec::new(),
        };
        assert_eq!(ws.to_string(), "WS");
    }
}
