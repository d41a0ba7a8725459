//! Character-at-a-time category scanners: the lowest layer of the
//! pipeline. A [`Scanner`] is a stateless description of a recognizer;
//! calling [`Scanner::scan`] opens a fresh, mutable [`Scan`] over it that
//! a [`crate::tokenizer::Tokenizer`] drives one `char` at a time.

/// A reusable recognizer description. `scan()` opens a new cursor over it.
pub trait Scanner {
    fn scan(&self) -> Box<dyn Scan + '_>;
}

/// A live scan in progress. `consume` feeds one character and reports the
/// best category recognized *so far* (empty string if none) along with
/// whether the scan could still continue (accept more characters).
pub trait Scan {
    fn consume(&mut self, c: char) -> (String, bool);
    fn reset(&mut self);
}

impl Scanner for Box<dyn Scanner> {
    fn scan(&self) -> Box<dyn Scan + '_> {
        self.as_ref().scan()
    }
}

impl Scanner for std::rc::Rc<dyn Scanner> {
    fn scan(&self) -> Box<dyn Scan + '_> {
        self.as_ref().scan()
    }
}

/// Recognizes nothing. Useful as the identity element for composition.
pub struct EmptyScanner;

impl Scanner for EmptyScanner {
    fn scan(&self) -> Box<dyn Scan + '_> {
        Box::new(EmptyScan)
    }
}

struct EmptyScan;

impl Scan for EmptyScan {
    fn consume(&mut self, _c: char) -> (String, bool) {
        (String::new(), false)
    }
    fn reset(&mut self) {}
}

/// Sequential composition: `master` is tried first; if it declines a
/// category, `slave`'s is used instead. Either scanner continuing is
/// enough for the pair to continue.
pub struct SeqScanner<A, B> {
    master: A,
    slave: B,
}

impl<A: Scanner, B: Scanner> SeqScanner<A, B> {
    pub fn new(master: A, slave: B) -> SeqScanner<A, B> {
        SeqScanner { master, slave }
    }
}

impl<A: Scanner, B: Scanner> Scanner for SeqScanner<A, B> {
    fn scan(&self) -> Box<dyn Scan + '_> {
        Box::new(SeqScan {
            master: self.master.scan(),
            slave: self.slave.scan(),
        })
    }
}

struct SeqScan<'a> {
    master: Box<dyn Scan + 'a>,
    slave: Box<dyn Scan + 'a>,
}

impl Scan for SeqScan<'_> {
    fn consume(&mut self, c: char) -> (String, bool) {
        let (master_cat, master_cont) = self.master.consume(c);
        let (slave_cat, slave_cont) = self.slave.consume(c);
        let cat = if !master_cat.is_empty() { master_cat } else { slave_cat };
        (cat, master_cont || slave_cont)
    }
    fn reset(&mut self) {
        self.master.reset();
        self.slave.reset();
    }
}

/// Folds a list of scanners right-to-left into one sequential chain: the
/// first-declared scanner is tried first, then the next, and so on.
pub fn sequence_scanners(scanners: Vec<Box<dyn Scanner>>) -> Box<dyn Scanner> {
    let mut iter = scanners.into_iter();
    let Some(first) = iter.next() else {
        return Box::new(EmptyScanner);
    };
    let rest: Vec<Box<dyn Scanner>> = iter.collect();
    if rest.is_empty() {
        return first;
    }
    Box::new(SeqScanner {
        master: first,
        slave: sequence_scanners(rest),
    })
}

/// Parallel composition: both scanners run on every character. Agreement
/// (or one declining) picks a category; disagreement yields none.
pub struct CompScanner<A, B> {
    first: A,
    second: B,
}

impl<A: Scanner, B: Scanner> Scanner for CompScanner<A, B> {
    fn scan(&self) -> Box<dyn Scan + '_> {
        Box::new(CompScan {
            first: self.first.scan(),
            second: self.second.scan(),
        })
    }
}

struct CompScan<'a> {
    first: Box<dyn Scan + 'a>,
    second: Box<dyn Scan + 'a>,
}

impl Scan for CompScan<'_> {
    fn consume(&mut self, c: char) -> (String, bool) {
        let (cat1, cont1) = self.first.consume(c);
        let (cat2, cont2) = self.second.consume(c);
        let cat = if cat2.is_empty() || cat1 == cat2 {
            cat1
        } else if cat1.is_empty() {
            cat2
        } else {
            String::new()
        };
        (cat, cont1 || cont2)
    }
    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }
}

pub fn compose_scanners(scanners: Vec<Box<dyn Scanner>>) -> Box<dyn Scanner> {
    let mut iter = scanners.into_iter();
    let Some(first) = iter.next() else {
        return Box::new(EmptyScanner);
    };
    let rest: Vec<Box<dyn Scanner>> = iter.collect();
    if rest.is_empty() {
        return first;
    }
    Box::new(CompScanner {
        first,
        second: compose_scanners(rest),
    })
}

macro_rules! state_scanner {
    ($name:ident, $scan_name:ident) => {
        pub struct $name;
        impl Scanner for $name {
            fn scan(&self) -> Box<dyn Scan + '_> {
                Box::new($scan_name::default())
            }
        }
    };
}

#[derive(Default)]
enum StringState {
    #[default]
    Init,
    Inside,
    Escape,
}

state_scanner!(SimpleStringScanner, SimpleStringScan);

#[derive(Default)]
pub struct SimpleStringScan {
    state: StringState,
}

impl Scan for SimpleStringScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            StringState::Init => {
                if c == '"' {
                    self.state = StringState::Inside;
                    (String::new(), true)
                } else {
                    (String::new(), false)
                }
            }
            StringState::Inside => match c {
                '"' => {
                    self.state = StringState::Init;
                    ("STR".to_string(), false)
                }
                '\\' => {
                    self.state = StringState::Escape;
                    (String::new(), true)
                }
                _ => (String::new(), true),
            },
            StringState::Escape => match c {
                'n' | 'r' | 't' | '"' | '\\' => {
                    self.state = StringState::Inside;
                    (String::new(), true)
                }
                _ => (String::new(), false),
            },
        }
    }
    fn reset(&mut self) {
        self.state = StringState::Init;
    }
}

/// A backtick-introduced string that runs to end-of-line with no escapes
/// (the "raw variant" lexical category): `` `like this ``.
state_scanner!(SimpleRawStringScanner, SimpleRawStringScan);

#[derive(Default)]
enum RawStringState {
    #[default]
    Init,
    Inside,
}

#[derive(Default)]
pub struct SimpleRawStringScan {
    state: RawStringState,
}

impl Scan for SimpleRawStringScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            RawStringState::Init => {
                if c == '`' {
                    self.state = RawStringState::Inside;
                    ("STR".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
            RawStringState::Inside => match c {
                '\r' | '\n' => (String::new(), false),
                _ => ("STR".to_string(), true),
            },
        }
    }
    fn reset(&mut self) {
        self.state = RawStringState::Init;
    }
}

#[derive(Default)]
enum DecimalState {
    #[default]
    Init,
    Rest,
    NoMore,
}

state_scanner!(SimpleDecimalNumScanner, SimpleDecimalNumScan);

#[derive(Default)]
pub struct SimpleDecimalNumScan {
    state: DecimalState,
}

impl Scan for SimpleDecimalNumScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            DecimalState::Init => {
                if c == '0' {
                    self.state = DecimalState::NoMore;
                    ("NUM".to_string(), false)
                } else if c.is_ascii_digit() {
                    self.state = DecimalState::Rest;
                    ("NUM".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
            DecimalState::Rest => {
                if c.is_ascii_digit() {
                    ("NUM".to_string(), true)
                } else {
                    self.state = DecimalState::NoMore;
                    (String::new(), false)
                }
            }
            DecimalState::NoMore => (String::new(), false),
        }
    }
    fn reset(&mut self) {
        self.state = DecimalState::Init;
    }
}

#[derive(Default)]
enum IdentState {
    #[default]
    Init,
    Rest,
}

state_scanner!(SimpleIdentifierScanner, SimpleIdentifierScan);

#[derive(Default)]
pub struct SimpleIdentifierScan {
    state: IdentState,
}

impl Scan for SimpleIdentifierScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            IdentState::Init => {
                if c.is_ascii_alphabetic() {
                    self.state = IdentState::Rest;
                    ("ID".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
            IdentState::Rest => {
                if c.is_ascii_alphanumeric() || c == '_' {
                    ("ID".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
        }
    }
    fn reset(&mut self) {
        self.state = IdentState::Init;
    }
}

/// Same shape as [`SimpleIdentifierScan`] but labels the result `$` instead
/// of `ID`. Used only as the master half of the grammar-text meta-scanner,
/// where it shadows the underlying language's identifier category so that
/// every bare word in grammar source (`X`, `NUM`, `is>` aside) is read as a
/// reference to a declared symbol rather than a literal identifier token.
state_scanner!(MetaSymbolScanner, MetaSymbolScan);

#[derive(Default)]
pub struct MetaSymbolScan {
    state: IdentState,
}

impl Scan for MetaSymbolScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            IdentState::Init => {
                if c.is_ascii_alphabetic() {
                    self.state = IdentState::Rest;
                    ("$".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
            IdentState::Rest => {
                if c.is_ascii_alphanumeric() || c == '_' {
                    ("$".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
        }
    }
    fn reset(&mut self) {
        self.state = IdentState::Init;
    }
}

#[derive(Default)]
enum BaseState {
    #[default]
    Init,
    Comment,
    CommentR,
}

state_scanner!(SimpleBaseScanner, SimpleBaseScan);

#[derive(Default)]
pub struct SimpleBaseScan {
    state: BaseState,
}

impl Scan for SimpleBaseScan {
    fn consume(&mut self, c: char) -> (String, bool) {
        match self.state {
            BaseState::Init => match c {
                ' ' | '\t' | '\r' | '\n' => ("WS".to_string(), true),
                '#' => {
                    self.state = BaseState::Comment;
                    ("WS".to_string(), true)
                }
                _ => (String::new(), false),
            },
            BaseState::Comment => match c {
                '\r' => {
                    self.state = BaseState::CommentR;
                    ("WS".to_string(), true)
                }
                '\n' => {
                    self.state = BaseState::Init;
                    ("WS".to_string(), true)
                }
                _ => ("WS".to_string(), true),
            },
            BaseState::CommentR => {
                if c == '\n' {
                    self.state = BaseState::Init;
                    ("WS".to_string(), true)
                } else {
                    (String::new(), false)
                }
            }
        }
    }
    fn reset(&mut self) {
        self.state = BaseState::Init;
    }
}

/// `compose(base, string, identifier, decimal-number)`, the baseline
/// scanner a grammar's `Lexical(...)` most commonly wraps.
pub fn default_scanner() -> Box<dyn Scanner> {
    compose_scanners(vec![
        Box::new(SimpleBaseScanner),
        Box::new(SimpleStringScanner),
        Box::new(SimpleIdentifierScanner),
        Box::new(SimpleDecimalNumScanner),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_string_scan_requires_closing_quote() {
        let scanner = SimpleStringScanner;
        let mut scan = scanner.scan();
        assert_eq!(scan.consume('"'), (String::new(), true));
        assert_eq!(scan.consume('a'), (String::new(), true));
        assert_eq!(scan.consume('"'), ("STR".to_string(), false));
    }

    #[test]
    fn simple_decimal_num_scan_rejects_leading_zero_continuation() {
        let scanner = SimpleDecimalNumScanner;
        let mut scan = scanner.scan();
        assert_eq!(scan.consume('0'), ("NUM".to_string(), false));
        scan.reset();
        assert_eq!(scan.consume('1'), ("NUM".to_string(), true));
        assert_eq!(scan.consume('2'), ("NUM".to_string(), true));
    }

    #[test]
    fn comp_scanner_rejects_disagreeing_categories() {
        let scanner = compose_scanners(vec![
            Box::new(SimpleIdentifierScanner),
            Box::new(SimpleDecimalNumScanner),
        ]);
        let mut scan = scanner.scan();
        // 'x' only matches the identifier scanner -> its category wins.
        assert_eq!(scan.consume('x'), ("ID".to_string(), true));
    }

    #[test]
    fn simple_raw_string_scan_ends_at_line_terminator_without_escapes() {
        let scanner = SimpleRawStringScanner;
        let mut scan = scanner.scan();
        assert_eq!(scan.consume('`'), ("STR".to_string(), true));
        assert_eq!(scan.consume('a'), ("STR".to_string(), true));
        assert_eq!(scan.consume('\\'), ("STR".to_string(), true));
        assert_eq!(scan.consume('n'), ("STR".to_string(), true));
        assert_eq!(scan.consume('\n'), (String::new(), false));
    }
}
