use std::io::{self, Write};

/// A single dump entry point shared by every tree type (`Syntax`, `Trace`,
/// `Span`, `Token`). Each type renders itself in two registers: `pretty`
/// (compact, indentation-based) or raw (`<cat>:<lit>:<err>:<ambit>` per
/// node). This replaces the original's duck-typed dumper interface probing
/// with one fixed method per type.
pub trait Dump {
    fn dump(&self, out: &mut dyn Write, prefix: &str, pretty: bool) -> io::Result<()>;

    fn dump_to_string(&self, pretty: bool) -> String {
        let mut buf = Vec::new();
        self.dump(&mut buf, "", pretty)
            .expect("writing to an in-memory buffer never fails");
        String::from_utf8(buf).expect("dump output is always valid UTF-8")
    }
}
