//! CLI front-end for exercising the DUSL pipeline against a fixed
//! demonstration lexicon: `NUM`/`ID`/`STR` categories, `+ - * /` operators,
//! `( )`/`[ ]`/`{ }` brackets, and three declared labels (`X` an ordinary
//! rule label, `XSN` a sentence label, `XSQ` a sequence label). `trace`
//! compiles a user-supplied grammar-rule file against that lexicon.
//!
//! Exit code is 0 whenever the pipeline itself runs to completion, even if
//! the resulting tree contains `ERR` nodes — an `ERR` node is pipeline
//! *output*, not a CLI failure. Exit code 1 is reserved for the CLI
//! failing to do its job: a file it couldn't read, or a grammar it
//! couldn't compile.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use dusl::{Diagnostics, Spec};
use dusl_core::{Dump, GrammarError, Source};

#[derive(Parser)]
#[command(name = "dusl", version, about = "Drive the DUSL parsing pipeline over a file")]
struct Cli {
    /// Increase log verbosity (-v, -vv). Overridden by RUST_LOG if set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a file into its undent tree of sequences and sentences.
    Undent {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Tokenize a file against the built-in demonstration lexicon.
    Tokenize {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Sparse (parse) a file against the built-in demonstration lexicon.
    Sparse {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Compile a grammar-rule file against the demonstration lexicon, then
    /// trace an input file through it under the given label.
    Trace {
        file: PathBuf,
        /// Path to a grammar-rule file (the `is>`/`or>` rule text).
        #[arg(long)]
        grammar: PathBuf,
        /// Which declared label to trace from.
        #[arg(long, default_value = "X")]
        label: String,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not compile grammar: {0}")]
    Grammar(#[from] GrammarError),
}

/// The fixed lexicon every subcommand other than `undent` parses against.
fn demo_lexicon() -> Spec {
    Spec::new()
        .lexical(dusl::default_scanner())
        .category("NUM", "number")
        .category("ID", "identifier")
        .category("STR", "string")
        .operator_efa(["+", "-"])
        .operator_bfa(["+", "-", "*", "/"])
        .brackets(["( )", "[ ]", "{ }"])
}

fn read_source(path: &PathBuf) -> Result<std::rc::Rc<Source>, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::ReadFile {
        path: path.clone(),
        source,
    })?;
    Ok(Source::new(path.display().to_string(), bytes))
}

fn run(cli: Cli) -> Result<String, CliError> {
    match cli.command {
        Command::Undent { file, pretty } => {
            let source = read_source(&file)?;
            let tree = dusl::undent(&source);
            Ok(tree.dump_to_string(pretty))
        }
        Command::Tokenize { file, pretty } => {
            let source = read_source(&file)?;
            let lang = demo_lexicon()
                .label("X", "demonstration lexicon")
                .grammar("X is> NUM or> ID or> STR")?;
            let lines = lang.tokenizer().tokenize_undent(&source);
            let mut out = String::new();
            for (_, tokens) in lines {
                for token in tokens {
                    if pretty {
                        if !token.is_whitespace() {
                            out.push_str(&token.to_string());
                            out.push(' ');
                        }
                    } else {
                        out.push_str(&token.to_string());
                        out.push('\n');
                    }
                }
                if pretty {
                    out.push('\n');
                }
            }
            Ok(out)
        }
        Command::Sparse { file, pretty } => {
            let source = read_source(&file)?;
            let lang = demo_lexicon()
                .label("X", "demonstration lexicon")
                .grammar("X is> NUM or> ID or> STR or> X + X or> X - X or> X * X or> X / X or> +X or> -X")?;
            let tree = lang.sparser().sparse_undent(&source);
            Ok(tree.dump_to_string(pretty))
        }
        Command::Trace {
            file,
            grammar,
            label,
            pretty,
        } => {
            let source = read_source(&file)?;
            let grammar_text = fs::read_to_string(&grammar).map_err(|source| CliError::ReadFile {
                path: grammar.clone(),
                source,
            })?;
            let lang = demo_lexicon()
                .label("X", "an ordinary expression")
                .sentence_label("XSN", "one X per line")
                .sequence_label("XSQ", "zero or more X, one per line")
                .grammar_at(grammar.display().to_string(), 0, &grammar_text)
                .map_err(|err| match err {
                    GrammarError::Rules(errs) => {
                        let rendered = Diagnostics::new(errs).printer().render();
                        GrammarError::Config(rendered)
                    }
                    other => other,
                })?;
            let trace = lang.tracer().trace_undent(&source, &label);
            Ok(trace.dump_to_string(pretty))
        }
    }
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn undent_dumps_a_tree_for_an_existing_file() {
        let file = write_temp("a\n  b\n");
        let cli = Cli {
            verbose: 0,
            command: Command::Undent {
                file: file.path().to_path_buf(),
                pretty: false,
            },
        };
        let out = run(cli).expect("undent should succeed");
        assert!(out.contains("SQ"), "{out}");
    }

    #[test]
    fn undent_reports_a_missing_file_as_an_error() {
        let cli = Cli {
            verbose: 0,
            command: Command::Undent {
                file: PathBuf::from("/nonexistent/does-not-exist.txt"),
                pretty: false,
            },
        };
        let err = run(cli).expect_err("missing file should error");
        assert!(err.to_string().contains("could not read"), "{err}");
    }

    #[test]
    fn sparse_parses_a_numeric_expression() {
        let file = write_temp("1 + 2\n");
        let cli = Cli {
            verbose: 0,
            command: Command::Sparse {
                file: file.path().to_path_buf(),
                pretty: true,
            },
        };
        let out = run(cli).expect("sparse should succeed");
        assert!(out.contains('+'), "{out}");
    }

    #[test]
    fn trace_reports_undeclared_symbols_as_a_grammar_error() {
        let file = write_temp("1\n");
        let grammar = write_temp("X is> goo");
        let cli = Cli {
            verbose: 0,
            command: Command::Trace {
                file: file.path().to_path_buf(),
                grammar: grammar.path().to_path_buf(),
                label: "X".to_string(),
                pretty: false,
            },
        };
        let err = run(cli).expect_err("undeclared symbol should fail grammar compilation");
        assert!(err.to_string().contains("undeclared symbol"), "{err}");
    }

    #[test]
    fn trace_labels_a_numeric_literal() {
        let file = write_temp("1\n");
        let grammar = write_temp("X is> NUM");
        let cli = Cli {
            verbose: 0,
            command: Command::Trace {
                file: file.path().to_path_buf(),
                grammar: grammar.path().to_path_buf(),
                label: "X".to_string(),
                pretty: true,
            },
        };
        let out = run(cli).expect("trace should succeed");
        assert!(out.contains("X:0:1"), "{out}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
