//! The Undenter: turns a raw source into a binary tree of sequences (`SQ`)
//! and sentences (`SN`), using 2-space indentation to mark sub-blocks and
//! 5-or-more-space indentation to mark a line continuation. This is the
//! trickiest piece of the pipeline — the split between what
//! [`undent_sequence`] decides about a line and what [`undent_sentence`]
//! absorbs on its behalf is exact and must not be flattened into a single
//! pass.

use std::rc::Rc;

use dusl_core::{Ambit, Source, Syntax};

enum LineKind {
    Blank,
    Comment,
    Content,
}

/// Classifies the first line of `ambit`: its leading-space count, whether
/// it's blank/comment-only/real content, the line itself (including its
/// terminator), and the remainder after it.
fn classify_line(ambit: &Ambit) -> (usize, LineKind, Ambit, Ambit) {
    let (line, rest) = ambit.split_line();
    let (indent, after_indent) = line.strip_indent();
    let kind = if after_indent.is_whitespace() {
        LineKind::Blank
    } else if after_indent.first_byte_is(b'#') {
        LineKind::Comment
    } else {
        LineKind::Content
    };
    (indent, kind, line, rest)
}

fn empty_node(ambit: Ambit) -> Syntax {
    Syntax::empty(ambit)
}

fn error_node(message: impl Into<String>, ambit: Ambit) -> Syntax {
    Syntax::error(message, ambit)
}

fn sq_node(left: Syntax, right: Syntax) -> Syntax {
    let ambit = left.ambit.merge(&right.ambit);
    Syntax {
        cat: "SQ".to_string(),
        lit: String::new(),
        err: String::new(),
        ambit,
        op_ambit: None,
        left: Some(Box::new(left)),
        right: Some(Box::new(right)),
    }
}

/// Parses the whole source into its top-level `SQ`/`SN`/`UN` tree. Returns
/// a lone empty node when the source has no real content.
pub fn undent(source: &Rc<Source>) -> Syntax {
    let ambit = source.full_ambit();
    let mut cursor = ambit.clone();
    loop {
        if cursor.is_empty() {
            return empty_node(cursor);
        }
        let (indent, kind, _line, rest) = classify_line(&cursor);
        match kind {
            LineKind::Blank | LineKind::Comment => {
                cursor = rest;
            }
            LineKind::Content => {
                let margin = indent;
                if margin % 2 != 0 {
                    return error_node("first line indented with odd number of spaces", ambit);
                }
                let (root, _remainder) = undent_sequence(margin, 0, &ambit);
                return root;
            }
        }
    }
}

/// Parses a run of sentences at indentation `curr_indent` (relative to
/// `margin`), stopping (without consuming) at the first line indented
/// less than `curr_indent` or at end of input. Returns the sequence tree
/// plus whatever ambit was left unconsumed.
fn undent_sequence(margin: usize, curr_indent: usize, ambit: &Ambit) -> (Syntax, Ambit) {
    let mut cursor = ambit.clone();
    loop {
        if cursor.is_empty() {
            return (empty_node(cursor.collapse_left()), cursor);
        }
        let (indent, kind, line, rest) = classify_line(&cursor);
        match kind {
            LineKind::Blank | LineKind::Comment => {
                cursor = rest;
                continue;
            }
            LineKind::Content => {
                let line_indent = indent as isize - margin as isize;
                if line_indent >= 0 && (line_indent as usize) < curr_indent {
                    return (empty_node(cursor.collapse_left()), cursor);
                }
                let (head, next_rest) = if line_indent < 0 {
                    (
                        error_node(
                            format!("line indented {} spaces before source margin", -line_indent),
                            line.clone(),
                        ),
                        rest,
                    )
                } else {
                    let li = line_indent as usize;
                    if li == curr_indent {
                        undent_sentence(margin, curr_indent, &line, &rest)
                    } else if li == curr_indent + 1 {
                        (
                            error_node("line indented with odd number of spaces", line.clone()),
                            rest,
                        )
                    } else if li >= curr_indent + 2 && li < curr_indent + 5 {
                        (
                            error_node(
                                "line indented more than 2 and less than 5 spaces with respect to previous line: indent 2 spaces for sub-block: indent 5 spaces or more for continuing previous line",
                                line.clone(),
                            ),
                            rest,
                        )
                    } else {
                        (
                            error_node(
                                "line continuation not possible here: indent less than 5 spaces with respect to previous line",
                                line.clone(),
                            ),
                            rest,
                        )
                    }
                };
                let (tail, final_rest) = undent_sequence(margin, curr_indent, &next_rest);
                return (sq_node(head, tail), final_rest);
            }
        }
    }
}

/// Absorbs the first sentence starting at `first_line`: every further
/// blank/comment line unconditionally, and every further content line
/// indented 5 or more spaces past `curr_indent` (a continuation). The
/// first line that doesn't qualify stops the absorption without being
/// consumed, then `undent_sequence(margin, curr_indent + 2, ...)` is run
/// once to recognize a legitimate sub-block trailing the sentence.
fn undent_sentence(
    margin: usize,
    curr_indent: usize,
    first_line: &Ambit,
    ambit: &Ambit,
) -> (Syntax, Ambit) {
    let mut sentence_ambit = first_line.clone();
    let mut cursor = ambit.clone();
    loop {
        if cursor.is_empty() {
            break;
        }
        let (indent, kind, line, rest) = classify_line(&cursor);
        match kind {
            LineKind::Blank | LineKind::Comment => {
                sentence_ambit = sentence_ambit.merge(&line);
                cursor = rest;
            }
            LineKind::Content => {
                let line_indent = indent as isize - margin as isize;
                if line_indent < (curr_indent + 5) as isize {
                    break;
                }
                sentence_ambit = sentence_ambit.merge(&line);
                cursor = rest;
            }
        }
    }
    let (sub_sequence, final_rest) = undent_sequence(margin, curr_indent + 2, &cursor);
    let un = Syntax {
        cat: "UN".to_string(),
        lit: String::new(),
        err: String::new(),
        ambit: sentence_ambit.clone(),
        op_ambit: None,
        left: None,
        right: None,
    };
    let merged = sentence_ambit.merge(&sub_sequence.ambit);
    (
        Syntax {
            cat: "SN".to_string(),
            lit: String::new(),
            err: String::new(),
            ambit: merged,
            op_ambit: None,
            left: Some(Box::new(un)),
            right: Some(Box::new(sub_sequence)),
        },
        final_rest,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dusl_core::Dump;
    use indoc::indoc;

    #[test]
    fn single_sentence_has_one_un_leaf() {
        let source = Source::from_string("a b c\n");
        let tree = undent(&source);
        assert_eq!(tree.cat, "SQ");
        let sentence = tree.left.as_deref().unwrap();
        assert_eq!(sentence.cat, "SN");
        let un = sentence.left.as_deref().unwrap();
        assert_eq!(un.cat, "UN");
        assert_eq!(un.ambit.to_str().trim_end(), "a b c");
    }

    #[test]
    fn odd_margin_on_first_line_is_an_error() {
        let source = Source::from_string(" a\n");
        let tree = undent(&source);
        assert_eq!(tree.cat, "ERR");
        assert_eq!(tree.err, "first line indented with odd number of spaces");
    }

    #[test]
    fn sub_block_indented_two_spaces_nests_under_its_sentence() {
        let source = Source::from_string(indoc! {"
            a
              b
            c
        "});
        let tree = undent(&source);
        let first_sentence = tree.left.as_deref().unwrap();
        let sub_sequence = first_sentence.right.as_deref().unwrap();
        assert_eq!(sub_sequence.cat, "SQ");
        let inner_sentence = sub_sequence.left.as_deref().unwrap();
        let inner_un = inner_sentence.left.as_deref().unwrap();
        assert_eq!(inner_un.ambit.to_str().trim_end(), "b");
    }

    #[test]
    fn continuation_indented_five_spaces_merges_into_same_sentence() {
        let source = Source::from_string(indoc! {"
            a
                 b
        "});
        let tree = undent(&source);
        let sentence = tree.left.as_deref().unwrap();
        let un = sentence.left.as_deref().unwrap();
        assert!(un.ambit.to_str().contains("a"));
        assert!(un.ambit.to_str().contains("b"));
    }

    #[test]
    fn three_space_indent_is_rejected() {
        let source = Source::from_string(indoc! {"
            a
               b
        "});
        let tree = undent(&source);
        let mut buf = Vec::new();
        tree.dump(&mut buf, "", false).unwrap();
        let dumped = String::from_utf8(buf).unwrap();
        assert!(dumped.contains("ERR:"));
    }

    #[test]
    fn whitespace_only_line_with_a_tab_is_blank_not_content() {
        let source = Source::from_string("a\n  \t\nb\n");
        let tree = undent(&source);
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());
        let first = tree.left.as_deref().unwrap();
        assert_eq!(first.cat, "SN");
        let tail = tree.right.as_deref().unwrap();
        assert_eq!(tail.cat, "SQ");
        let second_sentence = tail.left.as_deref().unwrap();
        assert_eq!(second_sentence.cat, "SN");
        let un = second_sentence.left.as_deref().unwrap();
        assert_eq!(un.ambit.to_str().trim_end(), "b");
    }
}
