//! Minimal Whitespace and Brainfuck tokenizers.
//!
//! These are deliberately thin — spec.md treats the real lexers as
//! collaborators out of core scope. They exist so `nebulac` has something
//! to feed the builder with, not to be the interesting part of this crate.

use crate::error::{BuildError, BuildErrorKind};
use crate::token::{BfKind, BfToken, WsKind, WsToken};
use nebula_ir::{BigInt, SourcePos};

/// Tokenizes Whitespace source using a `[Space]`/`[Tab]`/`[LF]` encoding in
/// the same three-IMP-class shape as canonical Whitespace (Stack
/// manipulation / Arithmetic+heap / Flow control+I/O), ignoring any other
/// byte (real Whitespace programs are usually embedded in commented
/// host-language source). Every byte of whitespace is significant — there
/// is no "blank line" separator — matching the source language's own
/// all-whitespace-is-code discipline.
pub fn tokenize_whitespace(source: &str) -> (Vec<WsToken>, Vec<BuildError>) {
    let bytes: Vec<u8> = source
        .bytes()
        .filter(|b| matches!(b, b' ' | b'\t' | b'\n'))
        .collect();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0usize;

    // Positions are tracked in units of significant (space/tab/lf) bytes
    // rather than raw source offsets, since stripped noise carries no
    // position of its own in this minimal tokenizer.
    let pos_at = |i: usize| SourcePos {
        line: 0,
        col: i as u32,
    };

    while i < bytes.len() {
        let start = i;
        let pos = pos_at(start);
        match bytes[i] {
            b'\n' => {
                i += 1;
                match bytes.get(i) {
                    // Flow control: Label/Call/Jmp, each with a label arg.
                    Some(b' ') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                match read_number(&bytes, &mut i) {
                                    Some(n) => tokens.push(WsToken::new(WsKind::Label, Some(n), pos)),
                                    None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                                }
                            }
                            Some(b'\t') => {
                                i += 1;
                                match read_number(&bytes, &mut i) {
                                    Some(n) => tokens.push(WsToken::new(WsKind::Call, Some(n), pos)),
                                    None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                                }
                            }
                            Some(b'\n') => {
                                i += 1;
                                match read_number(&bytes, &mut i) {
                                    Some(n) => tokens.push(WsToken::new(WsKind::Jmp, Some(n), pos)),
                                    None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                                }
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    // Conditional jumps and return.
                    Some(b'\t') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                match read_number(&bytes, &mut i) {
                                    Some(n) => tokens.push(WsToken::new(WsKind::Jz, Some(n), pos)),
                                    None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                                }
                            }
                            Some(b'\t') => {
                                i += 1;
                                match read_number(&bytes, &mut i) {
                                    Some(n) => tokens.push(WsToken::new(WsKind::Jn, Some(n), pos)),
                                    None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                                }
                            }
                            Some(b'\n') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Ret, None, pos));
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    // I/O and program end.
                    Some(b'\n') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                match bytes.get(i) {
                                    Some(b' ') => {
                                        i += 1;
                                        tokens.push(WsToken::new(WsKind::Printc, None, pos));
                                    }
                                    Some(b'\t') => {
                                        i += 1;
                                        tokens.push(WsToken::new(WsKind::Printi, None, pos));
                                    }
                                    Some(b'\n') => {
                                        i += 1;
                                        tokens.push(WsToken::new(WsKind::End, None, pos));
                                    }
                                    _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                                }
                            }
                            Some(b'\t') => {
                                i += 1;
                                match bytes.get(i) {
                                    Some(b' ') => {
                                        i += 1;
                                        tokens.push(WsToken::new(WsKind::Readc, None, pos));
                                    }
                                    Some(b'\t') => {
                                        i += 1;
                                        tokens.push(WsToken::new(WsKind::Readi, None, pos));
                                    }
                                    _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                                }
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                }
            }
            b' ' => {
                i += 1;
                if i < bytes.len() && bytes[i] == b' ' {
                    i += 1;
                    match read_number(&bytes, &mut i) {
                        Some(n) => tokens.push(WsToken::new(WsKind::Push, Some(n), pos)),
                        None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
                    }
                } else if i < bytes.len() && bytes[i] == b'\t' {
                    i += 1;
                    if i < bytes.len() && bytes[i] == b' ' {
                        i += 1;
                        match read_number(&bytes, &mut i) {
                            Some(n) => tokens.push(WsToken::new(WsKind::Copy, Some(n), pos)),
                            None => {
                                errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos))
                            }
                        }
                    } else if i < bytes.len() && bytes[i] == b'\n' {
                        i += 1;
                        match read_number(&bytes, &mut i) {
                            Some(n) => tokens.push(WsToken::new(WsKind::Slide, Some(n), pos)),
                            None => {
                                errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos))
                            }
                        }
                    } else {
                        errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos));
                    }
                } else if i < bytes.len() && bytes[i] == b'\n' {
                    i += 1;
                    match bytes.get(i) {
                        Some(b' ') => {
                            i += 1;
                            tokens.push(WsToken::new(WsKind::Dup, None, pos));
                        }
                        Some(b'\t') => {
                            i += 1;
                            tokens.push(WsToken::new(WsKind::Swap, None, pos));
                        }
                        Some(b'\n') => {
                            i += 1;
                            tokens.push(WsToken::new(WsKind::Drop, None, pos));
                        }
                        _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                    }
                } else {
                    errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos));
                }
            }
            b'\t' => {
                i += 1;
                match bytes.get(i) {
                    Some(b' ') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Add, None, pos))
                            }
                            Some(b'\t') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Sub, None, pos))
                            }
                            Some(b'\n') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Mul, None, pos))
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    Some(b'\t') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Div, None, pos))
                            }
                            Some(b'\t') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Mod, None, pos))
                            }
                            Some(b'\n') => {
                                i += 1;
                                errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos));
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    Some(b'\n') => {
                        i += 1;
                        match bytes.get(i) {
                            Some(b' ') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Store, None, pos))
                            }
                            Some(b'\t') => {
                                i += 1;
                                tokens.push(WsToken::new(WsKind::Retrieve, None, pos))
                            }
                            _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                        }
                    }
                    _ => errors.push(BuildError::new(BuildErrorKind::UnexpectedEof, pos)),
                }
            }
            _ => unreachable!("filtered to only space/tab/lf bytes"),
        }
    }

    (tokens, errors)
}

/// Reads a Whitespace number literal: a sign bit (`[Space]`=+, `[Tab]`=-)
/// followed by binary digits (`[Space]`=0, `[Tab]`=1), terminated by `[LF]`.
fn read_number(bytes: &[u8], i: &mut usize) -> Option<BigInt> {
    let negative = match bytes.get(*i)? {
        b' ' => false,
        b'\t' => true,
        _ => return None,
    };
    *i += 1;
    let mut magnitude = BigInt::zero();
    let two = BigInt::new(2);
    loop {
        match bytes.get(*i) {
            Some(b' ') => {
                magnitude = magnitude.mul(&two);
                *i += 1;
            }
            Some(b'\t') => {
                magnitude = magnitude.mul(&two).add(&BigInt::new(1));
                *i += 1;
            }
            Some(b'\n') => {
                *i += 1;
                break;
            }
            _ => return None,
        }
    }
    Some(if negative { magnitude.neg() } else { magnitude })
}

/// Tokenizes Brainfuck source; every byte not in `><+-.,[]` is treated as
/// commentary and skipped, matching the language's usual convention.
pub fn tokenize_brainfuck(source: &str) -> Vec<BfToken> {
    let mut tokens = Vec::new();
    let mut line = 0u32;
    let mut col = 0u32;
    for ch in source.chars() {
        let pos = SourcePos { line, col };
        let kind = match ch {
            '>' => Some(BfKind::IncPtr),
            '<' => Some(BfKind::DecPtr),
            '+' => Some(BfKind::IncData),
            '-' => Some(BfKind::DecData),
            '.' => Some(BfKind::Print),
            ',' => Some(BfKind::Read),
            '[' => Some(BfKind::Bracket),
            ']' => Some(BfKind::EndBracket),
            _ => None,
        };
        if let Some(kind) = kind {
            tokens.push(BfToken::new(kind, pos));
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_push_of_small_positive_number() {
        // `Push 1`: SS (push imp) then S (positive sign), T (digit 1), L (terminator)
        let src = "   \t\n";
        let (tokens, errors) = tokenize_whitespace(src);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, WsKind::Push);
        assert_eq!(tokens[0].arg, Some(BigInt::new(1)));
    }

    #[test]
    fn tokenizes_label_and_jmp_with_label_args() {
        // Label 1: L S S (number 1: S T L); Jmp 1: L S L (number 1: S T L)
        let src = "\n   \t\n\n \n \t\n";
        let (tokens, errors) = tokenize_whitespace(src);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, WsKind::Label);
        assert_eq!(tokens[0].arg, Some(BigInt::new(1)));
        assert_eq!(tokens[1].kind, WsKind::Jmp);
        assert_eq!(tokens[1].arg, Some(BigInt::new(1)));
    }

    #[test]
    fn tokenizes_printc_then_end() {
        // Printc: L L S S; End: L L S L
        let src = "\n\n  \n\n \n";
        let (tokens, errors) = tokenize_whitespace(src);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, WsKind::Printc);
        assert_eq!(tokens[1].kind, WsKind::End);
    }

    #[test]
    fn tokenizes_ret_with_no_argument() {
        // Ret: L T L
        let src = "\n\t\n";
        let (tokens, errors) = tokenize_whitespace(src);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, WsKind::Ret);
        assert_eq!(tokens[0].arg, None);
    }

    #[test]
    fn brainfuck_skips_comment_bytes() {
        let tokens = tokenize_brainfuck("+ + hello [->+<] ");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BfKind::IncData,
                BfKind::IncData,
                BfKind::Bracket,
                BfKind::DecData,
                BfKind::IncPtr,
                BfKind::IncData,
                BfKind::DecPtr,
                BfKind::EndBracket,
            ]
        );
    }
}
