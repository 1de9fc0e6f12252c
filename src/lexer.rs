// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use crate::lex::{Scanner, Span, TableLexer};
use std::fmt;

/// The five letters (and their uppercase forms) which make up every
/// command in a program.  Case is preserved in the token text but
/// collapses when a command is mapped to an opcode (see `crate::syntax`).
pub const COMMAND_ALPHABET: &[char] = &['S', 'H', 'R', 'E', 'K', 's', 'h', 'r', 'e', 'k'];

// =================================================================
// Token
// =================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token {
    Whitespace,
    Command,
    Label,
    Comment,
}

/// A token together with the literal source text it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct Lexeme {
    pub kind: Token,
    pub text: String,
    pub offset: usize,
}

// =================================================================
// Error
// =================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub offset: usize,
    pub character: char,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unrecognised character '{}' at offset {}", self.character, self.offset)
    }
}

impl std::error::Error for LexError {}

// =================================================================
// Rules
// =================================================================

type Result = std::result::Result<Span<Token>, ()>;

fn is_command_char(c: char) -> bool {
    COMMAND_ALPHABET.contains(&c)
}

/// `!` followed by one-or-more command-alphabet characters, closed by
/// a second `!`.  Tried before `scan_command` so that the leading `!`
/// is never mistaken for the start of a bare command.
fn scan_label(input: &[char]) -> Result {
    if input.first() != Some(&'!') {
        return Err(());
    }
    let mut i = 1;
    while i < input.len() && is_command_char(input[i]) {
        i += 1;
    }
    if i == 1 || input.get(i) != Some(&'!') {
        return Err(());
    }
    Ok(Span::new(Token::Label, 0..i + 1))
}

fn scan_command(input: &[char]) -> Result {
    match input.first() {
        Some(&c) if is_command_char(c) => Ok(Span::new(Token::Command, 0..1)),
        _ => Err(()),
    }
}

fn scan_whitespace(input: &[char]) -> Result {
    let mut i = 0;
    while i < input.len() && input[i].is_whitespace() {
        i += 1;
    }
    if i == 0 {
        Err(())
    } else {
        Ok(Span::new(Token::Whitespace, 0..i))
    }
}

/// `#` through end of line, the newline (if present) included so that
/// a trailing comment on the last line is still consumed correctly.
fn scan_comment(input: &[char]) -> Result {
    if input.first() != Some(&'#') {
        return Err(());
    }
    let mut i = 1;
    while i < input.len() && input[i] != '\n' {
        i += 1;
    }
    if i < input.len() {
        i += 1; // swallow the newline too
    }
    Ok(Span::new(Token::Comment, 0..i))
}

static RULES: &[Scanner<Token>] = &[scan_label, scan_command, scan_whitespace, scan_comment];

// =================================================================
// Lexer
// =================================================================

pub struct Lexer<'a> {
    source: &'a str,
    chars: TableLexer<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, chars: TableLexer::new(source, RULES) }
    }

    /// Tokenize the entire source, discarding nothing: callers that
    /// want to skip trivia (whitespace/comments) do so downstream in
    /// the parser, since the lexer's job is purely to segment input.
    pub fn tokenize(mut self) -> std::result::Result<Vec<Lexeme>, LexError> {
        let mut out = Vec::new();
        while !self.chars.is_eof() {
            match self.chars.next() {
                Ok(span) => {
                    let text = self.chars.text(span);
                    log::trace!("token {:?} {:?} at offset {}", span.kind, text, span.start);
                    out.push(Lexeme { kind: span.kind, text, offset: span.start });
                }
                Err(offset) => {
                    let character = self.source.chars().nth(offset).unwrap_or('\0');
                    log::error!("unrecognised character '{}' at offset {}", character, offset);
                    return Err(LexError { offset, character });
                }
            }
        }
        log::info!("lexed {} tokens", out.len());
        Ok(out)
    }
}

// =================================================================
// Tests
// =================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(kinds(""), vec![]);
    }

    #[test]
    fn test_single_command() {
        assert_eq!(kinds("S"), vec![Token::Command]);
    }

    #[test]
    fn test_lowercase_command() {
        assert_eq!(kinds("s"), vec![Token::Command]);
    }

    #[test]
    fn test_whitespace_collapses_to_one_token() {
        assert_eq!(kinds("S   H"), vec![Token::Command, Token::Whitespace, Token::Command]);
    }

    #[test]
    fn test_label() {
        let lexemes = Lexer::new("!SS!").tokenize().unwrap();
        assert_eq!(lexemes.len(), 1);
        assert_eq!(lexemes[0].kind, Token::Label);
        assert_eq!(lexemes[0].text, "!SS!");
    }

    #[test]
    fn test_mixed_case_label() {
        let lexemes = Lexer::new("!sHrEk!").tokenize().unwrap();
        assert_eq!(lexemes[0].kind, Token::Label);
        assert_eq!(lexemes[0].text, "!sHrEk!");
    }

    #[test]
    fn test_comment_to_end_of_line() {
        let lexemes = Lexer::new("# hello\nS").tokenize().unwrap();
        assert_eq!(lexemes[0].kind, Token::Comment);
        assert_eq!(lexemes[0].text, "# hello\n");
        assert_eq!(lexemes[1].kind, Token::Command);
    }

    #[test]
    fn test_comment_without_trailing_newline() {
        let lexemes = Lexer::new("# hello").tokenize().unwrap();
        assert_eq!(lexemes.len(), 1);
        assert_eq!(lexemes[0].text, "# hello");
    }

    #[test]
    fn test_unlabelled_bang_is_an_error() {
        let err = Lexer::new("!").tokenize().unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_invalid_character() {
        let err = Lexer::new("S@H").tokenize().unwrap_err();
        assert_eq!(err.offset, 1);
        assert_eq!(err.character, '@');
    }

    #[test]
    fn test_full_program_fragment() {
        let kinds = kinds("S R R R !SS! # comment\nE");
        assert_eq!(
            kinds,
            vec![
                Token::Command,
                Token::Whitespace,
                Token::Command,
                Token::Whitespace,
                Token::Command,
                Token::Whitespace,
                Token::Command,
                Token::Whitespace,
                Token::Label,
                Token::Whitespace,
                Token::Comment,
                Token::Command,
            ]
        );
    }
}
