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
use crate::lexer::{LexError, Lexeme, Lexer, Token};
use std::fmt;

// =================================================================
// Commands
// =================================================================

/// The five primitive commands of the language.  `Jump` is special in
/// that it is the only command which takes a child node (its target
/// label).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Push0,
    Pop,
    Bump,
    Func,
    Jump,
}

impl Command {
    /// Map a single command character to its `Command`, collapsing
    /// case.  Returns `None` for anything outside `S H R E K`.
    pub fn from_char(c: char) -> Option<Command> {
        match c.to_ascii_uppercase() {
            'S' => Some(Command::Push0),
            'H' => Some(Command::Pop),
            'R' => Some(Command::Bump),
            'E' => Some(Command::Func),
            'K' => Some(Command::Jump),
            _ => None,
        }
    }
}

// =================================================================
// Syntax nodes
// =================================================================

/// One entry in the flat syntax sequence.  Only a `Command::Jump`
/// node ever has a child, and then always exactly one: the `Label`
/// node naming its target.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Command { command: Command, offset: usize, children: Vec<Node> },
    Label { text: String, offset: usize },
}

impl Node {
    pub fn offset(&self) -> usize {
        match self {
            Node::Command { offset, .. } => *offset,
            Node::Label { offset, .. } => *offset,
        }
    }
}

// =================================================================
// Errors
// =================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
    pub token: String,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {} (near \"{}\")", self.message, self.offset, self.token)
    }
}

impl std::error::Error for SyntaxError {}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> SyntaxError {
        SyntaxError {
            offset: e.offset,
            token: e.character.to_string(),
            message: "invalid token".to_string(),
        }
    }
}

// =================================================================
// Parser
// =================================================================

/// Turns a flat lexeme stream into a flat sequence of syntax nodes.
/// Whitespace and comments are dropped here; everything downstream
/// only ever sees commands and labels.
#[derive(Debug)]
pub struct Parser {
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> std::result::Result<Parser, SyntaxError> {
        let lexemes = Lexer::new(source).tokenize()?;
        Ok(Parser { lexemes, pos: 0 })
    }

    pub fn parse(mut self) -> std::result::Result<Vec<Node>, SyntaxError> {
        let mut nodes = Vec::new();
        while let Some(lexeme) = self.advance_trivia() {
            let node = match lexeme.kind {
                Token::Command => self.parse_command(lexeme)?,
                Token::Label => Node::Label { text: lexeme.text, offset: lexeme.offset },
                Token::Whitespace | Token::Comment => unreachable!("trivia skipped above"),
            };
            log::debug!("parsed node at offset {}", node.offset());
            nodes.push(node);
        }
        log::info!("parsed {} syntax nodes", nodes.len());
        Ok(nodes)
    }

    /// Advance past whitespace/comments and return the next
    /// significant lexeme, or `None` at end of input.
    fn advance_trivia(&mut self) -> Option<Lexeme> {
        while self.pos < self.lexemes.len() {
            let l = self.lexemes[self.pos].clone();
            self.pos += 1;
            match l.kind {
                Token::Whitespace | Token::Comment => continue,
                _ => return Some(l),
            }
        }
        None
    }

    fn parse_command(&mut self, lexeme: Lexeme) -> std::result::Result<Node, SyntaxError> {
        let c = lexeme.text.chars().next().unwrap();
        let command = Command::from_char(c).ok_or_else(|| {
            log::error!("unrecognised command '{}' at offset {}", c, lexeme.offset);
            SyntaxError {
                offset: lexeme.offset,
                token: lexeme.text.clone(),
                message: "unrecognised command".to_string(),
            }
        })?;
        let children = if command == Command::Jump {
            let label = self.advance_trivia().ok_or_else(|| SyntaxError {
                offset: lexeme.offset,
                token: lexeme.text.clone(),
                message: "missing label after jump command".to_string(),
            })?;
            if label.kind != Token::Label {
                log::error!("missing label after jump command at offset {}", lexeme.offset);
                return Err(SyntaxError {
                    offset: label.offset,
                    token: label.text,
                    message: "missing label after jump command".to_string(),
                });
            }
            vec![Node::Label { text: label.text, offset: label.offset }]
        } else {
            Vec::new()
        };
        Ok(Node::Command { command, offset: lexeme.offset, children })
    }
}

// =================================================================
// Tests
// =================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<Node> {
        Parser::new(src).unwrap().parse().unwrap()
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse(""), vec![]);
    }

    #[test]
    fn test_simple_commands() {
        let nodes = parse("SHR");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0], Node::Command { command: Command::Push0, .. }));
        assert!(matches!(nodes[1], Node::Command { command: Command::Pop, .. }));
        assert!(matches!(nodes[2], Node::Command { command: Command::Bump, .. }));
    }

    #[test]
    fn test_jump_attaches_label_child() {
        let nodes = parse("K!SS!");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Command { command: Command::Jump, children, .. } => {
                assert_eq!(children.len(), 1);
                assert!(matches!(&children[0], Node::Label { text, .. } if text == "!SS!"));
            }
            _ => panic!("expected a jump node"),
        }
    }

    #[test]
    fn test_label_definition_is_a_top_level_node() {
        let nodes = parse("!SS!S");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], Node::Label { text, .. } if text == "!SS!"));
    }

    #[test]
    fn test_jump_without_label_is_an_error() {
        let err = Parser::new("K").unwrap().parse().unwrap_err();
        assert!(err.message.contains("missing label"));
    }

    #[test]
    fn test_jump_followed_by_command_is_an_error() {
        let err = Parser::new("KS").unwrap().parse().unwrap_err();
        assert!(err.message.contains("missing label"));
    }

    #[test]
    fn test_invalid_command_character_rejected_earlier_by_lexer() {
        // Anything outside the command alphabet never reaches the
        // parser as a `Command` token in the first place.
        let err = Parser::new("Z").unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_comments_and_whitespace_are_dropped() {
        let nodes = parse("  S # push\n  H");
        assert_eq!(nodes.len(), 2);
    }
}
