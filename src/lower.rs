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
use crate::bytecode::{Cell, Instruction, OpCode, Program};
use crate::syntax::{Command, Node};
use std::collections::HashMap;
use std::fmt;

/// A failure raised while walking syntax nodes into byte-code: right
/// now the only such failure is a label defined more than once.
/// Distinct from [`crate::syntax::SyntaxError`] since lowering runs as
/// its own pipeline stage, after parsing has already succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct LowerError {
    pub offset: usize,
    pub label: String,
    pub message: String,
}

impl LowerError {
    pub fn new(offset: usize, label: impl Into<String>, message: impl Into<String>) -> Self {
        Self { offset, label: label.into(), message: message.into() }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {} (label \"{}\")", self.message, self.offset, self.label)
    }
}

impl std::error::Error for LowerError {}

/// Walks the flat syntax sequence in order, assigning each distinct
/// label text a dense integer identifier on first sighting, and
/// emits one instruction per node.
pub struct Lowerer {
    ids: HashMap<String, Cell>,
    defined: HashMap<String, usize>,
    next_id: Cell,
}

impl Lowerer {
    pub fn new() -> Self {
        Self { ids: HashMap::new(), defined: HashMap::new(), next_id: 0 }
    }

    pub fn lower(mut self, nodes: &[Node]) -> std::result::Result<Program, LowerError> {
        log::debug!("lowering {} syntax nodes", nodes.len());
        let mut program = Program::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Label { text, offset } => {
                    if self.defined.insert(text.clone(), *offset).is_some() {
                        return Err(LowerError::new(
                            *offset,
                            text.clone(),
                            format!("label \"{}\" is defined more than once", text),
                        ));
                    }
                    let id = self.id_for(text);
                    program.push(Instruction::new(OpCode::Label, id, *offset));
                }
                Node::Command { command: Command::Jump, offset, children } => {
                    let target = match &children[0] {
                        Node::Label { text, .. } => text,
                        Node::Command { .. } => unreachable!("jump child is always a label"),
                    };
                    let id = self.id_for(target);
                    program.push(Instruction::new(OpCode::Jump, id, *offset));
                }
                Node::Command { command, offset, .. } => {
                    program.push(Instruction::new(opcode_of(*command), 0, *offset));
                }
            }
        }
        log::info!("lowered to {} instructions ({} distinct labels)", program.len(), self.ids.len());
        Ok(program)
    }

    fn id_for(&mut self, text: &str) -> Cell {
        if let Some(id) = self.ids.get(text) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(text.to_string(), id);
        id
    }
}

fn opcode_of(command: Command) -> OpCode {
    match command {
        Command::Push0 => OpCode::Push0,
        Command::Pop => OpCode::Pop,
        Command::Bump => OpCode::Bump,
        Command::Func => OpCode::Func,
        Command::Jump => unreachable!("jump handled separately"),
    }
}

// =================================================================
// Tests
// =================================================================
