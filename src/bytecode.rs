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

/// The type of every value that can live on the operand stack, and of
/// every instruction's immediate.  A plain 32-bit signed integer,
/// matching the host language's `int` that the original interpreter
/// used for the same purpose.
pub type Cell = i32;

// =================================================================
// OpCode
// =================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    NoOp,
    Label,
    Push0,
    Pop,
    Bump,
    Func,
    Jump,
    PushConst,
}

// =================================================================
// Instruction
// =================================================================

/// One entry of the flat byte-code vector the lowerer produces and
/// the optimizer rewrites.  `offset` is the byte position of the
/// token that gave rise to this instruction, kept purely for
/// diagnostics; it plays no role in execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub a: Cell,
    pub offset: usize,
}

impl Instruction {
    pub fn new(op: OpCode, a: Cell, offset: usize) -> Self {
        Self { op, a, offset }
    }
}

/// A complete program: the byte-code vector, ready either for the
/// optimizer or for direct execution.
pub type Program = Vec<Instruction>;
