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
//! Function numbers for the reserved built-in catalogue, and the
//! arithmetic they perform.  This lives apart from `vm::builtins` so
//! that the optimizer's constant-folding passes and the VM's actual
//! `func` dispatch can share one definition of "what `add` computes"
//! rather than risking the two drifting apart.
use crate::bytecode::Cell;

pub const INPUT: Cell = 0;
pub const OUTPUT: Cell = 1;
pub const ADD: Cell = 2;
pub const SUBTRACT: Cell = 3;
pub const MULTIPLY: Cell = 4;
pub const DIVIDE: Cell = 5;
pub const MOD: Cell = 6;
pub const DOUBLE: Cell = 7;
pub const NEGATE: Cell = 8;
pub const SQUARE: Cell = 9;
pub const CLONE: Cell = 10;
pub const STASH_ADD: Cell = 11;
pub const STASH_GET: Cell = 12;
pub const STASH_DELETE: Cell = 13;

/// One past the largest reserved built-in number; function numbers at
/// or above this are looked up in the extension table instead.
pub const RESERVED_THRESHOLD: Cell = 255;

// =================================================================
// Arithmetic shared with the optimizer
// =================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
}

/// Classify a function number as one of the two-operand arithmetic
/// built-ins, or `None` if it isn't one (including extension numbers
/// and non-arithmetic built-ins like `input`/`clone`).
pub fn binary_op(num: Cell) -> Option<BinOp> {
    match num {
        ADD => Some(BinOp::Add),
        SUBTRACT => Some(BinOp::Subtract),
        MULTIPLY => Some(BinOp::Multiply),
        DIVIDE => Some(BinOp::Divide),
        MOD => Some(BinOp::Mod),
        _ => None,
    }
}

/// Evaluate a binary built-in given the stack state it would see: `v1`
/// is the operand pushed first (deeper), `v0` the operand pushed
/// second (on top, just under the function number).  Returns `None`
/// for division or modulus by zero, which the optimizer treats as "do
/// not fold" and the VM treats as a runtime error.
pub fn eval_binary(op: BinOp, v1: Cell, v0: Cell) -> Option<Cell> {
    match op {
        BinOp::Add => Some(v1.wrapping_add(v0)),
        BinOp::Subtract => Some(v1.wrapping_sub(v0)),
        BinOp::Multiply => Some(v1.wrapping_mul(v0)),
        BinOp::Divide => {
            if v0 == 0 {
                None
            } else {
                Some(v1.wrapping_div(v0))
            }
        }
        BinOp::Mod => {
            if v0 == 0 {
                None
            } else {
                Some(v1.wrapping_rem(v0))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Double,
    Negate,
    Square,
}

pub fn unary_op(num: Cell) -> Option<UnaryOp> {
    match num {
        DOUBLE => Some(UnaryOp::Double),
        NEGATE => Some(UnaryOp::Negate),
        SQUARE => Some(UnaryOp::Square),
        _ => None,
    }
}

pub fn eval_unary(op: UnaryOp, v0: Cell) -> Cell {
    match op {
        UnaryOp::Double => v0.wrapping_mul(2),
        UnaryOp::Negate => v0.wrapping_neg(),
        UnaryOp::Square => v0.wrapping_mul(v0),
    }
}
