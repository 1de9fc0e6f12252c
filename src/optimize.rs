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
//! Peephole constant folding.  "Dumb but safe": every pass here only
//! ever replaces a run of instructions with one that provably leaves
//! the stack in the same state, and none of them ever look past a
//! `label`, which is what keeps every other instruction's absolute
//! index (and hence every jump table entry) stable under rewriting.
use crate::builtin_numbers::{binary_op, eval_binary, eval_unary, unary_op};
use crate::bytecode::{Instruction, OpCode, Program};

const MAX_ITERATIONS: usize = 32;

/// Run the full optimizer: easy-constant folding once, then
/// alternating binary/unary arithmetic folding to a fixed point (or
/// until the iteration cap is hit).
pub fn optimize(program: &Program) -> Program {
    let mut result = fold_easy_constants(program);
    log::debug!("easy-constant fold: {} -> {} instructions", program.len(), result.len());
    let mut iterations = 0;
    for pass in 0..MAX_ITERATIONS {
        let (after_unary, unary_changed) = fold_unary_arithmetic(&result);
        let (after_binary, binary_changed) = fold_binary_arithmetic(&after_unary);
        result = after_binary;
        iterations = pass + 1;
        if !unary_changed && !binary_changed {
            break;
        }
    }
    log::info!(
        "optimizer reached fixed point after {} iteration(s), {} instructions remain",
        iterations,
        result.len()
    );
    result
}

/// Replace `push0` followed by zero-or-more consecutive `bump`s with
/// a single `push_const`.  A lone `push0` (no bumps) is left alone,
/// since rewriting it would not shrink anything.
fn fold_easy_constants(program: &Program) -> Program {
    let mut out = Program::with_capacity(program.len());
    let mut i = 0;
    while i < program.len() {
        if program[i].op == OpCode::Push0 {
            let start = program[i];
            let mut j = i + 1;
            while j < program.len() && program[j].op == OpCode::Bump {
                j += 1;
            }
            let bumps = j - (i + 1);
            if bumps > 0 {
                out.push(Instruction::new(OpCode::PushConst, bumps as i32, start.offset));
            } else {
                out.push(start);
            }
            i = j;
        } else {
            out.push(program[i]);
            i += 1;
        }
    }
    out
}

/// Fold `(push_const a)(push_const b)(push_const f)(func)` into a
/// single `push_const` when `f` names a two-operand arithmetic
/// built-in and the fold wouldn't trap (division/modulus by zero).
fn fold_binary_arithmetic(program: &Program) -> (Program, bool) {
    fold_window(program, 4, |w| {
        if !is_const(w[0]) || !is_const(w[1]) || !is_const(w[2]) || w[3].op != OpCode::Func {
            return None;
        }
        let op = binary_op(w[2].a)?;
        let value = eval_binary(op, w[0].a, w[1].a)?;
        Some(Instruction::new(OpCode::PushConst, value, w[0].offset))
    })
}

/// Fold `(push_const a)(push_const f)(func)` into a single
/// `push_const` when `f` names a one-operand arithmetic built-in.
fn fold_unary_arithmetic(program: &Program) -> (Program, bool) {
    fold_window(program, 3, |w| {
        if !is_const(w[0]) || !is_const(w[1]) || w[2].op != OpCode::Func {
            return None;
        }
        let op = unary_op(w[1].a)?;
        Some(Instruction::new(OpCode::PushConst, eval_unary(op, w[0].a), w[0].offset))
    })
}

fn is_const(i: Instruction) -> bool {
    i.op == OpCode::PushConst
}

/// Slide a window of `width` instructions across `program`, replacing
/// it with whatever `fold` returns whenever it matches.  Never slides
/// a window across a `label`: that instruction is always copied
/// through untouched, and scanning resumes immediately after it.
fn fold_window(
    program: &Program,
    width: usize,
    fold: impl Fn(&[Instruction]) -> Option<Instruction>,
) -> (Program, bool) {
    let mut out = Program::with_capacity(program.len());
    let mut changed = false;
    let mut i = 0;
    while i < program.len() {
        if program[i].op == OpCode::Label {
            out.push(program[i]);
            i += 1;
            continue;
        }
        let window_end = i + width;
        let window_has_label = program[i..program.len().min(window_end)]
            .iter()
            .any(|insn| insn.op == OpCode::Label);
        if window_end <= program.len() && !window_has_label {
            if let Some(replacement) = fold(&program[i..window_end]) {
                log::trace!("folded instructions {}..{} into {:?}", i, window_end, replacement.op);
                out.push(replacement);
                changed = true;
                i = window_end;
                continue;
            }
        }
        out.push(program[i]);
        i += 1;
    }
    (out, changed)
}

// =================================================================
// Tests
// =================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::Lowerer;
    use crate::syntax::Parser;

    fn compile(src: &str) -> Program {
        let nodes = Parser::new(src).unwrap().parse().unwrap();
        Lowerer::new().lower(&nodes).unwrap()
    }

    #[test]
    fn test_easy_constant_fold() {
        let program = optimize(&compile("SRRR"));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].op, OpCode::PushConst);
        assert_eq!(program[0].a, 3);
    }

    #[test]
    fn test_lone_push0_is_preserved() {
        let program = optimize(&compile("S"));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].op, OpCode::Push0);
    }

    #[test]
    fn test_binary_arithmetic_fold() {
        // push 7, push 5, push ADD(2), func -> push_const 12
        let src = "SRRRRRRR SRRRRR SRR E"; // 7 bumps, 5 bumps, 2 bumps (func number)
        let program = optimize(&compile(src));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].op, OpCode::PushConst);
        assert_eq!(program[0].a, 12);
    }

    #[test]
    fn test_unary_arithmetic_fold() {
        // push 4, push DOUBLE(7), func -> push_const 8
        let src = "SRRRR SRRRRRRR E";
        let program = optimize(&compile(src));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].a, 8);
    }

    #[test]
    fn test_division_by_zero_is_not_folded() {
        use crate::builtin_numbers::DIVIDE;
        // push_const 5, push_const 0, push_const DIVIDE, func: built by
        // hand since a lone `push0` (no bumps) never becomes a
        // `push_const`, and we need an actual zero constant here.
        let program: Program = vec![
            Instruction::new(OpCode::PushConst, 5, 0),
            Instruction::new(OpCode::PushConst, 0, 0),
            Instruction::new(OpCode::PushConst, DIVIDE, 0),
            Instruction::new(OpCode::Func, 0, 0),
        ];
        let optimized = optimize(&program);
        assert_eq!(optimized, program);
    }

    #[test]
    fn test_never_folds_across_a_label() {
        let src = "S !AA! R";
        let program = optimize(&compile(src));
        assert!(program.iter().any(|i| i.op == OpCode::Label));
        // The push0 before the label cannot merge with the bump after it.
        assert_eq!(program[0].op, OpCode::Push0);
    }

    #[test]
    fn test_repeated_binary_folds_collapse_fully() {
        // (7 add 5) add 3 -> push_const 15, needs two passes of folding.
        let src = "SRRRRRRR SRRRRR SRR E SRRR SRR E";
        let program = optimize(&compile(src));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].a, 15);
    }

    #[test]
    fn test_optimizing_an_already_optimal_program_is_a_no_op() {
        let program = compile("K!AA! !AA!");
        assert_eq!(optimize(&program), program);
    }
}
