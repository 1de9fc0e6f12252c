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
//! The stack machine itself: program counter, operand stack, jump
//! table, function dispatch.  Everything here is owned by exactly one
//! `Runtime` instance; there is no process-wide mutable state left
//! over from older revisions of this kind of interpreter.
pub mod builtins;
pub mod extension;

use crate::bytecode::{Cell, Instruction, OpCode, Program};
use crate::config::Config;
use crate::error::RuntimeError;
use extension::ExternFn;
use libloading::Library;
use std::collections::HashMap;

/// Marks a label identifier with no corresponding `label` instruction
/// in the final byte-code: any `jump` landing here simply runs off
/// the end of the program on the next iteration.
const UNDEFINED_TARGET: usize = usize::MAX;

pub struct Runtime {
    config: Config,
    program: Program,
    jump_table: Vec<Option<usize>>,
    stack: Vec<Cell>,
    pc: usize,
    stash: HashMap<Cell, Cell>,
    functions: HashMap<Cell, ExternFn>,
    exception: String,
    step_hook: Option<Box<dyn FnMut(usize, &[Cell])>>,
    /// Kept alive for as long as the runtime might call back into a
    /// registered extension function.
    extensions: Vec<Library>,
}

impl Runtime {
    pub fn new(program: Program, config: Config) -> Self {
        let jump_table = build_jump_table(&program);
        Self {
            config,
            program,
            jump_table,
            stack: Vec::new(),
            pc: 0,
            stash: HashMap::new(),
            functions: HashMap::new(),
            exception: String::new(),
            step_hook: None,
            extensions: Vec::new(),
        }
    }

    pub fn set_step_hook(&mut self, hook: impl FnMut(usize, &[Cell]) + 'static) {
        self.step_hook = Some(Box::new(hook));
    }

    /// Scan `config.extension_dir` for native libraries and register
    /// whatever they bring.  Must be called before `run` for their
    /// function numbers to be reachable; the libraries stay loaded for
    /// the lifetime of this runtime.
    pub fn load_extensions(&mut self) -> std::io::Result<()> {
        let config = self.config.clone();
        let libs = extension::load_extensions(self, &config)?;
        self.extensions.extend(libs);
        Ok(())
    }

    // =============================================================
    // Primitives extensions and built-ins call through
    // =============================================================

    pub fn push(&mut self, value: Cell) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack_depth {
            return Err(RuntimeError::new("Maximum stack size exceeded"));
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell, RuntimeError> {
        self.stack.pop().ok_or_else(|| RuntimeError::new("Stack is empty"))
    }

    pub fn peek(&self) -> Result<Cell, RuntimeError> {
        self.stack.last().copied().ok_or_else(|| RuntimeError::new("Stack is empty"))
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    pub fn set_exception(&mut self, message: impl Into<String>) {
        self.exception = message.into();
    }

    pub fn register_function(&mut self, number: Cell, func: ExternFn) -> bool {
        if self.functions.contains_key(&number) {
            false
        } else {
            self.functions.insert(number, func);
            true
        }
    }

    pub fn stash_insert(&mut self, key: Cell, value: Cell) {
        self.stash.insert(key, value);
    }

    pub fn stash_get(&self, key: Cell) -> Option<Cell> {
        self.stash.get(&key).copied()
    }

    pub fn stash_remove(&mut self, key: Cell) -> bool {
        self.stash.remove(&key).is_some()
    }

    // =============================================================
    // Execution
    // =============================================================

    /// Drive the fetch-decode-dispatch loop to completion.  Returns
    /// the top of the operand stack at termination, or 0 if it ended
    /// empty — this is also what becomes the process exit code.
    pub fn run(&mut self) -> Result<Cell, RuntimeError> {
        self.pc = 0;
        log::info!("VM starting, {} instructions", self.program.len());
        while self.pc < self.program.len() {
            if let Some(hook) = &mut self.step_hook {
                hook(self.pc, &self.stack);
            }
            let instr = self.program[self.pc];
            log::trace!("pc={} op={:?} stack_depth={}", self.pc, instr.op, self.stack.len());
            match instr.op {
                OpCode::NoOp | OpCode::Label => self.pc += 1,
                OpCode::Push0 => {
                    self.push(0)?;
                    self.pc += 1;
                }
                OpCode::Pop => {
                    self.pop()?;
                    self.pc += 1;
                }
                OpCode::Bump => {
                    match self.stack.last_mut() {
                        Some(top) => *top = top.wrapping_add(1),
                        None => return Err(RuntimeError::new("Stack is empty")),
                    }
                    self.pc += 1;
                }
                OpCode::PushConst => {
                    self.push(instr.a)?;
                    self.pc += 1;
                }
                OpCode::Func => self.dispatch_func()?,
                OpCode::Jump => self.dispatch_jump(instr.a)?,
            }
        }
        let result = self.stack.last().copied().unwrap_or(0);
        log::info!("VM halted, exit value {}", result);
        Ok(result)
    }

    fn dispatch_func(&mut self) -> Result<(), RuntimeError> {
        let n = self.pop()?;
        if n < self.config.reserved_threshold {
            self.exception.clear();
            if builtins::dispatch(self, n).is_err() {
                return Err(self.func_error(n));
            }
        } else {
            match self.functions.get(&n).copied() {
                Some(func) => {
                    self.exception.clear();
                    // SAFETY: `func` was handed to us by a successfully
                    // loaded extension through `register_function`, and
                    // the ABI contract requires it accept a runtime
                    // pointer of exactly this type.
                    let rc = unsafe { func(self as *mut Runtime) };
                    if rc != extension::SHREK_OK {
                        return Err(self.func_error(n));
                    }
                }
                None => {
                    log::error!("function {} not registered", n);
                    return Err(RuntimeError::new(format!("function {} not registered", n)));
                }
            }
        }
        self.pc += 1;
        Ok(())
    }

    fn func_error(&self, n: Cell) -> RuntimeError {
        let message = if self.exception.is_empty() {
            "function did not set an exception message".to_string()
        } else {
            self.exception.clone()
        };
        log::warn!("function {} failed: {}", n, message);
        RuntimeError::new(format!("error running function {}: {}", n, message))
    }

    fn dispatch_jump(&mut self, label_id: Cell) -> Result<(), RuntimeError> {
        const UNCONDITIONAL: Cell = 0;
        const JUMP_IF_ZERO: Cell = 1;
        const JUMP_IF_NEGATIVE: Cell = 2;

        let selector = self.pop()?;
        let should_jump = match selector {
            UNCONDITIONAL => true,
            JUMP_IF_ZERO => self.peek()? == 0,
            JUMP_IF_NEGATIVE => self.peek()? < 0,
            _ => return Err(RuntimeError::new("invalid jump type")),
        };
        if should_jump {
            self.pc = self.resolve(label_id);
        } else {
            self.pc += 1;
        }
        Ok(())
    }

    fn resolve(&self, label_id: Cell) -> usize {
        self.jump_table
            .get(label_id as usize)
            .and_then(|entry| *entry)
            .unwrap_or(UNDEFINED_TARGET)
    }
}

fn build_jump_table(program: &Program) -> Vec<Option<usize>> {
    let size = program
        .iter()
        .filter(|i| i.op == OpCode::Label)
        .map(|i| i.a as usize + 1)
        .max()
        .unwrap_or(0);
    let mut table = vec![None; size];
    for (idx, instr) in program.iter().enumerate() {
        if instr.op == OpCode::Label {
            table[instr.a as usize] = Some(idx + 1);
        }
    }
    table
}

// =================================================================
// Tests
// =================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::Lowerer;
    use crate::optimize::optimize;
    use crate::syntax::Parser;

    fn compile(src: &str) -> Program {
        let nodes = Parser::new(src).unwrap().parse().unwrap();
        optimize(&Lowerer::new().lower(&nodes).unwrap())
    }

    fn run(src: &str) -> (Cell, Vec<Cell>) {
        let mut rt = Runtime::new(compile(src), Config::default());
        let code = rt.run().unwrap();
        (code, rt.stack)
    }

    #[test]
    fn test_empty_program() {
        let (code, stack) = run("");
        assert_eq!(code, 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_constant_push_leaves_it_on_stack() {
        let (code, stack) = run("SRRR");
        assert_eq!(code, 3);
        assert_eq!(stack, vec![3]);
    }

    #[test]
    fn test_pop_requires_nonempty_stack() {
        let mut rt = Runtime::new(compile("H"), Config::default());
        let err = rt.run().unwrap_err();
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn test_unconditional_jump_skips_intervening_code() {
        // push 0 (jump type), jump to !AA!, then garbage that must be
        // skipped, then the label, then a final marker push.
        let src = "S K!AA! SRRRRRRRRR !AA! SRR";
        let (code, _) = run(src);
        assert_eq!(code, 2);
    }

    #[test]
    fn test_jump_if_zero_not_taken_leaves_operand_on_stack() {
        // push condition=5 (non-zero), push jump-type=1, jump: falls
        // through, leaving the condition cell behind.
        let src = "SRRRRR SR K!AA! !AA!";
        let (code, stack) = run(src);
        assert_eq!(code, 5);
        assert_eq!(stack, vec![5]);
    }

    #[test]
    fn test_jump_if_zero_taken() {
        let src = "S SR K!AA! SRR !AA! SRRR";
        let (code, _) = run(src);
        // condition (0) consumed? no - peeked, left on stack, then the
        // skipped SRR never runs, final push leaves 3 on top.
        assert_eq!(code, 3);
    }

    #[test]
    fn test_undefined_jump_target_terminates_cleanly() {
        let (code, _) = run("S K!ZZ!");
        assert_eq!(code, 0);
    }

    #[test]
    fn test_extension_call_via_registered_function() {
        unsafe extern "C" fn push_42(handle: *mut Runtime) -> std::ffi::c_int {
            (*handle).push(42).unwrap();
            extension::SHREK_OK
        }
        // push_const 100, func: number 100 is past the reserved
        // threshold, so this dispatches to the registered extension.
        let program: Program =
            vec![Instruction::new(OpCode::PushConst, 100, 0), Instruction::new(OpCode::Func, 0, 0)];
        let mut rt = Runtime::new(program, Config::default());
        assert!(rt.register_function(100, push_42));
        let code = rt.run().unwrap();
        assert_eq!(code, 42);
    }

    #[test]
    fn test_reregistering_a_function_number_is_refused() {
        unsafe extern "C" fn noop(_: *mut Runtime) -> std::ffi::c_int {
            extension::SHREK_OK
        }
        let mut rt = Runtime::new(Program::new(), Config::default());
        assert!(rt.register_function(300, noop));
        assert!(!rt.register_function(300, noop));
    }

    #[test]
    fn test_stack_cap_is_enforced() {
        let mut config = Config::default();
        config.max_stack_depth = 1;
        let mut rt = Runtime::new(compile("SS"), config);
        let err = rt.run().unwrap_err();
        assert!(err.message.contains("Maximum stack size"));
    }
}
