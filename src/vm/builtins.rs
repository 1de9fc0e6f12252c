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
//! The reserved built-in catalogue (function numbers 0..14).  Each
//! entry has the same shape a registered extension callable does —
//! manipulate the stack through the runtime's own primitives, set an
//! exception string and return failure on a bad precondition — so
//! that `func` dispatch can treat built-ins and extensions
//! identically once the function number has been classified.
use crate::builtin_numbers::*;
use crate::bytecode::Cell;
use crate::vm::Runtime;
use std::io::Write;

/// Run the built-in named by `num` against `rt`.  `Ok(())` on
/// success; `Err(())` means the built-in already called
/// `set_exception` with a descriptive message.
pub fn dispatch(rt: &mut Runtime, num: Cell) -> Result<(), ()> {
    match num {
        INPUT => input(rt),
        OUTPUT => output(rt),
        ADD | SUBTRACT | MULTIPLY | DIVIDE | MOD => binary_arithmetic(rt, num),
        DOUBLE | NEGATE | SQUARE => unary_arithmetic(rt, num),
        CLONE => clone(rt),
        STASH_ADD => stash_add(rt),
        STASH_GET => stash_get(rt),
        STASH_DELETE => stash_delete(rt),
        _ => {
            rt.set_exception(format!("no such built-in function {}", num));
            Err(())
        }
    }
}

fn input(rt: &mut Runtime) -> Result<(), ()> {
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.strip_suffix('\n').unwrap_or(&line);
            let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
            let bytes: Vec<Cell> = trimmed.bytes().map(Cell::from).collect();
            for &b in bytes.iter().rev() {
                rt.push(b).map_err(|e| rt.set_exception(e.message))?;
            }
            rt.push(0).map_err(|e| rt.set_exception(e.message))?;
            Ok(())
        }
        Err(e) => {
            rt.set_exception(format!("i/o error: {}", e));
            Err(())
        }
    }
}

fn output(rt: &mut Runtime) -> Result<(), ()> {
    let value = rt.peek().map_err(|_| rt.set_exception("output requires a value on the stack"))?;
    println!("{}", value);
    std::io::stdout().flush().ok();
    Ok(())
}

fn binary_arithmetic(rt: &mut Runtime, num: Cell) -> Result<(), ()> {
    if rt.stack_size() < 2 {
        rt.set_exception(format!("{} requires two values on the stack", builtin_name(num)));
        return Err(());
    }
    let v0 = rt.pop().unwrap();
    let v1 = rt.pop().unwrap();
    let op = binary_op(num).expect("dispatch only routes arithmetic numbers here");
    match eval_binary(op, v1, v0) {
        Some(result) => {
            rt.push(result).map_err(|e| rt.set_exception(e.message))?;
            Ok(())
        }
        None => {
            rt.set_exception(format!("{} by zero", builtin_name(num)));
            Err(())
        }
    }
}

fn unary_arithmetic(rt: &mut Runtime, num: Cell) -> Result<(), ()> {
    if rt.stack_size() < 1 {
        rt.set_exception(format!("{} requires one value on the stack", builtin_name(num)));
        return Err(());
    }
    let v0 = rt.pop().unwrap();
    let op = unary_op(num).expect("dispatch only routes arithmetic numbers here");
    rt.push(eval_unary(op, v0)).map_err(|e| rt.set_exception(e.message))
}

fn clone(rt: &mut Runtime) -> Result<(), ()> {
    let v0 = rt.peek().map_err(|_| rt.set_exception("clone requires a value on the stack"))?;
    rt.push(v0).map_err(|e| rt.set_exception(e.message))
}

fn stash_add(rt: &mut Runtime) -> Result<(), ()> {
    if rt.stack_size() < 2 {
        rt.set_exception("stash_add requires a key and a value on the stack");
        return Err(());
    }
    let value = rt.pop().unwrap();
    let key = rt.pop().unwrap();
    rt.stash_insert(key, value);
    rt.push(value).map_err(|e| rt.set_exception(e.message))
}

fn stash_get(rt: &mut Runtime) -> Result<(), ()> {
    let key = rt.pop().map_err(|_| rt.set_exception("stash_get requires a key on the stack"))?;
    match rt.stash_get(key) {
        Some(value) => rt.push(value).map_err(|e| rt.set_exception(e.message)),
        None => {
            rt.set_exception(format!("no value stashed under key {}", key));
            Err(())
        }
    }
}

fn stash_delete(rt: &mut Runtime) -> Result<(), ()> {
    let key = rt.pop().map_err(|_| rt.set_exception("stash_delete requires a key on the stack"))?;
    if rt.stash_remove(key) {
        Ok(())
    } else {
        rt.set_exception(format!("no value stashed under key {}", key));
        Err(())
    }
}

fn builtin_name(num: Cell) -> &'static str {
    match num {
        ADD => "add",
        SUBTRACT => "subtract",
        MULTIPLY => "multiply",
        DIVIDE => "divide",
        MOD => "mod",
        DOUBLE => "double",
        NEGATE => "negate",
        SQUARE => "square",
        _ => "built-in",
    }
}
