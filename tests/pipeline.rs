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
//! End-to-end tests driving the full parse/lower/optimise/execute
//! pipeline through `shrek_lang::run`, the same entry point the CLI
//! binary uses.
use shrek_lang::{Cell, Config};

fn run(source: &str) -> Cell {
    shrek_lang::run(source, Config::default()).expect("program should run to completion")
}

#[test]
fn test_empty_program_exits_zero() {
    assert_eq!(run(""), 0);
}

#[test]
fn test_constant_expression_leaves_value_on_stack() {
    // 7 + 5 == 12
    assert_eq!(run("SRRRRRRR SRRRRR SRR E"), 12);
}

#[test]
fn test_optimized_and_unoptimized_execution_agree() {
    let source = "SRRRRRRR SRRRRR SRR E SRRR SRR E";
    let nodes = shrek_lang::Parser::new(source).unwrap().parse().unwrap();
    let raw = shrek_lang::Lowerer::new().lower(&nodes).unwrap();
    let optimized = shrek_lang::optimize(&raw);

    let mut unoptimized_rt = shrek_lang::Runtime::new(raw, Config::default());
    let mut optimized_rt = shrek_lang::Runtime::new(optimized, Config::default());
    assert_eq!(unoptimized_rt.run().unwrap(), optimized_rt.run().unwrap());
}

#[test]
fn test_unconditional_jump_skips_code() {
    let source = "S K!END! SRRRRRRRRR !END! SRR";
    assert_eq!(run(source), 2);
}

#[test]
fn test_jump_if_zero_not_taken_leaves_condition() {
    let source = "SRRRRR SR K!END! !END!";
    assert_eq!(run(source), 5);
}

#[test]
fn test_division_by_zero_is_a_runtime_error() {
    let source = "SRRRRR S SRRRRR E"; // push 5, push 0, push DIVIDE(5), func
    let err = shrek_lang::run(source, Config::default()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_syntax_error_on_unlabelled_jump() {
    let err = shrek_lang::run("K", Config::default()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_duplicate_label_is_a_lowering_error() {
    let err = shrek_lang::run("!AA! S !AA!", Config::default()).unwrap_err();
    assert!(matches!(err, shrek_lang::Error::Lower(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_clone_then_add_doubles_the_top() {
    // push 9, call clone(10) -> [9, 9], call add(2) -> [18]
    let source = "SRRRRRRRRR SRRRRRRRRRR E SRR E";
    assert_eq!(run(source), 18);
}

#[test]
fn test_comments_do_not_affect_execution() {
    let source = "SRRR # this pushes three\nR";
    assert_eq!(run(source), 4);
}
