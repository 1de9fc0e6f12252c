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
//! A front-to-back pipeline for the shrek language: tokenise, parse,
//! lower to byte-code, optimise, and execute.  The binary crate is a
//! thin CLI wrapper around what's exported here.

/// The generic table-driven character scanner the lexer is built on
/// top of.
pub mod lex;
/// Tokenising shrek source text: commands, `!label!` references, and
/// `#` comments.
pub mod lexer;
/// Turning a lexeme stream into a flat sequence of commands and label
/// definitions.
pub mod syntax;
/// The flat byte-code representation programs are lowered to and
/// executed from.
pub mod bytecode;
/// Assigning dense integer identifiers to labels and emitting
/// byte-code.
pub mod lower;
/// Function numbers and semantics for the reserved built-in catalogue,
/// shared between the optimizer and the VM.
pub mod builtin_numbers;
/// Peephole constant folding over the byte-code.
pub mod optimize;
/// Error types for each stage of the pipeline.
pub mod error;
/// Runtime configuration that doesn't affect language semantics.
pub mod config;
/// The stack machine: execution, dynamic extension loading, and the
/// C-ABI boundary extensions use to call back into it.
pub mod vm;

pub use bytecode::{Cell, Program};
pub use config::Config;
pub use error::{Error, HostError};
pub use lower::Lowerer;
pub use optimize::optimize;
pub use syntax::Parser;
pub use vm::Runtime;

/// Run the full pipeline over `source`: parse, lower, optimise, then
/// execute against a fresh [`Runtime`] built from `config`.  Returns
/// the value the program terminated with, which doubles as its exit
/// code.
pub fn run(source: &str, config: Config) -> Result<Cell, Error> {
    let nodes = Parser::new(source)?.parse()?;
    let program = optimize(&Lowerer::new().lower(&nodes)?);
    let mut runtime = Runtime::new(program, config);
    runtime.load_extensions().map_err(|e| Error::Host(HostError::from(e)))?;
    Ok(runtime.run()?)
}
