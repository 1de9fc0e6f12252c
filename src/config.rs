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
use crate::bytecode::Cell;

/// Knobs that affect how a `Runtime` behaves, but say nothing about
/// language semantics.  Everything here has a default matching the
/// reference behaviour described by the specification; tests override
/// individual fields (most often `max_stack_depth`) to exercise edge
/// cases without constructing pathologically large programs.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory scanned once at startup for extension libraries.
    pub extension_dir: std::path::PathBuf,
    /// File extension (without the dot) that marks a shared library
    /// as a loadable extension.
    pub extension_suffix: String,
    /// Function numbers below this are built-ins; at or above it they
    /// are looked up in the extension table.
    pub reserved_threshold: Cell,
    /// Upper bound on operand stack depth.
    pub max_stack_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension_dir: std::path::PathBuf::from("."),
            extension_suffix: "dnky".to_string(),
            reserved_threshold: crate::builtin_numbers::RESERVED_THRESHOLD,
            max_stack_depth: Cell::MAX as usize,
        }
    }
}
