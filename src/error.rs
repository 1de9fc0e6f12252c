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
use crate::lower::LowerError;
use crate::syntax::SyntaxError;
use std::fmt;

/// A failure raised while the VM is running: stack underflow or
/// overflow, a bad jump type, an unregistered function number, or a
/// built-in/extension call that reported failure.  Carries only a
/// message, since by the time one of these is raised the program
/// counter, stack, etc. are all things the caller can already inspect
/// via the runtime handle if it wants more context.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Anything else trapped at the top level: an I/O failure loading the
/// source file or an extension library, a panic caught at the
/// boundary, and so on.
#[derive(Debug)]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> HostError {
        HostError::new(e.to_string())
    }
}

/// The union of everything `run()` can fail with.  The binary matches
/// on this once, at the very top, to pick an exit code and a
/// diagnostic format; nothing below this point ever prints directly.
#[derive(Debug)]
pub enum Error {
    Syntax(SyntaxError),
    Lower(LowerError),
    Runtime(RuntimeError),
    Host(HostError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "syntax error: {}", e),
            Error::Lower(e) => write!(f, "lowering error: {}", e),
            Error::Runtime(e) => write!(f, "runtime error: {}", e),
            Error::Host(e) => write!(f, "unexpected error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Error {
        Error::Syntax(e)
    }
}

impl From<LowerError> for Error {
    fn from(e: LowerError) -> Error {
        Error::Lower(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Error {
        Error::Runtime(e)
    }
}

impl From<HostError> for Error {
    fn from(e: HostError) -> Error {
        Error::Host(e)
    }
}

impl Error {
    /// The process exit code this error should become, per the
    /// three-way split the error-handling design calls for: a bad
    /// program (syntax, lowering, or runtime failure) exits 1, an
    /// environment failure exits 256.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Syntax(_) => 1,
            Error::Lower(_) => 1,
            Error::Runtime(_) => 1,
            Error::Host(_) => 256,
        }
    }
}
