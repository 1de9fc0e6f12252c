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
//! Loading native extension libraries, and the C-ABI boundary they
//! use to talk back to the runtime.  This is the one place in the
//! crate where `unsafe` is load-bearing: everything past the dynamic
//! symbol lookup is, by construction, trusting a foreign library to
//! honour the calling convention it advertised.
use crate::config::Config;
use crate::vm::Runtime;
use libloading::{Library, Symbol};
use std::ffi::c_int;
use std::path::Path;

/// Signature every extension's `<name>_register` entry point must
/// have, and the signature every function it registers must have.
pub type ExternFn = unsafe extern "C" fn(*mut Runtime) -> c_int;

pub const SHREK_OK: c_int = 0;
pub const SHREK_ERROR: c_int = 1;

/// Scan `config.extension_dir` once for shared libraries whose
/// filename ends in `.{config.extension_suffix}`, load each, and
/// invoke its `_register` entry point.  Libraries that load but fail
/// to register are dropped with a warning logged; the libraries
/// themselves are handed back so the caller can keep them alive for
/// as long as the runtime might call into them.
pub fn load_extensions(rt: &mut Runtime, config: &Config) -> std::io::Result<Vec<Library>> {
    let mut loaded = Vec::new();
    let entries = match std::fs::read_dir(&config.extension_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(loaded),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(config.extension_suffix.as_str()) {
            continue;
        }
        match load_one(rt, &path) {
            Ok(lib) => loaded.push(lib),
            Err(message) => log::warn!("extension {} not loaded: {}", path.display(), message),
        }
    }
    Ok(loaded)
}

fn load_one(rt: &mut Runtime, path: &Path) -> Result<Library, String> {
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or("non-UTF8 filename")?;
    let symbol_name = format!("{}_register\0", stem);
    // SAFETY: the caller is trusting `path` to be a well-formed shared
    // library implementing the extension ABI documented in the crate
    // root; this is the designed trust boundary of the extension
    // mechanism, not an accident.
    unsafe {
        let lib = Library::new(path).map_err(|e| e.to_string())?;
        let register: Symbol<unsafe extern "C" fn(*mut Runtime) -> c_int> =
            lib.get(symbol_name.as_bytes()).map_err(|e| e.to_string())?;
        let rc = register(rt as *mut Runtime);
        if rc != SHREK_OK {
            return Err(format!("registration entry point returned {}", rc));
        }
        log::info!("loaded extension {}", path.display());
        Ok(lib)
    }
}

// =================================================================
// C-ABI boundary exposed to extensions
// =================================================================

/// # Safety
/// `handle` must be a live `*mut Runtime` obtained from the argument
/// an extension's `_register` function (or a registered callable) was
/// itself invoked with.
#[no_mangle]
pub unsafe extern "C" fn shrek_push(handle: *mut Runtime, value: c_int) -> c_int {
    if handle.is_null() {
        return SHREK_ERROR;
    }
    match (*handle).push(value) {
        Ok(()) => SHREK_OK,
        Err(_) => SHREK_ERROR,
    }
}

/// # Safety
/// See [`shrek_push`].
#[no_mangle]
pub unsafe extern "C" fn shrek_pop(handle: *mut Runtime, out_value: *mut c_int) -> c_int {
    if handle.is_null() || out_value.is_null() {
        return SHREK_ERROR;
    }
    match (*handle).pop() {
        Ok(value) => {
            *out_value = value;
            SHREK_OK
        }
        Err(_) => SHREK_ERROR,
    }
}

/// # Safety
/// See [`shrek_push`].
#[no_mangle]
pub unsafe extern "C" fn shrek_peek(handle: *mut Runtime, out_value: *mut c_int) -> c_int {
    if handle.is_null() || out_value.is_null() {
        return SHREK_ERROR;
    }
    match (*handle).peek() {
        Ok(value) => {
            *out_value = value;
            SHREK_OK
        }
        Err(_) => SHREK_ERROR,
    }
}

/// # Safety
/// See [`shrek_push`].
#[no_mangle]
pub unsafe extern "C" fn shrek_stack_size(handle: *mut Runtime) -> c_int {
    if handle.is_null() {
        return -1;
    }
    (*handle).stack_size() as c_int
}

/// # Safety
/// See [`shrek_push`].
#[no_mangle]
pub unsafe extern "C" fn shrek_register_func(
    handle: *mut Runtime,
    func_number: c_int,
    func: ExternFn,
) -> c_int {
    if handle.is_null() {
        return SHREK_ERROR;
    }
    if (*handle).register_function(func_number, func) {
        SHREK_OK
    } else {
        SHREK_ERROR
    }
}

/// # Safety
/// `errmsg` must be a valid, nul-terminated C string (or null, which
/// is treated as clearing the exception text). See also [`shrek_push`].
#[no_mangle]
pub unsafe extern "C" fn shrek_set_except(handle: *mut Runtime, errmsg: *const std::ffi::c_char) {
    if handle.is_null() {
        return;
    }
    let message = if errmsg.is_null() {
        String::new()
    } else {
        std::ffi::CStr::from_ptr(errmsg).to_string_lossy().into_owned()
    };
    (*handle).set_exception(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;

    fn rt() -> Runtime {
        Runtime::new(Vec::new(), Config::default())
    }

    #[test]
    fn test_missing_extension_dir_is_not_an_error() {
        let mut config = Config::default();
        config.extension_dir = "/no/such/directory/ever".into();
        let mut runtime = rt();
        let loaded = load_extensions(&mut runtime, &config).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_files_with_the_wrong_suffix_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("not_an_extension.txt")).unwrap();
        writeln!(file, "not a shared library").unwrap();

        let mut config = Config::default();
        config.extension_dir = dir.path().to_path_buf();
        config.extension_suffix = "dnky".to_string();

        let mut runtime = rt();
        let loaded = load_extensions(&mut runtime, &config).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_malformed_extension_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("broken.dnky")).unwrap();
        writeln!(file, "not actually a shared library").unwrap();

        let mut config = Config::default();
        config.extension_dir = dir.path().to_path_buf();

        let mut runtime = rt();
        // A file matching the suffix but not a loadable library must
        // not turn into an `Err`; it's logged and skipped.
        let loaded = load_extensions(&mut runtime, &config).unwrap();
        assert!(loaded.is_empty());
    }
}
