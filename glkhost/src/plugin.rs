/*

Interpreter plugins
===================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

//! Dynamically loaded interpreter modules. A plugin exports a required
//! `glk_main` entry point and an optional `glkunix_startup_code`, both
//! invoked on the worker thread.

use std::ffi::{c_char, c_int, CString};
use std::path::Path;

use libloading::Library;
use thiserror::Error;

type StartupFn = unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;
type MainFn = unsafe extern "C" fn();

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("argument contains an interior nul byte")]
    BadArgument,
    #[error("failed to load plugin: {0}")]
    Load(#[source] libloading::Error),
    #[error("plugin does not export {0}")]
    MissingSymbol(&'static str),
}

pub struct GlkPlugin {
    lib: Library,
}

impl GlkPlugin {
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        // Safety: loading runs the module's initialisers; the caller vouches
        // for the plugin binary
        let lib = unsafe { Library::new(path) }.map_err(PluginError::Load)?;
        Ok(GlkPlugin {lib})
    }

    /** Confirm the required entry point exists, without calling it */
    pub fn check_entry(&self) -> Result<(), PluginError> {
        unsafe { self.lib.get::<MainFn>(b"glk_main\0") }
            .map(|_| ())
            .map_err(|_| PluginError::MissingSymbol("glk_main"))
    }

    /** Run the optional startup hook. Returns false if the plugin asked
        not to proceed to `glk_main`. */
    pub fn startup_code(&self, args: &[String]) -> Result<bool, PluginError> {
        let startup = match unsafe { self.lib.get::<StartupFn>(b"glkunix_startup_code\0") } {
            Ok(sym) => sym,
            // The hook is optional
            Err(_) => return Ok(true),
        };
        let owned: Vec<CString> = args.iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<_, _>>()
            .map_err(|_| PluginError::BadArgument)?;
        let mut argv: Vec<*mut c_char> = owned.iter()
            .map(|arg| arg.as_ptr() as *mut c_char)
            .collect();
        argv.push(std::ptr::null_mut());
        // Safety: argv outlives the call and is null-terminated, matching
        // the glkunix convention
        let proceed = unsafe { startup(owned.len() as c_int, argv.as_mut_ptr()) };
        Ok(proceed != 0)
    }

    /** Run the interpreter's main entry point to completion */
    pub fn glk_main(&self) -> Result<(), PluginError> {
        let main = unsafe { self.lib.get::<MainFn>(b"glk_main\0") }
            .map_err(|_| PluginError::MissingSymbol("glk_main"))?;
        unsafe { main() };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_a_missing_file_fails() {
        let result = GlkPlugin::load(Path::new("/nonexistent/interp.so"));
        assert!(matches!(result, Err(PluginError::Load(_))));
    }
}
