//! Dynamic loading of XEditLib with libloading.

use std::path::Path;

use libloading::{Library, Symbol};
use tracing::{debug, warn};
use xedit_core::{XEditError, XEditResult};

use crate::arg::{NativeArg, NativeReturn};
use crate::bridge::NativeApi;
use crate::catalog::{NativeFn, RawSymbol, dispatch};

/// Default file name of the engine library.
pub const DEFAULT_LIBRARY: &str = "XEditLib.dll";

/// The engine library with every catalog symbol resolved up front.
///
/// Symbols the library does not export are logged at load time; calling
/// one fails with [`XEditError::MissingSymbol`].
pub struct DynamicLibrary {
    symbols: Vec<Option<RawSymbol>>,
    /// Kept alive for as long as `symbols` may be called.
    _library: Library,
}

impl DynamicLibrary {
    /// Load the library at `path` and resolve the catalog.
    ///
    /// # Safety
    ///
    /// Loading runs the library's initialisers. The library must be a
    /// build of XEditLib whose exports match the catalog declarations.
    pub unsafe fn load(path: impl AsRef<Path>) -> XEditResult<Self> {
        let path = path.as_ref();

        // SAFETY: caller vouches for the library.
        let library = unsafe { Library::new(path) }.map_err(|e| XEditError::Library {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut missing = 0usize;
        let symbols = NativeFn::ALL
            .iter()
            .map(|func| {
                // SAFETY: the symbol is only ever called through `dispatch`
                // with the catalog's declared signature.
                let symbol: Result<Symbol<RawSymbol>, _> = unsafe { library.get(&func.symbol_name()) };
                match symbol {
                    Ok(symbol) => Some(*symbol),
                    Err(e) => {
                        warn!(symbol = func.name(), error = %e, "native symbol not exported");
                        missing += 1;
                        None
                    }
                }
            })
            .collect();

        debug!(
            path = %path.display(),
            resolved = NativeFn::ALL.len() - missing,
            missing,
            "loaded engine library"
        );

        Ok(Self {
            symbols,
            _library: library,
        })
    }

    /// Whether `func` was exported by the loaded library.
    pub fn has_symbol(&self, func: NativeFn) -> bool {
        self.symbols.get(func as usize).is_some_and(Option::is_some)
    }
}

impl NativeApi for DynamicLibrary {
    fn call(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn> {
        let symbol = self
            .symbols
            .get(func as usize)
            .copied()
            .flatten()
            .ok_or(XEditError::MissingSymbol(func.name()))?;
        // SAFETY: `symbol` was resolved under `func`'s exported name and the
        // bridge validated argument shapes and buffer lengths.
        unsafe { dispatch(func, symbol, args) }.ok_or_else(|| XEditError::ArgumentMismatch {
            operation: func.name(),
            detail: "argument slots do not match the native signature".to_string(),
        })
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("resolved", &self.symbols.iter().filter(|s| s.is_some()).count())
            .field("catalog", &self.symbols.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_error() {
        let err = unsafe { DynamicLibrary::load("definitely-not-here/XEditLib.dll") }.unwrap_err();
        assert!(matches!(err, XEditError::Library { .. }));
    }
}
