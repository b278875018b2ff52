//! Native side of the xEdit wrapper.
//!
//! - [`catalog`]: one declarative entry per exported function
//! - [`Bridge`]: validated invocation, error translation and the two-call idiom
//! - [`DynamicLibrary`]: the real engine, loaded with `libloading`
//! - `mock`: an in-memory engine for tests (feature `mock`)
//!
//! Typed wrappers for every entry live on [`Bridge`] itself.

pub mod api;
pub mod arg;
pub mod bridge;
pub mod catalog;
pub mod library;
pub mod strings;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use arg::{NativeArg, NativeReturn};
pub use bridge::{Bridge, DynamicResult, NativeApi};
pub use catalog::{CATALOG, FunctionSignature, NativeFn, Param, ParamRule, ReturnRule};
pub use library::{DEFAULT_LIBRARY, DynamicLibrary};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEngine, NodeSpec};
