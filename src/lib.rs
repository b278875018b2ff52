//! Typed access to the xEdit engine (XEditLib).
//!
//! The engine keeps loaded plugin files as a tree of nodes reached through
//! integer handles it never frees on its own. This crate wraps it in a
//! [`Session`] that tracks every handle in nested frames, and in an object
//! model ([`Element`], [`Object`], [`Plugin`], [`Record`]) that dispatches on
//! each node's runtime descriptor.
//!
//! ```no_run
//! use xedit::{GameMode, Session, SessionConfig};
//!
//! # fn main() -> xedit::XEditResult<()> {
//! let config = SessionConfig::new(GameMode::SkyrimSE).with_load_order(["Skyrim.esm", "Update.esm"]);
//! // SAFETY: XEditLib.dll is the engine build this crate was written against.
//! let session = unsafe { Session::load(config) }?;
//! session.scope(|s| {
//!     let update = s.file_by_name("Update.esm")?;
//!     if let Some(update) = update {
//!         println!("{} records", update.record_count()?);
//!     }
//!     Ok(())
//! })?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
mod config;
pub mod element;
pub mod path;
mod plugin;
mod record;
mod session;
mod worker;

pub use attribute::{Attribute, Storage};
pub use config::{DEFAULT_POLL_INTERVAL, SessionConfig};
pub use element::{ArrayElement, Element, Entry, FlagsElement, Object, Value};
pub use path::{ElementPath, Segment};
pub use plugin::Plugin;
pub use record::{COMMON, HEAD_PART_TYPES, Record, RecordKind};
pub use session::{ScopeGuard, Session};
pub use worker::EngineWorker;

pub use xedit_core::{
    Color, ElementDescriptor, ElementType, GameMode, Handle, LoaderState, NativeCallFailure, ResourceLeak, Signature,
    ValueType, XEditError, XEditResult, signatures,
};
pub use xedit_ffi::{Bridge, NativeApi};
pub use xedit_registry::{HandleDump, ScopeReport};

#[cfg(any(test, feature = "mock"))]
pub use xedit_ffi::MockEngine;

pub mod prelude {
    pub use crate::{
        ArrayElement, Element, Entry, FlagsElement, GameMode, Object, Plugin, Record, RecordKind, Session,
        SessionConfig, Value, XEditError, XEditResult,
    };
}
