//! Bookkeeping that sits between the call bridge and the object model.
//!
//! - [`HandleRegistry`]: the stack of management frames that owns every
//!   handle the engine hands out and releases them on scope exit
//! - [`SubclassRegistry`]: signature to variant dispatch table

pub mod frames;
pub mod subclass;

pub use frames::{FrameDump, HandleDump, HandleRegistry, HandleReleaser, ScopeReport};
pub use subclass::SubclassRegistry;
