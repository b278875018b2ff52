//! Typed invocations, one per catalog entry.
//!
//! Grouped the way the engine groups its exports. Every method converts
//! host values to their wire form, goes through [`Bridge::invoke`] or the
//! two-call helpers, and decodes the result.
//!
//! Methods returning a [`Handle`](xedit_core::Handle) hand back an
//! untracked handle; registering it is the caller's job.
//!
//! [`Bridge::invoke`]: crate::Bridge::invoke

mod elements;
mod files;
mod masters;
mod meta;
mod records;
mod setup;
mod values;
