//! Core types shared by every layer of the xEdit wrapper.
//!
//! - [`Handle`], [`HandleRef`], [`Lease`], [`FrameId`]: identities for engine nodes and frames
//! - [`Signature`]: 4-character record tags
//! - [`ElementDescriptor`] and the native enums it is built from
//! - [`GameMode`], [`LoaderState`]
//! - [`XEditError`] and [`ResourceLeak`]

pub mod descriptor;
pub mod error;
pub mod game;
pub mod handle;
pub mod signature;
pub mod value;

pub use descriptor::{
    Category, DefType, ElementDescriptor, ElementFlags, ElementType, SmashType, ValueType,
    decode_enum,
};
pub use error::{NativeCallFailure, ResourceLeak, XEditError, XEditResult};
pub use game::{GameMode, LoaderState};
pub use handle::{FrameId, Handle, HandleRef, Lease};
pub use signature::{Signature, signatures};
pub use value::{Color, bytes_to_hex, form_id_to_string, hex_to_bytes};
