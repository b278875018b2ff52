//! Opaque engine handles and the host-side bookkeeping identities built on them.
//!
//! The native engine names every node of its tree with a plain `u32`. Those
//! numbers are recycled once released, so the host never treats a bare
//! [`Handle`] as proof of liveness. Every tracked handle is paired with a
//! [`Lease`] issued by the handle registry; a [`HandleRef`] carries both and
//! is what wrapper objects hold on to.

use std::fmt;

/// Opaque engine handle.
///
/// Handle `0` is the engine's root node. It is never released and is never
/// tracked by a frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Handle(pub u32);

impl Handle {
    /// The root of the engine tree.
    pub const ROOT: Handle = Handle(0);

    /// Create a handle from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value passed back across the FFI boundary.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is the root handle.
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Identity of one management frame.
///
/// Frame ids are never reused, so a frame pushed at the same depth as a
/// previously popped one is still distinguishable from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

/// Unique token issued when a handle is tracked.
///
/// Promotion moves a lease between frames without changing it; release
/// retires it for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lease(pub u64);

impl Lease {
    /// Lease carried by the root handle, valid for the whole session.
    pub const PERMANENT: Lease = Lease(0);
}

/// A handle together with the lease under which it was tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleRef {
    pub handle: Handle,
    pub lease: Lease,
}

impl HandleRef {
    /// Reference to the root node.
    pub const ROOT: HandleRef = HandleRef {
        handle: Handle::ROOT,
        lease: Lease::PERMANENT,
    };

    pub fn new(handle: Handle, lease: Lease) -> Self {
        Self { handle, lease }
    }
}

impl fmt::Display for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.handle.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_handle() {
        assert!(Handle::ROOT.is_root());
        assert!(!Handle::new(7).is_root());
        assert_eq!(HandleRef::ROOT.lease, Lease::PERMANENT);
    }

    #[test]
    fn handle_display() {
        assert_eq!(Handle::new(42).to_string(), "#42");
        assert_eq!(format!("{:?}", Handle::new(42)), "Handle(42)");
        assert_eq!(FrameId(3).to_string(), "frame 3");
    }
}
