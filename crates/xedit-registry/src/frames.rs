//! The management frame stack.
//!
//! Frames nest strictly LIFO. The bottom frame belongs to the session and
//! is never popped; everything tracked outside an explicit scope lands
//! there. Each handle is owned by exactly one frame at a time.
//!
//! # Leases
//!
//! The engine recycles handle numbers, so a bare number cannot tell a live
//! handle from a released one that has been handed out again. Every
//! [`track`](HandleRegistry::track) issues a fresh [`Lease`]; wrappers hold
//! a [`HandleRef`] and [`validate`](HandleRegistry::validate) rejects any
//! reference whose lease is no longer the current one for that number.
//!
//! # Releasing
//!
//! Native release goes through [`HandleReleaser`], implemented by whatever
//! owns the bridge. Frame teardown keeps going past individual failures and
//! logs each one as a [`ResourceLeak`].

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use xedit_core::{FrameId, Handle, HandleRef, Lease, ResourceLeak, XEditError, XEditResult};

/// Performs the native release of a handle.
pub trait HandleReleaser {
    fn release_handle(&mut self, handle: Handle) -> XEditResult<()>;
}

impl<F> HandleReleaser for F
where
    F: FnMut(Handle) -> XEditResult<()>,
{
    fn release_handle(&mut self, handle: Handle) -> XEditResult<()> {
        self(handle)
    }
}

#[derive(Debug, Clone, Copy)]
struct Ownership {
    frame: FrameId,
    lease: Lease,
}

#[derive(Debug)]
struct Frame {
    id: FrameId,
    /// In tracking order.
    handles: Vec<Handle>,
}

impl Frame {
    fn new(id: FrameId) -> Self {
        Self {
            id,
            handles: Vec::new(),
        }
    }

    fn remove(&mut self, handle: Handle) {
        if let Some(pos) = self.handles.iter().position(|&h| h == handle) {
            self.handles.remove(pos);
        }
    }
}

/// Outcome of tearing down one or more frames.
#[derive(Debug, Default)]
pub struct ScopeReport {
    /// Handles the engine released.
    pub released: usize,
    /// Handles the engine refused to release.
    pub leaks: Vec<ResourceLeak>,
}

impl ScopeReport {
    pub fn is_clean(&self) -> bool {
        self.leaks.is_empty()
    }

    fn merge(&mut self, other: ScopeReport) {
        self.released += other.released;
        self.leaks.extend(other.leaks);
    }
}

pub struct HandleRegistry {
    /// `frames[0]` is the session frame.
    frames: Vec<Frame>,
    owners: FxHashMap<Handle, Ownership>,
    next_frame: u64,
    next_lease: u64,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameId(0))],
            owners: FxHashMap::default(),
            next_frame: 1,
            next_lease: 1,
        }
    }

    /// Number of frames, the session frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> FrameId {
        self.frames.last().map_or(FrameId(0), |f| f.id)
    }

    /// Handles tracked across all frames.
    pub fn tracked(&self) -> usize {
        self.owners.len()
    }

    /// Frame currently owning `handle`.
    pub fn owner(&self, handle: Handle) -> Option<FrameId> {
        self.owners.get(&handle).map(|o| o.frame)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    pub fn enter_scope(&mut self) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.frames.push(Frame::new(id));
        debug!(frame = %id, depth = self.frames.len(), "entered scope");
        id
    }

    /// Pop the innermost frame and release everything it still owns.
    ///
    /// Release failures are logged and collected in the report; the rest
    /// of the frame is still released.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn exit_scope(&mut self, releaser: &mut dyn HandleReleaser) -> XEditResult<ScopeReport> {
        if self.frames.len() <= 1 {
            return Err(XEditError::NoActiveScope);
        }
        let Some(frame) = self.frames.pop() else {
            return Err(XEditError::NoActiveScope);
        };
        let report = self.release_frame(frame, releaser);
        debug!(
            frame = %self.current_frame(),
            released = report.released,
            leaked = report.leaks.len(),
            "exited scope"
        );
        Ok(report)
    }

    fn release_frame(&mut self, frame: Frame, releaser: &mut dyn HandleReleaser) -> ScopeReport {
        let mut report = ScopeReport::default();
        for handle in frame.handles {
            self.owners.remove(&handle);
            match releaser.release_handle(handle) {
                Ok(()) => report.released += 1,
                Err(cause) => {
                    let leak = ResourceLeak {
                        frame: frame.id,
                        handle,
                        cause,
                    };
                    warn!(%leak, "handle leaked on scope exit");
                    report.leaks.push(leak);
                }
            }
        }
        report
    }

    /// Release every frame, the session frame included. The session frame
    /// stays in place, empty.
    pub fn release_all(&mut self, releaser: &mut dyn HandleReleaser) -> ScopeReport {
        let mut report = ScopeReport::default();
        while self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                report.merge(self.release_frame(frame, releaser));
            }
        }
        if let Some(session) = self.frames.first_mut() {
            let id = session.id;
            let frame = std::mem::replace(session, Frame::new(id));
            report.merge(self.release_frame(frame, releaser));
        }
        debug!(released = report.released, leaked = report.leaks.len(), "released all frames");
        report
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    /// Register `handle` under the current frame.
    ///
    /// Tracking a handle that is already owned returns its existing
    /// reference and leaves ownership unchanged. The root handle is never
    /// tracked.
    pub fn track(&mut self, handle: Handle) -> HandleRef {
        if handle.is_root() {
            return HandleRef::ROOT;
        }
        if let Some(owner) = self.owners.get(&handle) {
            return HandleRef::new(handle, owner.lease);
        }
        let lease = Lease(self.next_lease);
        self.next_lease += 1;
        let frame = self.current_frame();
        if let Some(current) = self.frames.last_mut() {
            current.handles.push(handle);
        }
        self.owners.insert(handle, Ownership { frame, lease });
        HandleRef::new(handle, lease)
    }

    /// Release `handle` now. Returns `false` without a native call if the
    /// registry does not own it.
    pub fn release(&mut self, handle: Handle, releaser: &mut dyn HandleReleaser) -> XEditResult<bool> {
        let Some(owner) = self.owners.remove(&handle) else {
            debug!(%handle, "release of untracked handle ignored");
            return Ok(false);
        };
        if let Some(frame) = self.frames.iter_mut().find(|f| f.id == owner.frame) {
            frame.remove(handle);
        }
        releaser.release_handle(handle)?;
        Ok(true)
    }

    /// Release `href` only if its lease is still current.
    pub fn release_ref(&mut self, href: HandleRef, releaser: &mut dyn HandleReleaser) -> XEditResult<bool> {
        if !self.is_live(href) || href.handle.is_root() {
            debug!(handle = %href.handle, "release of stale reference ignored");
            return Ok(false);
        }
        self.release(href.handle, releaser)
    }

    /// Move `handle` to the frame enclosing its owner.
    pub fn promote(&mut self, handle: Handle) -> XEditResult<FrameId> {
        let owner = self.ownership(handle)?;
        let index = self.frame_index(owner.frame).unwrap_or(0);
        if index == 0 {
            warn!(%handle, frame = %owner.frame, "promotion without an enclosing frame");
            return Err(XEditError::NoEnclosingFrame { handle });
        }
        let target = self.frames[index - 1].id;
        self.move_to(handle, owner, target);
        Ok(target)
    }

    /// Move `handle` to `target`, which must enclose its current owner.
    pub fn promote_to(&mut self, handle: Handle, target: FrameId) -> XEditResult<FrameId> {
        let owner = self.ownership(handle)?;
        match (self.frame_index(owner.frame), self.frame_index(target)) {
            (Some(from), Some(to)) if to < from => {
                self.move_to(handle, owner, target);
                Ok(target)
            }
            _ => {
                warn!(%handle, from = %owner.frame, to = %target, "promotion target does not enclose owner");
                Err(XEditError::NoEnclosingFrame { handle })
            }
        }
    }

    fn ownership(&self, handle: Handle) -> XEditResult<Ownership> {
        self.owners
            .get(&handle)
            .copied()
            .ok_or(XEditError::InvalidHandleUse { handle })
    }

    fn frame_index(&self, id: FrameId) -> Option<usize> {
        self.frames.iter().position(|f| f.id == id)
    }

    fn move_to(&mut self, handle: Handle, owner: Ownership, target: FrameId) {
        if let Some(frame) = self.frames.iter_mut().find(|f| f.id == owner.frame) {
            frame.remove(handle);
        }
        if let Some(frame) = self.frames.iter_mut().find(|f| f.id == target) {
            frame.handles.push(handle);
        }
        self.owners.insert(
            handle,
            Ownership {
                frame: target,
                lease: owner.lease,
            },
        );
    }

    // ========================================================================
    // Validation
    // ========================================================================

    pub fn is_live(&self, href: HandleRef) -> bool {
        href.handle.is_root() || self.owners.get(&href.handle).is_some_and(|o| o.lease == href.lease)
    }

    /// The raw handle behind `href`, if its lease is still current.
    pub fn validate(&self, href: HandleRef) -> XEditResult<Handle> {
        if self.is_live(href) {
            Ok(href.handle)
        } else {
            Err(XEditError::InvalidHandleUse { handle: href.handle })
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn dump(&self) -> HandleDump {
        HandleDump {
            frames: self
                .frames
                .iter()
                .enumerate()
                .map(|(depth, f)| FrameDump {
                    id: f.id,
                    depth,
                    handles: f.handles.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("depth", &self.frames.len())
            .field("tracked", &self.owners.len())
            .finish()
    }
}

/// Snapshot of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDump {
    pub id: FrameId,
    pub depth: usize,
    pub handles: Vec<Handle>,
}

/// Snapshot of the whole frame stack, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleDump {
    pub frames: Vec<FrameDump>,
}

impl HandleDump {
    pub fn total(&self) -> usize {
        self.frames.iter().map(|f| f.handles.len()).sum()
    }
}

impl fmt::Display for HandleDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} frames, {} live handles", self.frames.len(), self.total())?;
        for frame in &self.frames {
            write!(f, "  [{}] {}: {} handles", frame.depth, frame.id, frame.handles.len())?;
            if !frame.handles.is_empty() {
                let list: Vec<String> = frame.handles.iter().map(Handle::to_string).collect();
                write!(f, " ({})", list.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
