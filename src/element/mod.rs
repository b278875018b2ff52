//! The generic object model.
//!
//! Every wrapper is an [`Element`]: a [`HandleRef`] into the session's
//! frames plus the descriptor that was current when the handle was
//! obtained. [`Object`] is the resolved variant a lookup returns.
//!
//! Wrappers are plain values. Dropping one releases nothing; the frame
//! that owns its handle does, or an explicit [`Element::release`]. Two
//! wrappers may share a handle, and once either releases it the other
//! fails with [`XEditError::InvalidHandleUse`] instead of addressing a
//! recycled handle.

mod array;
mod flags;
mod object;
mod value;

use std::fmt;

use tracing::warn;
use xedit_core::{
    Category, DefType, ElementDescriptor, ElementType, FrameId, Handle, HandleRef, Signature, SmashType, ValueType,
    XEditError, XEditResult,
};

pub use array::ArrayElement;
pub use flags::FlagsElement;
pub use object::Object;
pub use value::Value;

use crate::path::{ElementPath, Segment};
use crate::plugin::Plugin;
use crate::session::Session;

/// What [`Element::get`] resolves a path to.
#[derive(Debug)]
pub enum Entry<'s> {
    /// A leaf, coerced to its storage kind.
    Value(Value),
    /// A reference field, resolved to its target. `None` for a null link.
    Reference(Option<Object<'s>>),
    /// Anything with structure of its own.
    Object(Object<'s>),
}

impl<'s> Entry<'s> {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Entry::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The wrapper, for containers and non-null references.
    pub fn into_object(self) -> Option<Object<'s>> {
        match self {
            Entry::Object(object) | Entry::Reference(Some(object)) => Some(object),
            _ => None,
        }
    }
}

/// Implements the shared surface of a wrapper holding an `element` field.
macro_rules! element_wrapper {
    ($ty:ident) => {
        impl<'s> std::ops::Deref for $ty<'s> {
            type Target = $crate::element::Element<'s>;

            fn deref(&self) -> &Self::Target {
                &self.element
            }
        }

        impl<'s> $ty<'s> {
            pub fn as_element(&self) -> &$crate::element::Element<'s> {
                &self.element
            }

            pub fn into_element(self) -> $crate::element::Element<'s> {
                self.element
            }

            /// Release the handle now. See [`Element::release`](crate::element::Element::release).
            pub fn release(self) -> xedit_core::XEditResult<()> {
                self.element.release()
            }

            /// Remove the node. See [`Element::delete`](crate::element::Element::delete).
            pub fn delete(self) -> xedit_core::XEditResult<()> {
                self.element.delete()
            }
        }

        impl<'s> From<$ty<'s>> for $crate::element::Element<'s> {
            fn from(wrapper: $ty<'s>) -> Self {
                wrapper.element
            }
        }
    };
}
pub(crate) use element_wrapper;

// ============================================================================
// Element
// ============================================================================

#[derive(Clone)]
pub struct Element<'s> {
    session: &'s Session,
    href: HandleRef,
    /// `None` only for the engine root.
    descriptor: Option<ElementDescriptor>,
}

impl<'s> Element<'s> {
    pub(crate) fn root(session: &'s Session) -> Self {
        Self {
            session,
            href: HandleRef::ROOT,
            descriptor: None,
        }
    }

    pub(crate) fn bound(session: &'s Session, href: HandleRef, descriptor: ElementDescriptor) -> Self {
        Self {
            session,
            href,
            descriptor: Some(descriptor),
        }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn href(&self) -> HandleRef {
        self.href
    }

    /// The raw handle, provided its frame has not released it.
    pub fn handle(&self) -> XEditResult<Handle> {
        self.session.live(self.href)
    }

    pub fn is_root(&self) -> bool {
        self.href.handle.is_root()
    }

    /// Whether the handle is still owned by a frame.
    pub fn is_live(&self) -> bool {
        self.session.live(self.href).is_ok()
    }

    // ========================================================================
    // Descriptor
    // ========================================================================

    /// Descriptor snapshot taken when the handle was obtained.
    pub fn descriptor(&self) -> Option<&ElementDescriptor> {
        self.descriptor.as_ref()
    }

    /// Query the descriptor again after a structural change.
    pub fn refresh(&mut self) -> XEditResult<Option<&ElementDescriptor>> {
        if !self.is_root() {
            let handle = self.handle()?;
            self.descriptor = Some(self.session.bridge().descriptor(handle)?);
        }
        Ok(self.descriptor.as_ref())
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.descriptor.map(|d| d.element_type)
    }

    pub fn def_type(&self) -> Option<DefType> {
        self.descriptor.map(|d| d.def_type)
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.descriptor.map(|d| d.value_type)
    }

    pub fn smash_type(&self) -> Option<SmashType> {
        self.descriptor.map(|d| d.smash_type)
    }

    pub fn category(&self) -> Option<Category> {
        self.descriptor.map(|d| d.category())
    }

    pub fn signature(&self) -> Option<Signature> {
        self.descriptor.and_then(|d| d.signature)
    }

    pub fn can_add(&self) -> bool {
        self.descriptor.is_some_and(|d| d.can_add())
    }

    pub fn is_removable(&self) -> bool {
        self.descriptor.is_some_and(|d| d.is_removable())
    }

    pub fn is_sorted(&self) -> bool {
        self.descriptor.is_some_and(|d| d.is_sorted())
    }

    pub fn is_flags(&self) -> bool {
        self.descriptor.is_some_and(|d| d.is_flags())
    }

    /// Live query: whether the node changed this session.
    pub fn is_modified(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session.bridge().get_is_modified(handle)
    }

    pub fn is_editable(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session.bridge().get_is_editable(handle)
    }

    // ========================================================================
    // Names and paths
    // ========================================================================

    pub fn name(&self) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session.bridge().name(handle)
    }

    pub fn long_name(&self) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session.bridge().long_name(handle)
    }

    pub fn display_name(&self) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session.bridge().display_name(handle)
    }

    /// Short path: groups omitted.
    pub fn path(&self) -> XEditResult<String> {
        self.path_with(true, false)
    }

    /// Full path from the file down.
    pub fn long_path(&self) -> XEditResult<String> {
        self.path_with(false, false)
    }

    /// Path relative to the enclosing record.
    pub fn local_path(&self) -> XEditResult<String> {
        self.path_with(false, true)
    }

    fn path_with(&self, short: bool, local: bool) -> XEditResult<String> {
        if self.is_root() {
            return Ok(String::new());
        }
        let handle = self.handle()?;
        self.session.bridge().path(handle, short, local)
    }

    /// Human name of the signature, e.g. `Armor` for `ARMO`.
    pub fn signature_name(&self) -> XEditResult<Option<String>> {
        let Some(signature) = self.signature() else {
            return Ok(None);
        };
        self.session.bridge().try_name_from_signature(signature.as_str())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn has(&self, path: &str) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session.bridge().has_element(handle, path)
    }

    /// Resolve `path` to a wrapper, `None` if nothing is there.
    pub fn lookup(&self, path: &str) -> XEditResult<Option<Object<'s>>> {
        let handle = self.handle()?;
        let found = self.session.bridge().try_get_element(handle, path)?;
        found.map(|h| self.session.objectify(h)).transpose()
    }

    /// Resolve `path` to a wrapper, failing with
    /// [`XEditError::SchemaMismatch`] if nothing is there.
    pub fn element(&self, path: &str) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        self.lookup(path)?.ok_or_else(|| XEditError::schema(handle, path))
    }

    /// Resolve `path`, coercing leaves to values and links to their target.
    ///
    /// Handles taken only to read a value are released before returning.
    pub fn get(&self, path: &str) -> XEditResult<Option<Entry<'s>>> {
        match self.lookup(path)? {
            Some(object) => object.into_entry().map(Some),
            None => Ok(None),
        }
    }

    /// The raw value at `path`: references as form ids, flags as names.
    pub fn value(&self, path: &str) -> XEditResult<Option<Value>> {
        let Some(object) = self.lookup(path)? else {
            return Ok(None);
        };
        let value = object.read_value();
        object.release()?;
        value.map(Some)
    }

    /// Read this element's own value.
    pub fn read_value(&self) -> XEditResult<Value> {
        let handle = self.handle()?;
        let descriptor = self.require_descriptor("read the value of")?;
        value::read(&mut self.session.bridge(), handle, &descriptor)
    }

    /// The record a reference field at `path` points to.
    pub fn links_to(&self, path: &str) -> XEditResult<Option<Object<'s>>> {
        let handle = self.handle()?;
        let target = self.session.bridge().try_get_links_to(handle, path)?;
        target.map(|h| self.session.objectify(h)).transpose()
    }

    pub fn children(&self) -> XEditResult<Vec<Object<'s>>> {
        let handle = self.handle()?;
        let handles = self.session.bridge().get_elements(handle, "", false, false)?;
        self.session.objectify_all(handles)
    }

    /// Children as plain elements, without variant dispatch.
    pub fn child_elements(&self) -> XEditResult<Vec<Element<'s>>> {
        Ok(self.children()?.into_iter().map(Object::into_element).collect())
    }

    pub fn num_child_elements(&self) -> XEditResult<usize> {
        let handle = self.handle()?;
        let count = self.session.bridge().element_count(handle)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Every node below this one, depth first, parents before children.
    pub fn descendants(&self) -> XEditResult<Vec<Object<'s>>> {
        let mut out = Vec::new();
        let mut stack: Vec<Object<'s>> = self.children()?.into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(next.children()?.into_iter().rev());
            out.push(next);
        }
        Ok(out)
    }

    /// The enclosing node. `None` for files.
    pub fn parent(&self) -> XEditResult<Option<Object<'s>>> {
        if self.is_root() {
            return Ok(None);
        }
        let handle = self.handle()?;
        let parent = self.session.bridge().try_get_container(handle)?;
        parent.map(|h| self.session.objectify(h)).transpose()
    }

    /// The group holding a record's children (cell contents, world children).
    pub fn child_group(&self) -> XEditResult<Option<Object<'s>>> {
        self.lookup("Child Group")
    }

    /// Same engine node, possibly through a different handle.
    pub fn equals(&self, other: &Element<'_>) -> XEditResult<bool> {
        let (a, b) = (self.handle()?, other.handle()?);
        self.session.bridge().element_equals(a, b)
    }

    /// The file this element belongs to.
    pub fn plugin(&self) -> XEditResult<Plugin<'s>> {
        let handle = self.handle()?;
        let file = self.session.bridge().get_element_file(handle)?;
        self.session.plugin(file)
    }

    /// The record this element belongs to.
    pub fn record(&self) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let record = self.session.bridge().get_element_record(handle)?;
        self.session.objectify(record)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Load-order form id.
    pub fn form_id(&self) -> XEditResult<u32> {
        let handle = self.handle()?;
        self.session.bridge().get_form_id(handle, false)
    }

    pub fn form_id_str(&self) -> XEditResult<String> {
        Ok(xedit_core::form_id_to_string(self.form_id()?))
    }

    /// Form id without its load-order byte.
    pub fn local_form_id(&self) -> XEditResult<u32> {
        Ok(self.form_id()? & 0x00FF_FFFF)
    }

    /// Copy this record into `plugin`, as an override or as a new record.
    ///
    /// The plugin must already list the masters the copy needs; see
    /// [`Plugin::add_required_masters`].
    pub fn copy_into(&self, plugin: &Plugin<'_>, as_new: bool) -> XEditResult<Object<'s>> {
        let (source, file) = (self.handle()?, plugin.handle()?);
        let copied = self.session.bridge().copy_element(source, file, as_new)?;
        self.session.objectify(copied)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Create the child at `path`.
    ///
    /// Fails with [`XEditError::InvariantViolation`] when something already
    /// exists there, or when this element does not accept new children.
    pub fn add(&self, path: &str) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let parsed = ElementPath::parse(path);
        let appends = parsed.segments().contains(&Segment::Append);
        if !appends && self.has(path)? {
            return Err(XEditError::invariant(format!(
                "cannot add '{path}' under {}: an element already exists there",
                self.describe()
            )));
        }
        if let Some(Segment::Name(first)) = parsed.first()
            && self.descriptor.is_some_and(|d| !d.can_add())
            && !self.has(first)?
        {
            return Err(XEditError::invariant(format!(
                "{} does not accept new children",
                self.describe()
            )));
        }
        let added = self.session.bridge().add_element(handle, path)?;
        self.session.objectify(added)
    }

    /// Resolve `path`, creating whatever is missing along the way.
    ///
    /// Each missing segment is added under its parent only if that parent's
    /// descriptor allows additions; otherwise this fails with
    /// [`XEditError::SchemaMismatch`]. Nodes created before the failure stay.
    pub fn get_or_add(&self, path: &str) -> XEditResult<Object<'s>> {
        if let Some(found) = self.lookup(path)? {
            return Ok(found);
        }
        let handle = self.handle()?;
        let parsed = ElementPath::parse(path);
        let mut current: Option<Object<'s>> = None;
        for segment in parsed.segments() {
            let text = segment.to_string();
            let next = {
                let base = current.as_ref().map_or(self, |o| o.as_element());
                match base.lookup(&text)? {
                    Some(found) => found,
                    None if base.can_add() => base.add(&text)?,
                    None => return Err(XEditError::schema(handle, path)),
                }
            };
            if let Some(previous) = current.replace(next) {
                previous.release()?;
            }
        }
        current.ok_or_else(|| XEditError::schema(handle, path))
    }

    /// Remove this node from its container and release the handle.
    ///
    /// Fails with [`XEditError::InvariantViolation`] if the engine reports
    /// the node as not removable.
    pub fn delete(self) -> XEditResult<()> {
        let handle = self.handle()?;
        if self.is_root() || !self.session.bridge().get_is_removable(handle)? {
            return Err(XEditError::invariant(format!("{} cannot be removed", self.describe())));
        }
        self.session.bridge().remove_element(handle, "")?;
        self.release()
    }

    /// Remove the child at `path`.
    pub fn remove(&self, path: &str) -> XEditResult<()> {
        self.element(path)?.delete()
    }

    /// Store `value` at `path`, converted to the node's storage kind. An
    /// empty path addresses this element.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> XEditResult<()> {
        let value = value.into();
        if path.is_empty() {
            return self.write_value(value);
        }
        let target = self.element(path)?;
        let written = target.write_value(value);
        let released = target.release();
        written?;
        released
    }

    /// Store `value` on this element.
    pub fn write_value(&self, value: Value) -> XEditResult<()> {
        let handle = self.handle()?;
        let descriptor = self.require_descriptor("set the value of")?;
        if descriptor.category() == Category::Container
            && !matches!(descriptor.value_type, ValueType::Color)
        {
            return Err(XEditError::invariant(format!(
                "cannot set {} '{value}' on {}: it holds no value",
                value.kind(),
                self.describe()
            )));
        }
        value::write(&mut self.session.bridge(), handle, &descriptor, value)
    }

    /// Point the reference field at `path` to `target`.
    pub fn set_link(&self, path: &str, target: &Element<'_>) -> XEditResult<()> {
        let (handle, target) = (self.handle()?, target.handle()?);
        self.session.bridge().set_links_to(handle, path, target)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn to_json(&self) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session.bridge().element_to_json(handle)
    }

    /// Overwrite the subtree at `path` from JSON.
    pub fn from_json(&self, path: &str, json: &str) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session.bridge().element_from_json(handle, path, json)
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Release the handle before its frame does.
    ///
    /// Other wrappers sharing the handle become invalid. Releasing a root
    /// or already released wrapper does nothing.
    pub fn release(self) -> XEditResult<()> {
        self.session.release_ref(self.href).map(|_| ())
    }

    /// Hand the handle to the frame enclosing its owner.
    pub fn promote(&self) -> XEditResult<FrameId> {
        self.session.promote(self)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn require_descriptor(&self, action: &str) -> XEditResult<ElementDescriptor> {
        self.descriptor
            .ok_or_else(|| XEditError::invariant(format!("cannot {action} the engine root")))
    }

    /// Best-effort label for error messages.
    pub(crate) fn describe(&self) -> String {
        if self.is_root() {
            return "the root".to_string();
        }
        match self.long_path() {
            Ok(path) if !path.is_empty() => path,
            Ok(_) => self.href.handle.to_string(),
            Err(e) => {
                warn!(handle = %self.href.handle, error = %e, "could not describe element");
                self.href.handle.to_string()
            }
        }
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Element");
        s.field("handle", &self.href.handle);
        if let Some(d) = &self.descriptor {
            s.field("type", &d.element_type);
            if let Some(signature) = d.signature {
                s.field("signature", &signature.as_str());
            }
        }
        s.finish()
    }
}
