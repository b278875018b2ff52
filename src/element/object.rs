//! Variant dispatch: which wrapper a handle becomes.

use std::ops::Deref;

use xedit_core::{Category, ElementType, ValueType, XEditResult};

use super::{ArrayElement, Element, Entry, FlagsElement};
use crate::plugin::Plugin;
use crate::record::Record;

/// A resolved wrapper.
#[derive(Debug, Clone)]
pub enum Object<'s> {
    Plugin(Plugin<'s>),
    Array(ArrayElement<'s>),
    Flags(FlagsElement<'s>),
    /// A main record whose signature has a registered kind.
    Record(Record<'s>),
    /// Everything else, including records of unregistered signatures.
    Generic(Element<'s>),
}

impl<'s> Object<'s> {
    /// Pick the variant for `element` from its descriptor.
    ///
    /// Checked in order: flags, files, groups, arrays, then registered
    /// record kinds. Groups carry the signature of the records they hold
    /// and stay generic.
    pub(crate) fn classify(element: Element<'s>) -> Self {
        let Some(descriptor) = element.descriptor().copied() else {
            return Object::Generic(element);
        };
        if descriptor.is_flags() {
            return Object::Flags(FlagsElement::new(element));
        }
        match descriptor.element_type {
            ElementType::File => return Object::Plugin(Plugin::new(element)),
            ElementType::GroupRecord => return Object::Generic(element),
            _ => {}
        }
        if descriptor.is_array() {
            return Object::Array(ArrayElement::new(element));
        }
        if descriptor.element_type == ElementType::MainRecord
            && let Some(kind) = element.session().record_kind(descriptor.signature)
        {
            return Object::Record(Record::new(element, kind));
        }
        Object::Generic(element)
    }

    pub fn as_element(&self) -> &Element<'s> {
        match self {
            Object::Plugin(plugin) => plugin.as_element(),
            Object::Array(array) => array.as_element(),
            Object::Flags(flags) => flags.as_element(),
            Object::Record(record) => record.as_element(),
            Object::Generic(element) => element,
        }
    }

    pub fn into_element(self) -> Element<'s> {
        match self {
            Object::Plugin(plugin) => plugin.into_element(),
            Object::Array(array) => array.into_element(),
            Object::Flags(flags) => flags.into_element(),
            Object::Record(record) => record.into_element(),
            Object::Generic(element) => element,
        }
    }

    pub fn release(self) -> XEditResult<()> {
        self.into_element().release()
    }

    pub fn delete(self) -> XEditResult<()> {
        self.into_element().delete()
    }

    /// Variant name, for diagnostics.
    pub fn variant(&self) -> &'static str {
        match self {
            Object::Plugin(_) => "plugin",
            Object::Array(_) => "array",
            Object::Flags(_) => "flags",
            Object::Record(_) => "record",
            Object::Generic(_) => "generic",
        }
    }

    pub fn as_plugin(&self) -> Option<&Plugin<'s>> {
        match self {
            Object::Plugin(plugin) => Some(plugin),
            _ => None,
        }
    }

    pub fn into_plugin(self) -> Option<Plugin<'s>> {
        match self {
            Object::Plugin(plugin) => Some(plugin),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayElement<'s>> {
        match self {
            Object::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayElement<'s>> {
        match self {
            Object::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&FlagsElement<'s>> {
        match self {
            Object::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    pub fn into_flags(self) -> Option<FlagsElement<'s>> {
        match self {
            Object::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record<'s>> {
        match self {
            Object::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record<'s>> {
        match self {
            Object::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Turn a freshly looked-up wrapper into what `get` reports.
    ///
    /// Leaves are read and their handle released; references are followed
    /// to their target and the field's handle released.
    pub(crate) fn into_entry(self) -> XEditResult<Entry<'s>> {
        let Some(descriptor) = self.descriptor().copied() else {
            return Ok(Entry::Object(self));
        };
        if matches!(self, Object::Flags(_)) {
            return Ok(Entry::Object(self));
        }
        let leaf = descriptor.value_type == ValueType::Color || descriptor.element_type == ElementType::Flag;
        match descriptor.category() {
            Category::Reference => {
                let target = self.links_to("");
                let released = self.release();
                let target = target?;
                released?;
                Ok(Entry::Reference(target))
            }
            Category::Value => self.into_value_entry(),
            Category::Container if leaf => self.into_value_entry(),
            Category::Container => Ok(Entry::Object(self)),
        }
    }

    fn into_value_entry(self) -> XEditResult<Entry<'s>> {
        let value = self.read_value();
        let released = self.release();
        let value = value?;
        released?;
        Ok(Entry::Value(value))
    }
}

impl<'s> Deref for Object<'s> {
    type Target = Element<'s>;

    fn deref(&self) -> &Self::Target {
        self.as_element()
    }
}

impl<'s> From<Object<'s>> for Element<'s> {
    fn from(object: Object<'s>) -> Self {
        object.into_element()
    }
}
