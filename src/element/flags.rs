//! Flag field wrapper: individual bits addressed by name.

use rustc_hash::FxHashMap;
use xedit_core::{XEditError, XEditResult};

use super::{Element, element_wrapper};

/// A bit-flags field, addressed by flag name.
#[derive(Debug, Clone)]
pub struct FlagsElement<'s> {
    element: Element<'s>,
}

element_wrapper!(FlagsElement);

impl<'s> FlagsElement<'s> {
    pub(crate) fn new(element: Element<'s>) -> Self {
        Self { element }
    }

    /// Every flag name the definition declares, in bit order.
    pub fn all_flags(&self) -> XEditResult<Vec<String>> {
        let handle = self.handle()?;
        self.session().bridge().get_all_flags(handle, "")
    }

    pub fn enabled(&self) -> XEditResult<Vec<String>> {
        let handle = self.handle()?;
        self.session().bridge().get_enabled_flags(handle, "")
    }

    pub fn len(&self) -> XEditResult<usize> {
        Ok(self.all_flags()?.len())
    }

    pub fn is_empty(&self) -> XEditResult<bool> {
        Ok(self.all_flags()?.is_empty())
    }

    pub fn get_flag(&self, name: &str) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().get_flag(handle, "", name)
    }

    pub fn set_flag(&self, name: &str, enabled: bool) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().set_flag(handle, "", name, enabled)
    }

    pub fn enable(&self, name: &str) -> XEditResult<()> {
        self.set_flag(name, true)
    }

    pub fn disable(&self, name: &str) -> XEditResult<()> {
        self.set_flag(name, false)
    }

    /// Replace the enabled set. Names are checked against the definition
    /// first, so an unknown name changes nothing.
    pub fn set_enabled<S: AsRef<str>>(&self, names: &[S]) -> XEditResult<()> {
        let handle = self.handle()?;
        let all = self.all_flags()?;
        if let Some(unknown) = names.iter().find(|n| !all.iter().any(|f| f == n.as_ref())) {
            return Err(XEditError::schema(handle, unknown.as_ref()));
        }
        self.session().bridge().set_enabled_flags(handle, "", names)
    }

    /// Every declared flag mapped to whether it is set.
    pub fn to_dict(&self) -> XEditResult<FxHashMap<String, bool>> {
        let enabled = self.enabled()?;
        Ok(self
            .all_flags()?
            .into_iter()
            .map(|name| {
                let on = enabled.contains(&name);
                (name, on)
            })
            .collect())
    }

    /// Apply a name to state map. Declared flags missing from `dict` end up
    /// disabled.
    pub fn from_dict<S: AsRef<str>>(&self, dict: &FxHashMap<S, bool>) -> XEditResult<()> {
        let enabled: Vec<&str> = dict.iter().filter(|(_, on)| **on).map(|(name, _)| name.as_ref()).collect();
        let handle = self.handle()?;
        let all = self.all_flags()?;
        if let Some(unknown) = dict.keys().find(|n| !all.iter().any(|f| f == n.as_ref())) {
            return Err(XEditError::schema(handle, unknown.as_ref()));
        }
        // keep declaration order
        let ordered: Vec<&str> = all.iter().map(String::as_str).filter(|f| enabled.contains(f)).collect();
        self.session().bridge().set_enabled_flags(handle, "", &ordered)
    }
}
