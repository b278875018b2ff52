//! Array wrapper.
//!
//! Items are located by a value predicate: `subpath` names the field
//! inside an item to compare (empty for the item itself) and `value` is
//! compared against its text. Sorted arrays are kept in key order by the
//! engine; they accept new items anywhere but refuse moves.

use xedit_core::{XEditError, XEditResult};

use super::value::predicate_text;
use super::{Element, Object, Value, element_wrapper};

#[derive(Debug, Clone)]
pub struct ArrayElement<'s> {
    element: Element<'s>,
}

element_wrapper!(ArrayElement);

impl<'s> ArrayElement<'s> {
    pub(crate) fn new(element: Element<'s>) -> Self {
        Self { element }
    }

    pub fn len(&self) -> XEditResult<usize> {
        self.num_child_elements()
    }

    pub fn is_empty(&self) -> XEditResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn items(&self) -> XEditResult<Vec<Object<'s>>> {
        self.children()
    }

    /// Item at `index`. Negative indices count from the end.
    pub fn get_at(&self, index: isize) -> XEditResult<Option<Object<'s>>> {
        let len = self.len()?;
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs()).filter(|&i| i < len)
        };
        match resolved {
            Some(i) => self.lookup(&format!("[{i}]")),
            None => Ok(None),
        }
    }

    /// Append an item built from the array's item definition.
    pub fn add_item(&self) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let item = self.session().bridge().add_array_item(handle, "", "", "")?;
        self.session().objectify(item)
    }

    /// Append an item and set `subpath` inside it to `value`.
    ///
    /// In a sorted array the item lands wherever its key sorts.
    pub fn add_item_with(&self, value: impl Into<Value>, subpath: &str) -> XEditResult<Object<'s>> {
        let handle = self.handle()?;
        let value = predicate_text(&value.into());
        let item = self.session().bridge().add_array_item(handle, "", subpath, &value)?;
        self.session().objectify(item)
    }

    pub fn has_item_with(&self, value: impl Into<Value>, subpath: &str) -> XEditResult<bool> {
        let handle = self.handle()?;
        let value = predicate_text(&value.into());
        self.session().bridge().has_array_item(handle, "", subpath, &value)
    }

    /// First item whose `subpath` holds `value`.
    pub fn find_item_with(&self, value: impl Into<Value>, subpath: &str) -> XEditResult<Option<Object<'s>>> {
        let handle = self.handle()?;
        let value = predicate_text(&value.into());
        let found = self.session().bridge().try_get_array_item(handle, "", subpath, &value)?;
        found.map(|h| self.session().objectify(h)).transpose()
    }

    pub fn remove_item_with(&self, value: impl Into<Value>, subpath: &str) -> XEditResult<()> {
        let handle = self.handle()?;
        let value = predicate_text(&value.into());
        self.session().bridge().remove_array_item(handle, "", subpath, &value)
    }

    /// Position of `item` in this array.
    pub fn index_of(&self, item: &Element<'_>) -> XEditResult<Option<usize>> {
        let mut found = None;
        for (i, candidate) in self.items()?.into_iter().enumerate() {
            let same = found.is_none() && candidate.equals(item)?;
            candidate.release()?;
            if same {
                found = Some(i);
            }
        }
        Ok(found)
    }

    /// Move `item` to `index`.
    ///
    /// Fails with [`XEditError::InvariantViolation`] before reaching the
    /// engine when the array is sorted or `item` is not one of its items.
    pub fn move_item(&self, item: &Element<'_>, index: usize) -> XEditResult<()> {
        if self.is_sorted() {
            return Err(XEditError::invariant(format!(
                "cannot move items of sorted array {}",
                self.describe()
            )));
        }
        if self.index_of(item)?.is_none() {
            return Err(XEditError::invariant(format!(
                "{} is not an item of {}",
                item.describe(),
                self.describe()
            )));
        }
        let len = self.len()?;
        let target = i32::try_from(index)
            .ok()
            .filter(|_| index < len)
            .ok_or_else(|| XEditError::invariant(format!("index {index} is out of bounds for {len} items")))?;
        let handle = item.handle()?;
        self.session().bridge().move_array_item(handle, target)
    }
}
