//! Named fields of record kinds.
//!
//! An [`Attribute`] binds a field name to a child path below a record and
//! the kind of value stored there. Tables of them are `static` and shared
//! by every record of a kind; [`read`] and [`write`] are the only code that
//! interprets them.

use tracing::warn;
use xedit_core::{XEditError, XEditResult};

use crate::element::{Element, Entry, Value};

/// What an attribute's path holds, checked before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Whatever the engine's descriptor says.
    Any,
    Integer,
    Float,
    Text,
    /// One of a fixed set of labels.
    Enum(&'static [&'static str]),
    Reference,
    Flags,
    /// A container: readable as an object, only removable as a whole.
    Object,
}

impl Storage {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Storage::Any, _) => true,
            (Storage::Integer, Value::Integer(_) | Value::Bool(_)) => true,
            (Storage::Float, Value::Float(_) | Value::Integer(_)) => true,
            (Storage::Text, Value::Text(_)) => true,
            (Storage::Enum(options), Value::Enum(label) | Value::Text(label)) => options.contains(&label.as_str()),
            (Storage::Reference, Value::FormId(_) | Value::Integer(_)) => true,
            (Storage::Flags, Value::Flags(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub path: &'static str,
    pub storage: Storage,
    /// Other names the field answers to.
    pub aliases: &'static [&'static str],
}

impl Attribute {
    pub const fn new(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            storage: Storage::Any,
            aliases: &[],
        }
    }

    pub const fn stored_as(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub const fn aliased(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Whether `key` names this attribute: its name, an alias, or its path
    /// in any case.
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.aliases.contains(&key) || self.path.eq_ignore_ascii_case(key)
    }
}

/// Find `key` in `table`.
pub fn find(table: &'static [Attribute], key: &str) -> Option<&'static Attribute> {
    table.iter().find(|a| a.matches(key))
}

/// Read `attribute` below `element`. `None` when the field is absent.
pub fn read<'s>(element: &Element<'s>, attribute: &Attribute) -> XEditResult<Option<Entry<'s>>> {
    element.get(attribute.path)
}

/// Write `attribute` below `element`.
///
/// `None` removes the field, which must be removable; removing an absent
/// field does nothing. A missing field is created before the write. If the
/// write then fails, everything created for it is removed again, containers
/// included.
pub fn write(element: &Element<'_>, attribute: &Attribute, value: Option<Value>) -> XEditResult<()> {
    let Some(value) = value else {
        return clear(element, attribute);
    };
    if attribute.storage == Storage::Object || !attribute.storage.accepts(&value) {
        return Err(XEditError::invariant(format!(
            "{} '{value}' is not a valid {} ({:?})",
            value.kind(),
            attribute.name,
            attribute.storage
        )));
    }

    let (target, created) = match element.lookup(attribute.path)? {
        Some(existing) => (existing, None),
        None => {
            let missing = first_missing(element, attribute.path)?;
            (element.get_or_add(attribute.path)?, Some(missing))
        }
    };
    match target.write_value(value) {
        Ok(()) => target.release(),
        Err(e) => {
            target.release()?;
            if let Some(missing) = created {
                remove_created(element, missing, attribute);
            }
            Err(e)
        }
    }
}

/// Shallowest prefix of `path` not present under `element`.
fn first_missing<'p>(element: &Element<'_>, path: &'p str) -> XEditResult<&'p str> {
    for (end, _) in path.match_indices('\\') {
        let prefix = &path[..end];
        if !element.has(prefix)? {
            return Ok(prefix);
        }
    }
    Ok(path)
}

fn remove_created(element: &Element<'_>, missing: &str, attribute: &Attribute) {
    let removed = match element.lookup(missing) {
        Ok(Some(created)) => created.into_element().delete(),
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };
    if let Err(cleanup) = removed {
        warn!(attribute = attribute.name, path = missing, error = %cleanup, "could not remove field after failed write");
    }
}

fn clear(element: &Element<'_>, attribute: &Attribute) -> XEditResult<()> {
    let Some(existing) = element.lookup(attribute.path)? else {
        return Ok(());
    };
    if !existing.is_removable() {
        let path = existing.describe();
        existing.release()?;
        return Err(XEditError::invariant(format!(
            "{} at {path} cannot be removed",
            attribute.name
        )));
    }
    existing.delete()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: Attribute = Attribute::new("full_name", "FULL").aliased(&["full"]);
    const KIND: Attribute = Attribute::new("kind", "PNAM").stored_as(Storage::Enum(&["Hair", "Eyes"]));

    #[test]
    fn matching() {
        assert!(FULL.matches("full_name"));
        assert!(FULL.matches("full"));
        assert!(FULL.matches("Full"));
        assert!(!FULL.matches("FULL\\x"));
    }

    #[test]
    fn storage_checks() {
        assert!(KIND.storage.accepts(&Value::Text("Hair".into())));
        assert!(!KIND.storage.accepts(&Value::Text("Nose".into())));
        assert!(Storage::Float.accepts(&Value::Integer(3)));
        assert!(!Storage::Reference.accepts(&Value::Text("x".into())));
        assert!(!Storage::Object.accepts(&Value::Integer(1)));
        assert!(Storage::Any.accepts(&Value::Bytes(vec![])));
    }

    #[test]
    fn table_lookup() {
        static TABLE: [Attribute; 2] = [FULL, KIND];
        assert_eq!(find(&TABLE, "PNAM").map(|a| a.name), Some("kind"));
        assert!(find(&TABLE, "missing").is_none());
    }
}
