//! Leaf values and their coercion to and from the engine's storage kinds.

use std::fmt;

use xedit_core::{
    Color, DefType, ElementDescriptor, ElementType, Handle, ValueType, XEditError, XEditResult, bytes_to_hex,
    form_id_to_string, hex_to_bytes,
};
use xedit_ffi::Bridge;

/// A host-side leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    /// Enum option label.
    Enum(String),
    Color(Color),
    /// Reference by form id. `0` is the null reference.
    FormId(u32),
    /// Enabled flag names.
    Flags(Vec<String>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Bool(_) => "bool",
            Value::Enum(_) => "enum",
            Value::Color(_) => "color",
            Value::FormId(_) => "form id",
            Value::Flags(_) => "flags",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            Value::Bool(b) => Some(i64::from(b)),
            Value::FormId(id) => Some(i64::from(id)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_form_id(&self) -> Option<u32> {
        match *self {
            Value::FormId(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) | Value::Enum(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&bytes_to_hex(b)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Color(c) => write!(f, "{c}"),
            Value::FormId(id) => f.write_str(&form_id_to_string(*id)),
            Value::Flags(names) => f.write_str(&names.join(", ")),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant($conv(v))
                }
            }
        )*
    };
}

value_from! {
    i64 => Integer(|v| v),
    i32 => Integer(i64::from),
    u32 => Integer(i64::from),
    u16 => Integer(i64::from),
    u8 => Integer(i64::from),
    f64 => Float(|v| v),
    f32 => Float(f64::from),
    bool => Bool(|v| v),
    String => Text(|v| v),
    &str => Text(str::to_string),
    Vec<u8> => Bytes(|v| v),
    &[u8] => Bytes(<[u8]>::to_vec),
    Color => Color(|v| v),
}

// ============================================================================
// Reading
// ============================================================================

/// Read the value of a leaf node.
pub(crate) fn read(bridge: &mut Bridge, handle: Handle, descriptor: &ElementDescriptor) -> XEditResult<Value> {
    if descriptor.element_type == ElementType::Flag {
        let text = bridge.get_value(handle, "")?;
        return Ok(Value::Bool(!text.is_empty() && text != "0"));
    }
    match descriptor.value_type {
        ValueType::Color => read_color(bridge, handle).map(Value::Color),
        ValueType::Reference => bridge.get_uint_value(handle, "").map(Value::FormId),
        ValueType::Flags => bridge.get_enabled_flags(handle, "").map(Value::Flags),
        ValueType::Number if descriptor.def_type == DefType::Float => {
            bridge.get_float_value(handle, "").map(Value::Float)
        }
        ValueType::Number => {
            let text = bridge.get_value(handle, "")?;
            match text.trim().parse::<i64>() {
                Ok(i) => Ok(Value::Integer(i)),
                Err(_) => bridge.get_int_value(handle, "").map(|i| Value::Integer(i64::from(i))),
            }
        }
        ValueType::Bytes => {
            let text = bridge.get_value(handle, "")?;
            hex_to_bytes(&text).map(Value::Bytes)
        }
        ValueType::Enum => bridge.get_value(handle, "").map(Value::Enum),
        ValueType::String | ValueType::Text | ValueType::Unknown => bridge.get_value(handle, "").map(Value::Text),
        ValueType::Array | ValueType::Struct => Err(XEditError::invariant(format!(
            "{handle} is a {:?} and holds no value",
            descriptor.element_type
        ))),
    }
}

fn read_color(bridge: &mut Bridge, handle: Handle) -> XEditResult<Color> {
    let mut channels = [0u8; 3];
    for (slot, channel) in channels.iter_mut().zip(Color::CHANNELS) {
        let value = bridge.get_int_value(handle, channel)?;
        *slot = u8::try_from(value)
            .map_err(|_| XEditError::Decode(format!("{channel} channel out of range: {value}")))?;
    }
    Ok(Color::new(channels[0], channels[1], channels[2]))
}

// ============================================================================
// Writing
// ============================================================================

/// Store `value` on a leaf node, converting it to the node's storage kind.
pub(crate) fn write(bridge: &mut Bridge, handle: Handle, descriptor: &ElementDescriptor, value: Value) -> XEditResult<()> {
    let mismatch = |value: &Value| {
        XEditError::invariant(format!(
            "cannot store {} '{value}' in {:?} element {handle}",
            value.kind(),
            descriptor.value_type
        ))
    };

    if descriptor.element_type == ElementType::Flag {
        return match value {
            Value::Bool(b) => bridge.set_value(handle, "", if b { "1" } else { "0" }),
            other => Err(mismatch(&other)),
        };
    }

    match (descriptor.value_type, value) {
        (ValueType::Color, Value::Color(color)) => {
            for (channel, v) in Color::CHANNELS.iter().zip(color.channels()) {
                bridge.set_int_value(handle, channel, i32::from(v))?;
            }
            Ok(())
        }
        (ValueType::Flags, Value::Flags(names)) => bridge.set_enabled_flags(handle, "", &names),
        (ValueType::Reference, Value::FormId(id)) => bridge.set_uint_value(handle, "", id),
        (ValueType::Reference, Value::Integer(i)) => match u32::try_from(i) {
            Ok(id) => bridge.set_uint_value(handle, "", id),
            Err(_) => Err(mismatch(&Value::Integer(i))),
        },
        (ValueType::Reference, Value::Text(text)) => bridge.set_value(handle, "", &text),
        (ValueType::Number, value) => write_number(bridge, handle, descriptor, value, &mismatch),
        (ValueType::Bytes, Value::Bytes(bytes)) => bridge.set_value(handle, "", &bytes_to_hex(&bytes)),
        (ValueType::Enum, Value::Enum(label) | Value::Text(label)) => bridge.set_value(handle, "", &label),
        (ValueType::Enum, Value::Integer(i)) => match i32::try_from(i) {
            Ok(index) => bridge.set_int_value(handle, "", index),
            Err(_) => Err(mismatch(&Value::Integer(i))),
        },
        (ValueType::String | ValueType::Text | ValueType::Unknown, value) => match value {
            Value::Text(s) | Value::Enum(s) => bridge.set_value(handle, "", &s),
            Value::Integer(_) | Value::Float(_) => bridge.set_value(handle, "", &value.to_string()),
            other => Err(mismatch(&other)),
        },
        (_, other) => Err(mismatch(&other)),
    }
}

fn write_number(
    bridge: &mut Bridge,
    handle: Handle,
    descriptor: &ElementDescriptor,
    value: Value,
    mismatch: impl Fn(&Value) -> XEditError,
) -> XEditResult<()> {
    let is_float = descriptor.def_type == DefType::Float;
    match value {
        Value::Float(f) if is_float => bridge.set_float_value(handle, "", f),
        Value::Integer(i) if is_float => bridge.set_float_value(handle, "", i as f64),
        Value::Integer(i) => write_integer(bridge, handle, i).ok_or_else(|| mismatch(&Value::Integer(i)))?,
        Value::Bool(b) => write_integer(bridge, handle, i64::from(b)).ok_or_else(|| mismatch(&Value::Bool(b)))?,
        // whole floats are accepted by integer fields
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            write_integer(bridge, handle, f as i64).ok_or_else(|| mismatch(&Value::Float(f)))?
        }
        Value::Text(text) => {
            let parses = if is_float {
                text.trim().parse::<f64>().is_ok()
            } else {
                text.trim().parse::<i64>().is_ok()
            };
            if parses {
                bridge.set_value(handle, "", text.trim())
            } else {
                Err(mismatch(&Value::Text(text)))
            }
        }
        other => Err(mismatch(&other)),
    }
}

/// `None` when `value` fits neither a signed nor an unsigned 32-bit field.
fn write_integer(bridge: &mut Bridge, handle: Handle, value: i64) -> Option<XEditResult<()>> {
    if let Ok(v) = i32::try_from(value) {
        Some(bridge.set_int_value(handle, "", v))
    } else if let Ok(v) = u32::try_from(value) {
        Some(bridge.set_uint_value(handle, "", v))
    } else {
        None
    }
}

/// Render a value the way array item predicates compare against.
pub(crate) fn predicate_text(value: &Value) -> String {
    match value {
        Value::Flags(names) => names.join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Value::from(3u8), Value::Integer(3));
        assert_eq!(Value::from("Iron"), Value::Text("Iron".into()));
        assert_eq!(Value::from(&[1u8, 2][..]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::from(1.5f32), Value::Float(1.5));
    }

    #[test]
    fn display() {
        assert_eq!(Value::FormId(0x12E46).to_string(), "00012E46");
        assert_eq!(Value::Bytes(vec![0x0A, 0xFF]).to_string(), "0A FF");
        assert_eq!(Value::Flags(vec!["ESM".into(), "Localized".into()]).to_string(), "ESM, Localized");
        assert_eq!(predicate_text(&Value::Flags(vec!["A".into(), "B".into()])), "A,B");
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Bool(true).as_i64(), Some(1));
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::Enum("Hair".into()).as_str(), Some("Hair"));
        assert_eq!(Value::Text("x".into()).as_form_id(), None);
        assert_eq!(Value::FormId(7).kind(), "form id");
    }
}
