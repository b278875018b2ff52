//! Host-side argument values and their native ABI counterparts.

use xedit_core::Handle;

use crate::catalog::{BufferKind, ParamRule, Scalar};

/// One argument slot of a native call.
///
/// Input variants are passed by value; `Out*` variants and buffers are
/// written by the engine.
#[derive(Debug)]
pub enum NativeArg<'a> {
    Handle(Handle),
    Cardinal(u32),
    Integer(i32),
    Byte(u8),
    Bool(bool),
    Double(f64),
    /// Nul-terminated UTF-16 string.
    Str(&'a [u16]),
    OutCardinal(&'a mut u32),
    OutInteger(&'a mut i32),
    OutByte(&'a mut u8),
    /// Delphi `WordBool`: 16 bits, non-zero is true.
    OutBool(&'a mut u16),
    OutDouble(&'a mut f64),
    WideBuf(&'a mut [u16]),
    CardinalBuf(&'a mut [u32]),
    ByteBuf(&'a mut [u8]),
}

impl NativeArg<'_> {
    /// Render an input argument for error reports. Outputs render as `None`.
    pub fn render(&self) -> Option<String> {
        match self {
            NativeArg::Handle(h) => Some(h.to_string()),
            NativeArg::Cardinal(v) => Some(v.to_string()),
            NativeArg::Integer(v) => Some(v.to_string()),
            NativeArg::Byte(v) => Some(v.to_string()),
            NativeArg::Bool(v) => Some(v.to_string()),
            NativeArg::Double(v) => Some(v.to_string()),
            NativeArg::Str(s) => Some(format!("{:?}", crate::strings::from_wide_lossy(s))),
            _ => None,
        }
    }
}

impl ParamRule {
    /// Check whether `arg` has the shape this rule expects.
    pub fn accepts(&self, arg: &NativeArg<'_>) -> bool {
        matches!(
            (self, arg),
            (ParamRule::Handle, NativeArg::Handle(_))
                | (ParamRule::Value(Scalar::Cardinal), NativeArg::Cardinal(_))
                | (ParamRule::Value(Scalar::Integer), NativeArg::Integer(_))
                | (ParamRule::Value(Scalar::Byte), NativeArg::Byte(_))
                | (ParamRule::Value(Scalar::WordBool), NativeArg::Bool(_))
                | (ParamRule::Value(Scalar::Double), NativeArg::Double(_))
                | (ParamRule::Str, NativeArg::Str(_))
                | (ParamRule::Out(Scalar::Cardinal), NativeArg::OutCardinal(_))
                | (ParamRule::Out(Scalar::Integer), NativeArg::OutInteger(_))
                | (ParamRule::Out(Scalar::Byte), NativeArg::OutByte(_))
                | (ParamRule::Out(Scalar::WordBool), NativeArg::OutBool(_))
                | (ParamRule::Out(Scalar::Double), NativeArg::OutDouble(_))
                | (ParamRule::OutHandle, NativeArg::OutCardinal(_))
                | (ParamRule::ResultLen, NativeArg::OutInteger(_))
                | (ParamRule::Buffer(BufferKind::Wide), NativeArg::WideBuf(_))
                | (ParamRule::Buffer(BufferKind::Cardinal), NativeArg::CardinalBuf(_))
                | (ParamRule::Buffer(BufferKind::Byte), NativeArg::ByteBuf(_))
        )
    }
}

/// Native return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeReturn {
    Void,
    Bool(bool),
}

impl NativeReturn {
    pub fn is_failure(self) -> bool {
        self == NativeReturn::Bool(false)
    }
}

// ============================================================================
// ABI conversion
// ============================================================================

/// Conversion from an argument slot to the primitive passed across the ABI.
pub(crate) trait AbiArg: Sized {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self>;
}

impl AbiArg for u32 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Handle(h) => Some(h.raw()),
            NativeArg::Cardinal(v) => Some(*v),
            _ => None,
        }
    }
}

impl AbiArg for i32 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl AbiArg for u8 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Byte(v) => Some(*v),
            _ => None,
        }
    }
}

impl AbiArg for u16 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Bool(v) => Some(u16::from(*v)),
            _ => None,
        }
    }
}

impl AbiArg for f64 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl AbiArg for *const u16 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::Str(s) => Some(s.as_ptr()),
            _ => None,
        }
    }
}

impl AbiArg for *mut u16 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::OutBool(slot) => Some(&mut **slot as *mut u16),
            NativeArg::WideBuf(buf) => Some(buf.as_mut_ptr()),
            _ => None,
        }
    }
}

impl AbiArg for *mut u32 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::OutCardinal(slot) => Some(&mut **slot as *mut u32),
            NativeArg::CardinalBuf(buf) => Some(buf.as_mut_ptr()),
            _ => None,
        }
    }
}

impl AbiArg for *mut i32 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::OutInteger(slot) => Some(&mut **slot as *mut i32),
            _ => None,
        }
    }
}

impl AbiArg for *mut u8 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::OutByte(slot) => Some(&mut **slot as *mut u8),
            NativeArg::ByteBuf(buf) => Some(buf.as_mut_ptr()),
            _ => None,
        }
    }
}

impl AbiArg for *mut f64 {
    fn from_arg(arg: &mut NativeArg<'_>) -> Option<Self> {
        match arg {
            NativeArg::OutDouble(slot) => Some(&mut **slot as *mut f64),
            _ => None,
        }
    }
}

/// Scalars that can be read back through an output slot.
pub(crate) trait OutValue: Copy + Default {
    fn slot(value: &mut Self) -> NativeArg<'_>;
}

impl OutValue for u32 {
    fn slot(value: &mut Self) -> NativeArg<'_> {
        NativeArg::OutCardinal(value)
    }
}

impl OutValue for i32 {
    fn slot(value: &mut Self) -> NativeArg<'_> {
        NativeArg::OutInteger(value)
    }
}

impl OutValue for u8 {
    fn slot(value: &mut Self) -> NativeArg<'_> {
        NativeArg::OutByte(value)
    }
}

impl OutValue for u16 {
    fn slot(value: &mut Self) -> NativeArg<'_> {
        NativeArg::OutBool(value)
    }
}

impl OutValue for f64 {
    fn slot(value: &mut Self) -> NativeArg<'_> {
        NativeArg::OutDouble(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_accept_matching_shapes() {
        let mut out = 0u32;
        assert!(ParamRule::Handle.accepts(&NativeArg::Handle(Handle(1))));
        assert!(ParamRule::OutHandle.accepts(&NativeArg::OutCardinal(&mut out)));
        assert!(!ParamRule::Handle.accepts(&NativeArg::Cardinal(1)));
        assert!(!ParamRule::ResultLen.accepts(&NativeArg::Integer(0)));
    }

    #[test]
    fn render_skips_outputs() {
        let mut len = 0i32;
        let path: Vec<u16> = "EDID\0".encode_utf16().collect();
        assert_eq!(NativeArg::Handle(Handle(4)).render().as_deref(), Some("#4"));
        assert_eq!(NativeArg::Str(&path).render().as_deref(), Some("\"EDID\""));
        assert!(NativeArg::OutInteger(&mut len).render().is_none());
    }

    #[test]
    fn abi_conversion() {
        let mut flag = 0u16;
        let mut arg = NativeArg::Bool(true);
        assert_eq!(u16::from_arg(&mut arg), Some(1));
        let mut arg = NativeArg::OutBool(&mut flag);
        assert!(<*mut u16>::from_arg(&mut arg).is_some());
        let mut arg = NativeArg::Integer(3);
        assert_eq!(u32::from_arg(&mut arg), None);
    }
}
