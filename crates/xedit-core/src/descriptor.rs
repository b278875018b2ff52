//! Element descriptors: the runtime type information the engine reports for a node.
//!
//! A descriptor is a snapshot. Any structural mutation (adding children,
//! changing a union's decider) may change what the engine reports, so
//! callers re-query rather than cache across mutations.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::XEditError;
use crate::signature::Signature;

// ============================================================================
// Native enumerations
// ============================================================================

/// Structural type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ElementType {
    File = 0,
    MainRecord,
    GroupRecord,
    SubRecord,
    SubRecordStruct,
    SubRecordArray,
    SubRecordUnion,
    Array,
    Struct,
    Value,
    Flag,
    StringListTerminator,
    Union,
    StructChapter,
}

/// Schema definition type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DefType {
    Record = 0,
    SubRecord,
    SubRecordArray,
    SubRecordStruct,
    SubRecordUnion,
    String,
    LString,
    LenString,
    ByteArray,
    Integer,
    IntegerFormater,
    IntegerFormaterUnion,
    Flag,
    Float,
    Array,
    Struct,
    Union,
    Empty,
    StructChapter,
}

impl DefType {
    /// Definition types that hold a single leaf value.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            DefType::String
                | DefType::LString
                | DefType::LenString
                | DefType::ByteArray
                | DefType::Integer
                | DefType::IntegerFormater
                | DefType::IntegerFormaterUnion
                | DefType::Flag
                | DefType::Float
        )
    }
}

/// How the engine merges conflicting versions of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SmashType {
    Unknown = 0,
    Record,
    String,
    Integer,
    Flag,
    Float,
    Struct,
    UnsortedArray,
    UnsortedStructArray,
    SortedArray,
    SortedStructArray,
    ByteArray,
    Union,
}

/// Storage kind of a node's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ValueType {
    Unknown = 0,
    Bytes,
    Number,
    String,
    Text,
    Reference,
    Flags,
    Enum,
    Color,
    Array,
    Struct,
}

/// Decode a native enum byte, naming the enum in the error.
pub fn decode_enum<T>(kind: &'static str, code: u8) -> Result<T, XEditError>
where
    T: TryFromPrimitive<Primitive = u8>,
{
    T::try_from_primitive(code).map_err(|_| XEditError::UnknownEnumCode { kind, code })
}

bitflags! {
    /// Boolean properties the engine reports per node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ElementFlags: u8 {
        const REMOVABLE = 1 << 0;
        const CAN_ADD   = 1 << 1;
        const SORTED    = 1 << 2;
        const FIXED     = 1 << 3;
        const MODIFIED  = 1 << 4;
        const EDITABLE  = 1 << 5;
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Coarse grouping used when coercing values and choosing wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Integer field holding a form id link.
    Reference,
    /// Leaf value.
    Value,
    /// Anything with children.
    Container,
}

/// Runtime-queried type information for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub element_type: ElementType,
    pub def_type: DefType,
    pub value_type: ValueType,
    pub smash_type: SmashType,
    pub signature: Option<Signature>,
    pub flags: ElementFlags,
}

impl ElementDescriptor {
    pub fn category(&self) -> Category {
        if !self.def_type.is_value() {
            Category::Container
        } else if self.def_type == DefType::Integer && self.value_type == ValueType::Reference {
            Category::Reference
        } else {
            Category::Value
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self.element_type,
            ElementType::Array | ElementType::SubRecordArray
        )
    }

    pub fn is_flags(&self) -> bool {
        self.value_type == ValueType::Flags
    }

    pub fn is_sorted(&self) -> bool {
        self.flags.contains(ElementFlags::SORTED)
    }

    pub fn is_removable(&self) -> bool {
        self.flags.contains(ElementFlags::REMOVABLE)
    }

    pub fn can_add(&self) -> bool {
        self.flags.contains(ElementFlags::CAN_ADD)
    }

    pub fn is_fixed(&self) -> bool {
        self.flags.contains(ElementFlags::FIXED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(def_type: DefType, value_type: ValueType) -> ElementDescriptor {
        ElementDescriptor {
            element_type: ElementType::SubRecord,
            def_type,
            value_type,
            smash_type: SmashType::Unknown,
            signature: None,
            flags: ElementFlags::empty(),
        }
    }

    #[test]
    fn native_codes() {
        assert_eq!(ElementType::try_from(13u8).unwrap(), ElementType::StructChapter);
        assert_eq!(u8::from(DefType::Float), 13);
        assert_eq!(u8::from(SmashType::Union), 12);
        assert_eq!(u8::from(ValueType::Struct), 10);
    }

    #[test]
    fn unknown_code_is_error() {
        let err = decode_enum::<ValueType>("ValueType", 200).unwrap_err();
        assert!(matches!(
            err,
            XEditError::UnknownEnumCode {
                kind: "ValueType",
                code: 200
            }
        ));
    }

    #[test]
    fn category_rules() {
        assert_eq!(
            descriptor(DefType::Integer, ValueType::Reference).category(),
            Category::Reference
        );
        assert_eq!(
            descriptor(DefType::Integer, ValueType::Number).category(),
            Category::Value
        );
        assert_eq!(
            descriptor(DefType::LString, ValueType::String).category(),
            Category::Value
        );
        assert_eq!(
            descriptor(DefType::Struct, ValueType::Struct).category(),
            Category::Container
        );
    }
}
