//! The signature catalog: every function exported by XEditLib.
//!
//! Each entry records the function name, one marshalling rule per parameter
//! and a return rule. The same declaration drives three things:
//!
//! - [`NativeFn`], the closed set of callable functions
//! - [`CATALOG`], the descriptor table the bridge validates arguments against
//! - the typed `extern "system"` trampolines used by the dynamic loader
//!
//! The engine uses Delphi `StdCall` conventions: strings are UTF-16,
//! booleans are 16-bit `WordBool`, handles are 32-bit cardinals.

use crate::arg::{AbiArg, NativeArg, NativeReturn};

/// Scalar ABI kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Byte,
    Cardinal,
    Integer,
    WordBool,
    Double,
}

/// Element type of a caller-allocated fill buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Wide,
    Cardinal,
    Byte,
}

/// How one parameter is marshalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRule {
    /// Engine handle passed by value.
    Handle,
    /// Scalar passed by value.
    Value(Scalar),
    /// Nul-terminated wide string.
    Str,
    /// Fixed-size output pointer.
    Out(Scalar),
    /// Output pointer receiving a new handle the caller must track.
    OutHandle,
    /// Output length of a result staged for the two-call idiom.
    ResultLen,
    /// Caller-allocated buffer the engine fills.
    Buffer(BufferKind),
}

/// How the return value is marshalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnRule {
    /// `WordBool` success flag.
    SuccessFlag,
    /// Procedure with no return value.
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub rule: ParamRule,
}

/// Descriptor of one native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub params: &'static [Param],
    pub ret: ReturnRule,
}

impl FunctionSignature {
    /// Position of the two-call length slot, if this function stages a result.
    pub fn result_len_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.rule == ParamRule::ResultLen)
    }

    /// Whether this function produces a handle the caller must track.
    pub fn returns_handle(&self) -> bool {
        self.params.iter().any(|p| p.rule == ParamRule::OutHandle)
    }
}

/// Untyped symbol address as resolved from the library.
pub type RawSymbol = unsafe extern "system" fn();

macro_rules! param_rule {
    (Handle) => { ParamRule::Handle };
    (Cardinal) => { ParamRule::Value(Scalar::Cardinal) };
    (Integer) => { ParamRule::Value(Scalar::Integer) };
    (Byte) => { ParamRule::Value(Scalar::Byte) };
    (WordBool) => { ParamRule::Value(Scalar::WordBool) };
    (Double) => { ParamRule::Value(Scalar::Double) };
    (Str) => { ParamRule::Str };
    (OutCardinal) => { ParamRule::Out(Scalar::Cardinal) };
    (OutInteger) => { ParamRule::Out(Scalar::Integer) };
    (OutByte) => { ParamRule::Out(Scalar::Byte) };
    (OutBool) => { ParamRule::Out(Scalar::WordBool) };
    (OutDouble) => { ParamRule::Out(Scalar::Double) };
    (OutHandle) => { ParamRule::OutHandle };
    (ResultLen) => { ParamRule::ResultLen };
    (WideBuf) => { ParamRule::Buffer(BufferKind::Wide) };
    (CardinalBuf) => { ParamRule::Buffer(BufferKind::Cardinal) };
    (ByteBuf) => { ParamRule::Buffer(BufferKind::Byte) };
}

macro_rules! abi_type {
    (Handle) => { u32 };
    (Cardinal) => { u32 };
    (Integer) => { i32 };
    (Byte) => { u8 };
    (WordBool) => { u16 };
    (Double) => { f64 };
    (Str) => { *const u16 };
    (OutCardinal) => { *mut u32 };
    (OutInteger) => { *mut i32 };
    (OutByte) => { *mut u8 };
    (OutBool) => { *mut u16 };
    (OutDouble) => { *mut f64 };
    (OutHandle) => { *mut u32 };
    (ResultLen) => { *mut i32 };
    (WideBuf) => { *mut u16 };
    (CardinalBuf) => { *mut u32 };
    (ByteBuf) => { *mut u8 };
}

macro_rules! return_rule {
    (Bool) => { ReturnRule::SuccessFlag };
    (Void) => { ReturnRule::Void };
}

macro_rules! return_abi {
    (Bool) => { u16 };
    (Void) => { () };
}

macro_rules! return_value {
    (Bool, $call:expr) => {
        NativeReturn::Bool($call != 0)
    };
    (Void, $call:expr) => {{
        $call;
        NativeReturn::Void
    }};
}

macro_rules! native_catalog {
    ($( $name:ident ( $( $param:ident : $rule:ident ),* $(,)? ) -> $ret:ident; )*) => {
        /// A function exported by the engine library.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NativeFn {
            $( $name, )*
        }

        impl NativeFn {
            /// Every catalog entry, in catalog order.
            pub const ALL: &'static [NativeFn] = &[ $( NativeFn::$name, )* ];

            /// Exported symbol name.
            pub fn name(self) -> &'static str {
                match self {
                    $( NativeFn::$name => stringify!($name), )*
                }
            }
        }

        /// Descriptor table, indexed by `NativeFn as usize`.
        pub static CATALOG: &[FunctionSignature] = &[
            $(
                FunctionSignature {
                    name: stringify!($name),
                    params: &[ $( Param { name: stringify!($param), rule: param_rule!($rule) }, )* ],
                    ret: return_rule!($ret),
                },
            )*
        ];

        /// Call `symbol` as the typed function `func`.
        ///
        /// Returns `None` if `args` does not line up with the entry's ABI.
        ///
        /// # Safety
        ///
        /// `symbol` must be the address of the exported function named by
        /// `func`, and every buffer slot must be at least as large as the
        /// length argument that accompanies it.
        pub(crate) unsafe fn dispatch(
            func: NativeFn,
            symbol: RawSymbol,
            args: &mut [NativeArg<'_>],
        ) -> Option<NativeReturn> {
            match func {
                $(
                    NativeFn::$name => {
                        type Target = unsafe extern "system" fn($( abi_type!($rule) ),*) -> return_abi!($ret);
                        // SAFETY: the catalog entry mirrors the exported declaration.
                        let target: Target = unsafe { std::mem::transmute::<RawSymbol, Target>(symbol) };
                        #[allow(unused_mut, unused_variables)]
                        let mut slots = args.iter_mut();
                        $( let $param: abi_type!($rule) = AbiArg::from_arg(slots.next()?)?; )*
                        // SAFETY: argument shapes were checked above; pointers borrow from `args`.
                        Some(return_value!($ret, unsafe { target($( $param ),*) }))
                    }
                )*
            }
        }
    };
}

native_catalog! {
    // meta
    InitXEdit() -> Void;
    CloseXEdit() -> Void;
    GetResultString(buf: WideBuf, max_len: Integer) -> Bool;
    GetResultArray(buf: CardinalBuf, max_len: Integer) -> Bool;
    GetResultBytes(buf: ByteBuf, max_len: Integer) -> Bool;
    GetGlobal(key: Str, len: ResultLen) -> Bool;
    GetGlobals(len: ResultLen) -> Bool;
    SetSortMode(sort_by: Byte, reverse: WordBool) -> Bool;
    Release(id: Handle) -> Bool;
    ResetStore() -> Bool;

    // messages
    GetMessagesLength(len: OutInteger) -> Void;
    GetMessages(buf: WideBuf, max_len: Integer) -> Bool;
    ClearMessages() -> Void;
    GetExceptionMessageLength(len: OutInteger) -> Void;
    GetExceptionMessage(buf: WideBuf, max_len: Integer) -> Bool;
    GetExceptionStackLength(len: OutInteger) -> Void;
    GetExceptionStack(buf: WideBuf, max_len: Integer) -> Bool;

    // setup
    GetGamePath(mode: Integer, len: ResultLen) -> Bool;
    SetGamePath(path: Str) -> Bool;
    GetGameLanguage(mode: Integer, len: ResultLen) -> Bool;
    SetLanguage(lang: Str) -> Bool;
    SetBackupPath(path: Str) -> Bool;
    SetGameMode(mode: Integer) -> Bool;
    GetLoadOrder(len: ResultLen) -> Bool;
    GetActivePlugins(len: ResultLen) -> Bool;
    LoadPlugins(load_order: Str, smart_load: WordBool) -> Bool;
    LoadPlugin(filename: Str) -> Bool;
    BuildReferences(id: Handle, synchronous: WordBool) -> Bool;
    GetLoaderStatus(status: OutByte) -> Bool;
    UnloadPlugin(id: Handle) -> Bool;

    // files
    AddFile(filename: Str, res: OutHandle) -> Bool;
    FileByIndex(index: Integer, res: OutHandle) -> Bool;
    FileByLoadOrder(load_order: Integer, res: OutHandle) -> Bool;
    FileByName(name: Str, res: OutHandle) -> Bool;
    FileByAuthor(author: Str, res: OutHandle) -> Bool;
    NukeFile(id: Handle) -> Bool;
    RenameFile(id: Handle, filename: Str) -> Bool;
    SaveFile(id: Handle, file_path: Str) -> Bool;
    CRCHash(id: Handle, len: ResultLen) -> Bool;
    GetRecordCount(id: Handle, count: OutInteger) -> Bool;
    GetOverrideRecordCount(id: Handle, count: OutInteger) -> Bool;
    GetFileLoadOrder(id: Handle, load_order: OutInteger) -> Bool;

    // masters
    CleanMasters(id: Handle) -> Bool;
    SortMasters(id: Handle) -> Bool;
    AddMaster(id: Handle, master_name: Str) -> Bool;
    AddMasters(id: Handle, masters: Str) -> Bool;
    AddRequiredMasters(id: Handle, id2: Handle, as_new: WordBool) -> Bool;
    GetMasters(id: Handle, len: ResultLen) -> Bool;
    GetRequiredBy(id: Handle, len: ResultLen) -> Bool;
    GetMasterNames(id: Handle, len: ResultLen) -> Bool;

    // elements
    HasElement(id: Handle, path: Str, out: OutBool) -> Bool;
    GetElement(id: Handle, path: Str, res: OutHandle) -> Bool;
    AddElement(id: Handle, path: Str, res: OutHandle) -> Bool;
    AddElementValue(id: Handle, path: Str, value: Str, res: OutHandle) -> Bool;
    RemoveElement(id: Handle, path: Str) -> Bool;
    RemoveElementOrParent(id: Handle) -> Bool;
    SetElement(id: Handle, id2: Handle) -> Bool;
    GetElements(id: Handle, path: Str, sort: WordBool, filter: WordBool, len: ResultLen) -> Bool;
    GetAddList(id: Handle, len: ResultLen) -> Bool;
    GetLinksTo(id: Handle, path: Str, res: OutHandle) -> Bool;
    SetLinksTo(id: Handle, path: Str, id2: Handle) -> Bool;
    GetElementIndex(id: Handle, index: OutInteger) -> Bool;
    GetContainer(id: Handle, res: OutHandle) -> Bool;
    GetElementFile(id: Handle, res: OutHandle) -> Bool;
    GetElementGroup(id: Handle, res: OutHandle) -> Bool;
    GetElementRecord(id: Handle, res: OutHandle) -> Bool;
    ElementCount(id: Handle, count: OutInteger) -> Bool;
    ElementEquals(id: Handle, id2: Handle, out: OutBool) -> Bool;
    ElementMatches(id: Handle, path: Str, value: Str, out: OutBool) -> Bool;
    HasArrayItem(id: Handle, path: Str, subpath: Str, value: Str, out: OutBool) -> Bool;
    GetArrayItem(id: Handle, path: Str, subpath: Str, value: Str, res: OutHandle) -> Bool;
    AddArrayItem(id: Handle, path: Str, subpath: Str, value: Str, res: OutHandle) -> Bool;
    RemoveArrayItem(id: Handle, path: Str, subpath: Str, value: Str) -> Bool;
    MoveArrayItem(id: Handle, index: Integer) -> Bool;
    CopyElement(id: Handle, id2: Handle, as_new: WordBool, res: OutHandle) -> Bool;
    GetIsModified(id: Handle, out: OutBool) -> Bool;
    GetIsEditable(id: Handle, out: OutBool) -> Bool;
    SetIsEditable(id: Handle, editable: WordBool) -> Bool;
    GetIsRemoveable(id: Handle, out: OutBool) -> Bool;
    GetCanAdd(id: Handle, out: OutBool) -> Bool;
    SortKey(id: Handle, len: ResultLen) -> Bool;
    ElementType(id: Handle, code: OutByte) -> Bool;
    DefType(id: Handle, code: OutByte) -> Bool;
    SmashType(id: Handle, code: OutByte) -> Bool;
    ValueType(id: Handle, code: OutByte) -> Bool;
    IsSorted(id: Handle, out: OutBool) -> Bool;
    IsFixed(id: Handle, out: OutBool) -> Bool;

    // serialization
    ElementToJson(id: Handle, len: ResultLen) -> Bool;
    ElementFromJson(id: Handle, path: Str, json: Str) -> Bool;

    // element values
    Name(id: Handle, len: ResultLen) -> Bool;
    LongName(id: Handle, len: ResultLen) -> Bool;
    DisplayName(id: Handle, len: ResultLen) -> Bool;
    Path(id: Handle, short: WordBool, local: WordBool, len: ResultLen) -> Bool;
    Signature(id: Handle, len: ResultLen) -> Bool;
    GetValue(id: Handle, path: Str, len: ResultLen) -> Bool;
    SetValue(id: Handle, path: Str, value: Str) -> Bool;
    GetIntValue(id: Handle, path: Str, value: OutInteger) -> Bool;
    SetIntValue(id: Handle, path: Str, value: Integer) -> Bool;
    GetUIntValue(id: Handle, path: Str, value: OutCardinal) -> Bool;
    SetUIntValue(id: Handle, path: Str, value: Cardinal) -> Bool;
    GetFloatValue(id: Handle, path: Str, value: OutDouble) -> Bool;
    SetFloatValue(id: Handle, path: Str, value: Double) -> Bool;
    GetFlag(id: Handle, path: Str, name: Str, enabled: OutBool) -> Bool;
    SetFlag(id: Handle, path: Str, name: Str, enabled: WordBool) -> Bool;
    GetAllFlags(id: Handle, path: Str, len: ResultLen) -> Bool;
    GetEnabledFlags(id: Handle, path: Str, len: ResultLen) -> Bool;
    SetEnabledFlags(id: Handle, path: Str, flags: Str) -> Bool;
    GetEnumOptions(id: Handle, path: Str, len: ResultLen) -> Bool;
    SignatureFromName(name: Str, len: ResultLen) -> Bool;
    NameFromSignature(sig: Str, len: ResultLen) -> Bool;

    // records
    GetFormID(id: Handle, form_id: OutCardinal, native: WordBool) -> Bool;
    SetFormID(id: Handle, form_id: Cardinal, native: WordBool, fix_references: WordBool) -> Bool;
    GetRecord(id: Handle, form_id: Cardinal, search_masters: WordBool, res: OutHandle) -> Bool;
    GetRecords(id: Handle, search: Str, include_overrides: WordBool, len: ResultLen) -> Bool;
    GetOverrides(id: Handle, len: ResultLen) -> Bool;
    GetMasterRecord(id: Handle, res: OutHandle) -> Bool;
    GetWinningOverride(id: Handle, res: OutHandle) -> Bool;
    GetReferencedBy(id: Handle, len: ResultLen) -> Bool;
    IsMaster(id: Handle, out: OutBool) -> Bool;
    IsInjected(id: Handle, out: OutBool) -> Bool;
    IsOverride(id: Handle, out: OutBool) -> Bool;
    IsWinningOverride(id: Handle, out: OutBool) -> Bool;
}

impl NativeFn {
    /// Catalog entry for this function.
    pub fn signature(self) -> &'static FunctionSignature {
        &CATALOG[self as usize]
    }

    /// NUL-terminated symbol name for library lookup.
    pub fn symbol_name(self) -> Vec<u8> {
        let mut name = self.name().as_bytes().to_vec();
        name.push(0);
        name
    }
}

impl std::fmt::Display for NativeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
