use xedit_core::{Handle, XEditResult};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::{split_commas, split_lines, to_wide};

impl Bridge {
    pub fn name(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::Name, vec![NativeArg::Handle(id)])
    }

    pub fn long_name(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::LongName, vec![NativeArg::Handle(id)])
    }

    pub fn display_name(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::DisplayName, vec![NativeArg::Handle(id)])
    }

    /// Path of `id`. `short` abbreviates records, `local` stops at the record.
    pub fn path(&mut self, id: Handle, short: bool, local: bool) -> XEditResult<String> {
        self.fetch_dynamic(
            NativeFn::Path,
            vec![NativeArg::Handle(id), NativeArg::Bool(short), NativeArg::Bool(local)],
        )
    }

    pub fn signature(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::Signature, vec![NativeArg::Handle(id)])
    }

    /// Signature of `id`, or `None` for nodes without one.
    pub fn try_signature(&mut self, id: Handle) -> XEditResult<Option<String>> {
        self.fetch_dynamic_optional(NativeFn::Signature, vec![NativeArg::Handle(id)])
    }

    pub fn get_value(&mut self, id: Handle, path: &str) -> XEditResult<String> {
        let path = to_wide(path);
        self.fetch_dynamic(NativeFn::GetValue, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn try_get_value(&mut self, id: Handle, path: &str) -> XEditResult<Option<String>> {
        let path = to_wide(path);
        self.fetch_dynamic_optional(NativeFn::GetValue, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn set_value(&mut self, id: Handle, path: &str, value: &str) -> XEditResult<()> {
        let path = to_wide(path);
        let value = to_wide(value);
        self.call(
            NativeFn::SetValue,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&value)],
        )
    }

    pub fn get_int_value(&mut self, id: Handle, path: &str) -> XEditResult<i32> {
        let path = to_wide(path);
        self.call_out(NativeFn::GetIntValue, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn set_int_value(&mut self, id: Handle, path: &str, value: i32) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(
            NativeFn::SetIntValue,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Integer(value)],
        )
    }

    pub fn get_uint_value(&mut self, id: Handle, path: &str) -> XEditResult<u32> {
        let path = to_wide(path);
        self.call_out(NativeFn::GetUIntValue, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn set_uint_value(&mut self, id: Handle, path: &str, value: u32) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(
            NativeFn::SetUIntValue,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Cardinal(value)],
        )
    }

    pub fn get_float_value(&mut self, id: Handle, path: &str) -> XEditResult<f64> {
        let path = to_wide(path);
        self.call_out(NativeFn::GetFloatValue, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn set_float_value(&mut self, id: Handle, path: &str, value: f64) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(
            NativeFn::SetFloatValue,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Double(value)],
        )
    }

    pub fn get_flag(&mut self, id: Handle, path: &str, name: &str) -> XEditResult<bool> {
        let path = to_wide(path);
        let name = to_wide(name);
        self.call_bool(
            NativeFn::GetFlag,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&name)],
        )
    }

    pub fn set_flag(&mut self, id: Handle, path: &str, name: &str, enabled: bool) -> XEditResult<()> {
        let path = to_wide(path);
        let name = to_wide(name);
        self.call(
            NativeFn::SetFlag,
            vec![
                NativeArg::Handle(id),
                NativeArg::Str(&path),
                NativeArg::Str(&name),
                NativeArg::Bool(enabled),
            ],
        )
    }

    /// Every flag name the definition declares, in bit order.
    pub fn get_all_flags(&mut self, id: Handle, path: &str) -> XEditResult<Vec<String>> {
        let path = to_wide(path);
        let text: String =
            self.fetch_dynamic(NativeFn::GetAllFlags, vec![NativeArg::Handle(id), NativeArg::Str(&path)])?;
        Ok(split_commas(&text))
    }

    pub fn get_enabled_flags(&mut self, id: Handle, path: &str) -> XEditResult<Vec<String>> {
        let path = to_wide(path);
        let text: String =
            self.fetch_dynamic(NativeFn::GetEnabledFlags, vec![NativeArg::Handle(id), NativeArg::Str(&path)])?;
        Ok(split_commas(&text))
    }

    /// Enable exactly `flags`, clearing every other bit.
    pub fn set_enabled_flags<S: AsRef<str>>(&mut self, id: Handle, path: &str, flags: &[S]) -> XEditResult<()> {
        let path = to_wide(path);
        let joined = flags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        let joined = to_wide(&joined);
        self.call(
            NativeFn::SetEnabledFlags,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&joined)],
        )
    }

    pub fn get_enum_options(&mut self, id: Handle, path: &str) -> XEditResult<Vec<String>> {
        let path = to_wide(path);
        let text: String =
            self.fetch_dynamic(NativeFn::GetEnumOptions, vec![NativeArg::Handle(id), NativeArg::Str(&path)])?;
        Ok(split_lines(&text))
    }

    pub fn signature_from_name(&mut self, name: &str) -> XEditResult<String> {
        let name = to_wide(name);
        self.fetch_dynamic(NativeFn::SignatureFromName, vec![NativeArg::Str(&name)])
    }

    pub fn name_from_signature(&mut self, signature: &str) -> XEditResult<String> {
        let signature = to_wide(signature);
        self.fetch_dynamic(NativeFn::NameFromSignature, vec![NativeArg::Str(&signature)])
    }

    pub fn try_name_from_signature(&mut self, signature: &str) -> XEditResult<Option<String>> {
        let signature = to_wide(signature);
        self.fetch_dynamic_optional(NativeFn::NameFromSignature, vec![NativeArg::Str(&signature)])
    }
}
