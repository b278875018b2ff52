use rustc_hash::FxHashMap;
use xedit_core::{Handle, XEditResult};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::{parse_dict, to_wide};

impl Bridge {
    pub fn init_xedit(&mut self) -> XEditResult<()> {
        self.call(NativeFn::InitXEdit, vec![])
    }

    pub fn close_xedit(&mut self) -> XEditResult<()> {
        self.call(NativeFn::CloseXEdit, vec![])
    }

    pub fn get_global(&mut self, key: &str) -> XEditResult<String> {
        let key = to_wide(key);
        self.fetch_dynamic(NativeFn::GetGlobal, vec![NativeArg::Str(&key)])
    }

    /// All engine globals, parsed from `key=value` lines.
    pub fn get_globals(&mut self) -> XEditResult<FxHashMap<String, String>> {
        let text: String = self.fetch_dynamic(NativeFn::GetGlobals, vec![])?;
        Ok(parse_dict(&text))
    }

    pub fn set_sort_mode(&mut self, sort_by: u8, reverse: bool) -> XEditResult<()> {
        self.call(
            NativeFn::SetSortMode,
            vec![NativeArg::Byte(sort_by), NativeArg::Bool(reverse)],
        )
    }

    pub fn release(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::Release, vec![NativeArg::Handle(id)])
    }

    /// Release every handle the engine has issued.
    pub fn reset_store(&mut self) -> XEditResult<()> {
        self.call(NativeFn::ResetStore, vec![])
    }
}
