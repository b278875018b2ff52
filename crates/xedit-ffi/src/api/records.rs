use xedit_core::{Handle, XEditResult};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::to_wide;

impl Bridge {
    /// Form id of a record. `native` returns the id as stored in its file
    /// instead of the load-order-resolved one.
    pub fn get_form_id(&mut self, id: Handle, native: bool) -> XEditResult<u32> {
        let mut form_id = 0u32;
        self.invoke(
            NativeFn::GetFormID,
            &mut [
                NativeArg::Handle(id),
                NativeArg::OutCardinal(&mut form_id),
                NativeArg::Bool(native),
            ],
        )?;
        Ok(form_id)
    }

    pub fn set_form_id(&mut self, id: Handle, form_id: u32, native: bool, fix_references: bool) -> XEditResult<()> {
        self.call(
            NativeFn::SetFormID,
            vec![
                NativeArg::Handle(id),
                NativeArg::Cardinal(form_id),
                NativeArg::Bool(native),
                NativeArg::Bool(fix_references),
            ],
        )
    }

    /// Look a record up by form id. `id` is a file, or the root to search all files.
    pub fn get_record(&mut self, id: Handle, form_id: u32, search_masters: bool) -> XEditResult<Handle> {
        self.call_handle(
            NativeFn::GetRecord,
            vec![
                NativeArg::Handle(id),
                NativeArg::Cardinal(form_id),
                NativeArg::Bool(search_masters),
            ],
        )
    }

    pub fn try_get_record(&mut self, id: Handle, form_id: u32, search_masters: bool) -> XEditResult<Option<Handle>> {
        self.call_handle_optional(
            NativeFn::GetRecord,
            vec![
                NativeArg::Handle(id),
                NativeArg::Cardinal(form_id),
                NativeArg::Bool(search_masters),
            ],
        )
    }

    /// Records under `id` whose signature is in the comma separated `search`.
    pub fn get_records(&mut self, id: Handle, search: &str, include_overrides: bool) -> XEditResult<Vec<Handle>> {
        let search = to_wide(search);
        self.fetch_dynamic(
            NativeFn::GetRecords,
            vec![
                NativeArg::Handle(id),
                NativeArg::Str(&search),
                NativeArg::Bool(include_overrides),
            ],
        )
    }

    pub fn get_overrides(&mut self, id: Handle) -> XEditResult<Vec<Handle>> {
        self.fetch_dynamic(NativeFn::GetOverrides, vec![NativeArg::Handle(id)])
    }

    pub fn get_master_record(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetMasterRecord, vec![NativeArg::Handle(id)])
    }

    pub fn get_winning_override(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetWinningOverride, vec![NativeArg::Handle(id)])
    }

    pub fn get_referenced_by(&mut self, id: Handle) -> XEditResult<Vec<Handle>> {
        self.fetch_dynamic(NativeFn::GetReferencedBy, vec![NativeArg::Handle(id)])
    }

    pub fn is_master(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsMaster, vec![NativeArg::Handle(id)])
    }

    pub fn is_injected(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsInjected, vec![NativeArg::Handle(id)])
    }

    pub fn is_override(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsOverride, vec![NativeArg::Handle(id)])
    }

    pub fn is_winning_override(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsWinningOverride, vec![NativeArg::Handle(id)])
    }
}
