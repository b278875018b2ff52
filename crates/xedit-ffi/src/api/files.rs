use xedit_core::{Handle, XEditResult};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::to_wide;

impl Bridge {
    pub fn add_file(&mut self, filename: &str) -> XEditResult<Handle> {
        let filename = to_wide(filename);
        self.call_handle(NativeFn::AddFile, vec![NativeArg::Str(&filename)])
    }

    pub fn file_by_index(&mut self, index: i32) -> XEditResult<Handle> {
        self.call_handle(NativeFn::FileByIndex, vec![NativeArg::Integer(index)])
    }

    pub fn file_by_load_order(&mut self, load_order: i32) -> XEditResult<Handle> {
        self.call_handle(NativeFn::FileByLoadOrder, vec![NativeArg::Integer(load_order)])
    }

    pub fn file_by_name(&mut self, name: &str) -> XEditResult<Handle> {
        let name = to_wide(name);
        self.call_handle(NativeFn::FileByName, vec![NativeArg::Str(&name)])
    }

    pub fn try_file_by_name(&mut self, name: &str) -> XEditResult<Option<Handle>> {
        let name = to_wide(name);
        self.call_handle_optional(NativeFn::FileByName, vec![NativeArg::Str(&name)])
    }

    pub fn file_by_author(&mut self, author: &str) -> XEditResult<Handle> {
        let author = to_wide(author);
        self.call_handle(NativeFn::FileByAuthor, vec![NativeArg::Str(&author)])
    }

    /// Remove every record from the file.
    pub fn nuke_file(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::NukeFile, vec![NativeArg::Handle(id)])
    }

    pub fn rename_file(&mut self, id: Handle, filename: &str) -> XEditResult<()> {
        let filename = to_wide(filename);
        self.call(
            NativeFn::RenameFile,
            vec![NativeArg::Handle(id), NativeArg::Str(&filename)],
        )
    }

    /// Write the file. An empty `file_path` saves in place.
    pub fn save_file(&mut self, id: Handle, file_path: &str) -> XEditResult<()> {
        let file_path = to_wide(file_path);
        self.call(
            NativeFn::SaveFile,
            vec![NativeArg::Handle(id), NativeArg::Str(&file_path)],
        )
    }

    pub fn crc_hash(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::CRCHash, vec![NativeArg::Handle(id)])
    }

    pub fn get_record_count(&mut self, id: Handle) -> XEditResult<i32> {
        self.call_out(NativeFn::GetRecordCount, vec![NativeArg::Handle(id)])
    }

    pub fn get_override_record_count(&mut self, id: Handle) -> XEditResult<i32> {
        self.call_out(NativeFn::GetOverrideRecordCount, vec![NativeArg::Handle(id)])
    }

    pub fn get_file_load_order(&mut self, id: Handle) -> XEditResult<i32> {
        self.call_out(NativeFn::GetFileLoadOrder, vec![NativeArg::Handle(id)])
    }
}
