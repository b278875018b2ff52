use xedit_core::{Handle, XEditResult};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::{join_lines, split_lines, to_wide};

impl Bridge {
    /// Drop masters no record in the file references.
    pub fn clean_masters(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::CleanMasters, vec![NativeArg::Handle(id)])
    }

    /// Reorder masters to follow the global load order.
    pub fn sort_masters(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::SortMasters, vec![NativeArg::Handle(id)])
    }

    pub fn add_master(&mut self, id: Handle, master_name: &str) -> XEditResult<()> {
        let master_name = to_wide(master_name);
        self.call(
            NativeFn::AddMaster,
            vec![NativeArg::Handle(id), NativeArg::Str(&master_name)],
        )
    }

    pub fn add_masters<S: AsRef<str>>(&mut self, id: Handle, masters: &[S]) -> XEditResult<()> {
        let masters = to_wide(&join_lines(masters));
        self.call(
            NativeFn::AddMasters,
            vec![NativeArg::Handle(id), NativeArg::Str(&masters)],
        )
    }

    /// Add to `file` every master `record` needs.
    pub fn add_required_masters(&mut self, record: Handle, file: Handle, as_new: bool) -> XEditResult<()> {
        self.call(
            NativeFn::AddRequiredMasters,
            vec![
                NativeArg::Handle(record),
                NativeArg::Handle(file),
                NativeArg::Bool(as_new),
            ],
        )
    }

    pub fn get_masters(&mut self, id: Handle) -> XEditResult<Vec<Handle>> {
        self.fetch_dynamic(NativeFn::GetMasters, vec![NativeArg::Handle(id)])
    }

    /// Files that list `id` as a master.
    pub fn get_required_by(&mut self, id: Handle) -> XEditResult<Vec<Handle>> {
        self.fetch_dynamic(NativeFn::GetRequiredBy, vec![NativeArg::Handle(id)])
    }

    pub fn get_master_names(&mut self, id: Handle) -> XEditResult<Vec<String>> {
        let text: String = self.fetch_dynamic(NativeFn::GetMasterNames, vec![NativeArg::Handle(id)])?;
        Ok(split_lines(&text))
    }
}
