use xedit_core::{
    DefType, ElementDescriptor, ElementFlags, ElementType, Handle, SmashType, ValueType, XEditResult,
    decode_enum,
};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::{split_lines, to_wide};

impl Bridge {
    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn has_element(&mut self, id: Handle, path: &str) -> XEditResult<bool> {
        let path = to_wide(path);
        self.call_bool(NativeFn::HasElement, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn get_element(&mut self, id: Handle, path: &str) -> XEditResult<Handle> {
        let path = to_wide(path);
        self.call_handle(NativeFn::GetElement, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn try_get_element(&mut self, id: Handle, path: &str) -> XEditResult<Option<Handle>> {
        let path = to_wide(path);
        self.call_handle_optional(NativeFn::GetElement, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn get_elements(&mut self, id: Handle, path: &str, sort: bool, filter: bool) -> XEditResult<Vec<Handle>> {
        let path = to_wide(path);
        self.fetch_dynamic(
            NativeFn::GetElements,
            vec![
                NativeArg::Handle(id),
                NativeArg::Str(&path),
                NativeArg::Bool(sort),
                NativeArg::Bool(filter),
            ],
        )
    }

    /// Names of the children that may be added under `id`.
    pub fn get_add_list(&mut self, id: Handle) -> XEditResult<Vec<String>> {
        let text: String = self.fetch_dynamic(NativeFn::GetAddList, vec![NativeArg::Handle(id)])?;
        Ok(split_lines(&text))
    }

    pub fn get_links_to(&mut self, id: Handle, path: &str) -> XEditResult<Handle> {
        let path = to_wide(path);
        self.call_handle(NativeFn::GetLinksTo, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    /// Target of a reference, or `None` for null and unresolved links.
    pub fn try_get_links_to(&mut self, id: Handle, path: &str) -> XEditResult<Option<Handle>> {
        let path = to_wide(path);
        self.call_handle_optional(NativeFn::GetLinksTo, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn set_links_to(&mut self, id: Handle, path: &str, target: Handle) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(
            NativeFn::SetLinksTo,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Handle(target)],
        )
    }

    pub fn get_element_index(&mut self, id: Handle) -> XEditResult<i32> {
        self.call_out(NativeFn::GetElementIndex, vec![NativeArg::Handle(id)])
    }

    pub fn get_container(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetContainer, vec![NativeArg::Handle(id)])
    }

    pub fn try_get_container(&mut self, id: Handle) -> XEditResult<Option<Handle>> {
        self.call_handle_optional(NativeFn::GetContainer, vec![NativeArg::Handle(id)])
    }

    pub fn get_element_file(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetElementFile, vec![NativeArg::Handle(id)])
    }

    pub fn get_element_group(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetElementGroup, vec![NativeArg::Handle(id)])
    }

    pub fn get_element_record(&mut self, id: Handle) -> XEditResult<Handle> {
        self.call_handle(NativeFn::GetElementRecord, vec![NativeArg::Handle(id)])
    }

    pub fn element_count(&mut self, id: Handle) -> XEditResult<i32> {
        self.call_out(NativeFn::ElementCount, vec![NativeArg::Handle(id)])
    }

    pub fn element_equals(&mut self, id: Handle, other: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::ElementEquals, vec![NativeArg::Handle(id), NativeArg::Handle(other)])
    }

    pub fn element_matches(&mut self, id: Handle, path: &str, value: &str) -> XEditResult<bool> {
        let path = to_wide(path);
        let value = to_wide(value);
        self.call_bool(
            NativeFn::ElementMatches,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&value)],
        )
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn add_element(&mut self, id: Handle, path: &str) -> XEditResult<Handle> {
        let path = to_wide(path);
        self.call_handle(NativeFn::AddElement, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn add_element_value(&mut self, id: Handle, path: &str, value: &str) -> XEditResult<Handle> {
        let path = to_wide(path);
        let value = to_wide(value);
        self.call_handle(
            NativeFn::AddElementValue,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&value)],
        )
    }

    pub fn remove_element(&mut self, id: Handle, path: &str) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(NativeFn::RemoveElement, vec![NativeArg::Handle(id), NativeArg::Str(&path)])
    }

    pub fn remove_element_or_parent(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::RemoveElementOrParent, vec![NativeArg::Handle(id)])
    }

    /// Overwrite `id` with the contents of `source`.
    pub fn set_element(&mut self, id: Handle, source: Handle) -> XEditResult<()> {
        self.call(NativeFn::SetElement, vec![NativeArg::Handle(id), NativeArg::Handle(source)])
    }

    pub fn copy_element(&mut self, id: Handle, target: Handle, as_new: bool) -> XEditResult<Handle> {
        self.call_handle(
            NativeFn::CopyElement,
            vec![NativeArg::Handle(id), NativeArg::Handle(target), NativeArg::Bool(as_new)],
        )
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    fn array_item_args<'a>(id: Handle, path: &'a [u16], subpath: &'a [u16], value: &'a [u16]) -> Vec<NativeArg<'a>> {
        vec![
            NativeArg::Handle(id),
            NativeArg::Str(path),
            NativeArg::Str(subpath),
            NativeArg::Str(value),
        ]
    }

    pub fn has_array_item(&mut self, id: Handle, path: &str, subpath: &str, value: &str) -> XEditResult<bool> {
        let (path, subpath, value) = (to_wide(path), to_wide(subpath), to_wide(value));
        self.call_bool(NativeFn::HasArrayItem, Self::array_item_args(id, &path, &subpath, &value))
    }

    pub fn get_array_item(&mut self, id: Handle, path: &str, subpath: &str, value: &str) -> XEditResult<Handle> {
        let (path, subpath, value) = (to_wide(path), to_wide(subpath), to_wide(value));
        self.call_handle(NativeFn::GetArrayItem, Self::array_item_args(id, &path, &subpath, &value))
    }

    pub fn try_get_array_item(
        &mut self,
        id: Handle,
        path: &str,
        subpath: &str,
        value: &str,
    ) -> XEditResult<Option<Handle>> {
        let (path, subpath, value) = (to_wide(path), to_wide(subpath), to_wide(value));
        self.call_handle_optional(NativeFn::GetArrayItem, Self::array_item_args(id, &path, &subpath, &value))
    }

    pub fn add_array_item(&mut self, id: Handle, path: &str, subpath: &str, value: &str) -> XEditResult<Handle> {
        let (path, subpath, value) = (to_wide(path), to_wide(subpath), to_wide(value));
        self.call_handle(NativeFn::AddArrayItem, Self::array_item_args(id, &path, &subpath, &value))
    }

    pub fn remove_array_item(&mut self, id: Handle, path: &str, subpath: &str, value: &str) -> XEditResult<()> {
        let (path, subpath, value) = (to_wide(path), to_wide(subpath), to_wide(value));
        self.call(NativeFn::RemoveArrayItem, Self::array_item_args(id, &path, &subpath, &value))
    }

    pub fn move_array_item(&mut self, id: Handle, index: i32) -> XEditResult<()> {
        self.call(NativeFn::MoveArrayItem, vec![NativeArg::Handle(id), NativeArg::Integer(index)])
    }

    pub fn sort_key(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::SortKey, vec![NativeArg::Handle(id)])
    }

    // ========================================================================
    // Descriptor
    // ========================================================================

    pub fn get_is_modified(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::GetIsModified, vec![NativeArg::Handle(id)])
    }

    pub fn get_is_editable(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::GetIsEditable, vec![NativeArg::Handle(id)])
    }

    pub fn set_is_editable(&mut self, id: Handle, editable: bool) -> XEditResult<()> {
        self.call(NativeFn::SetIsEditable, vec![NativeArg::Handle(id), NativeArg::Bool(editable)])
    }

    pub fn get_is_removable(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::GetIsRemoveable, vec![NativeArg::Handle(id)])
    }

    pub fn get_can_add(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::GetCanAdd, vec![NativeArg::Handle(id)])
    }

    pub fn is_sorted(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsSorted, vec![NativeArg::Handle(id)])
    }

    pub fn is_fixed(&mut self, id: Handle) -> XEditResult<bool> {
        self.call_bool(NativeFn::IsFixed, vec![NativeArg::Handle(id)])
    }

    pub fn element_type(&mut self, id: Handle) -> XEditResult<ElementType> {
        let code: u8 = self.call_out(NativeFn::ElementType, vec![NativeArg::Handle(id)])?;
        decode_enum("ElementType", code)
    }

    pub fn def_type(&mut self, id: Handle) -> XEditResult<DefType> {
        let code: u8 = self.call_out(NativeFn::DefType, vec![NativeArg::Handle(id)])?;
        decode_enum("DefType", code)
    }

    pub fn smash_type(&mut self, id: Handle) -> XEditResult<SmashType> {
        let code: u8 = self.call_out(NativeFn::SmashType, vec![NativeArg::Handle(id)])?;
        decode_enum("SmashType", code)
    }

    pub fn value_type(&mut self, id: Handle) -> XEditResult<ValueType> {
        let code: u8 = self.call_out(NativeFn::ValueType, vec![NativeArg::Handle(id)])?;
        decode_enum("ValueType", code)
    }

    /// Query the full descriptor of `id`.
    ///
    /// The four type codes are required. Boolean properties the engine
    /// refuses to answer for this node read as unset.
    pub fn descriptor(&mut self, id: Handle) -> XEditResult<ElementDescriptor> {
        let element_type = self.element_type(id)?;
        let def_type = self.def_type(id)?;
        let value_type = self.value_type(id)?;
        let smash_type = self.smash_type(id)?;
        let signature = self.try_signature(id)?.and_then(|s| s.parse().ok());

        let mut flags = ElementFlags::empty();
        for (func, flag) in [
            (NativeFn::GetIsRemoveable, ElementFlags::REMOVABLE),
            (NativeFn::GetCanAdd, ElementFlags::CAN_ADD),
            (NativeFn::IsSorted, ElementFlags::SORTED),
            (NativeFn::IsFixed, ElementFlags::FIXED),
            (NativeFn::GetIsModified, ElementFlags::MODIFIED),
            (NativeFn::GetIsEditable, ElementFlags::EDITABLE),
        ] {
            let set = self.call_out_optional::<u16>(func, vec![NativeArg::Handle(id)])?;
            flags.set(flag, set.is_some_and(|v| v != 0));
        }

        Ok(ElementDescriptor {
            element_type,
            def_type,
            value_type,
            smash_type,
            signature,
            flags,
        })
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn element_to_json(&mut self, id: Handle) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::ElementToJson, vec![NativeArg::Handle(id)])
    }

    pub fn element_from_json(&mut self, id: Handle, path: &str, json: &str) -> XEditResult<()> {
        let path = to_wide(path);
        let json = to_wide(json);
        self.call(
            NativeFn::ElementFromJson,
            vec![NativeArg::Handle(id), NativeArg::Str(&path), NativeArg::Str(&json)],
        )
    }
}
