//! One arm per catalog entry.

use xedit_core::{ElementFlags, ElementType, GameMode, LoaderState, ValueType, form_id_to_string};

use super::args::{Args, OrRefuse, Outcome, refuse};
use super::state::{State, checksum, copy_units};
use super::tree::{NodeId, ROOT, format_float};
use crate::catalog::NativeFn;
use crate::strings::split_lines;

const SIGNATURE_NAMES: &[(&str, &str)] = &[
    ("ARMO", "Armor"),
    ("ARMA", "Armor Addon"),
    ("GLOB", "Global"),
    ("REFR", "Placed Object"),
    ("HDPT", "Head Part"),
    ("RACE", "Race"),
    ("CELL", "Cell"),
    ("NPC_", "Non-Player Character (Actor)"),
    ("NAVM", "Navigation Mesh"),
    ("KYWD", "Keyword"),
    ("TES4", "Main File Header"),
];

fn game(code: i32) -> Outcome<GameMode> {
    GameMode::ALL
        .into_iter()
        .find(|g| g.code() == code)
        .or_refuse(|| format!("Invalid game mode: {code}"))
}

impl State {
    pub(crate) fn handle(&mut self, func: NativeFn, a: &mut Args<'_, '_>) -> Outcome {
        use NativeFn as F;

        match func {
            // meta
            F::InitXEdit => {
                self.initialized = true;
                self.messages.push("XEditLib initialized".to_string());
            }
            F::CloseXEdit => {
                self.initialized = false;
                self.release_all();
            }
            F::GetResultString => self.fill_text(func, a)?,
            F::GetResultArray => self.fill_array(func, a)?,
            F::GetResultBytes => return refuse("No byte result is staged"),
            F::GetGlobal => {
                let key = a.text(0)?;
                let value = self.global(&key).or_refuse(|| format!("Unknown global: {key}"))?;
                self.stage_text(a, value)?;
            }
            F::GetGlobals => {
                let mut keys: Vec<String> = self.globals.iter().map(|(k, _)| k.clone()).collect();
                keys.push("FileCount".to_string());
                let text = keys
                    .iter()
                    .filter_map(|k| self.global(k).map(|v| format!("{k}={v}")))
                    .collect::<Vec<_>>()
                    .join("\r\n");
                self.stage_text(a, text)?;
            }
            F::SetSortMode => {}
            F::Release => {
                let handle = a.handle(0)?;
                if handle == 0 {
                    return refuse("Cannot release the root handle");
                }
                if self.handles.remove(&handle).is_none() {
                    return refuse(format!("Failed to release handle: {handle}"));
                }
                self.free.insert(handle);
                self.released.push(handle);
            }
            F::ResetStore => self.release_all(),

            // messages
            F::GetMessagesLength => {
                let len = self.messages_text().encode_utf16().count();
                a.put_integer(0, len as i32)?;
            }
            F::GetMessages => {
                let units: Vec<u16> = self.messages_text().encode_utf16().collect();
                copy_units(a, &units)?;
            }
            F::ClearMessages => self.messages.clear(),
            F::GetExceptionMessageLength | F::GetExceptionStackLength => {
                let len = self.exception_part(func == F::GetExceptionStackLength).encode_utf16().count();
                a.put_integer(0, len as i32)?;
            }
            F::GetExceptionMessage | F::GetExceptionStack => {
                let units: Vec<u16> = self.exception_part(func == F::GetExceptionStack).encode_utf16().collect();
                copy_units(a, &units)?;
            }

            // setup
            F::GetGamePath => {
                let mode = game(a.integer(0)?)?;
                let path = self
                    .game_path
                    .clone()
                    .unwrap_or_else(|| format!("C:\\Games\\{}\\", mode.name()));
                self.stage_text(a, path)?;
            }
            F::SetGamePath => self.game_path = Some(a.text(0)?),
            F::GetGameLanguage => {
                game(a.integer(0)?)?;
                let language = self.language.clone().unwrap_or_else(|| "English".to_string());
                self.stage_text(a, language)?;
            }
            F::SetLanguage => self.language = Some(a.text(0)?),
            F::SetBackupPath => self.backup_path = Some(a.text(0)?),
            F::SetGameMode => {
                if !self.initialized {
                    return refuse("XEditLib is not initialized");
                }
                if self.game_mode.is_some() {
                    return refuse("Game mode already set");
                }
                let mode = game(a.integer(0)?)?;
                self.game_mode = Some(mode.code());
            }
            F::GetLoadOrder | F::GetActivePlugins => {
                let text = self.installed.join("\r\n");
                self.stage_text(a, text)?;
            }
            F::LoadPlugins => {
                if self.game_mode.is_none() {
                    return refuse("Game mode must be set before loading plugins");
                }
                let names = split_lines(&a.text(0)?);
                self.loader = LoaderState::Active;
                self.loader_polls = 1;
                for name in names {
                    if !self.load_named(&name) {
                        self.messages.push(format!("Failed to load {name}"));
                        self.loader = LoaderState::Error;
                    }
                }
            }
            F::LoadPlugin => {
                let name = a.text(0)?;
                if !self.load_named(&name) {
                    return refuse(format!("Failed to load {name}"));
                }
            }
            F::BuildReferences => {
                self.node(a.handle(0)?)?;
            }
            F::GetLoaderStatus => {
                if self.loader == LoaderState::Active {
                    if self.loader_polls == 0 {
                        self.loader = LoaderState::Done;
                    } else {
                        self.loader_polls -= 1;
                    }
                }
                a.put_byte(0, self.loader.into())?;
            }
            F::UnloadPlugin => {
                let file = self.file(a.handle(0)?)?;
                self.tree.remove(file);
            }

            // files
            F::AddFile => {
                let name = a.text(0)?;
                if self.file_named(&name).is_some() {
                    return refuse(format!("File with name {name} already exists"));
                }
                let file = self.add_plugin(&name);
                let handle = self.issue(file);
                a.put_cardinal(1, handle)?;
            }
            F::FileByIndex | F::FileByLoadOrder => {
                let index = a.integer(0)?;
                let file = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.files().get(i).copied())
                    .or_refuse(|| format!("No file at index {index}"))?;
                let handle = self.issue(file);
                a.put_cardinal(1, handle)?;
            }
            F::FileByName => {
                let name = a.text(0)?;
                let file = self.file_named(&name).or_refuse(|| format!("Failed to find file {name}"))?;
                let handle = self.issue(file);
                a.put_cardinal(1, handle)?;
            }
            F::FileByAuthor => {
                let author = a.text(0)?;
                let file = self
                    .files()
                    .into_iter()
                    .find(|&f| self.child_value(f, "File Header\\CNAM").as_deref() == Some(author.as_str()))
                    .or_refuse(|| format!("Failed to find file with author {author}"))?;
                let handle = self.issue(file);
                a.put_cardinal(1, handle)?;
            }
            F::NukeFile => {
                let file = self.file(a.handle(0)?)?;
                let header = self.header(file);
                for child in self.tree.children(file).to_vec() {
                    if Some(child) != header {
                        self.tree.remove(child);
                    }
                }
                self.tree.mark_modified(file);
            }
            F::RenameFile => {
                let file = self.file(a.handle(0)?)?;
                let name = a.text(1)?;
                if let Some(node) = self.tree.get_mut(file) {
                    node.spec.name = name;
                }
            }
            F::SaveFile => {
                let file = self.file(a.handle(0)?)?;
                let name = self.file_name(file);
                let path = Some(a.text(1)?).filter(|p| !p.is_empty()).unwrap_or_else(|| name.clone());
                self.saves.push((name, path));
                for node in self.tree.descendants(file).into_iter().chain([file]) {
                    if let Some(n) = self.tree.get_mut(node) {
                        n.spec.flags.remove(ElementFlags::MODIFIED);
                    }
                }
            }
            F::CRCHash => {
                let file = self.file(a.handle(0)?)?;
                let crc = checksum(&self.tree.to_json(file));
                self.stage_text(a, crc)?;
            }
            F::GetRecordCount => {
                let file = self.file(a.handle(0)?)?;
                a.put_integer(1, self.records_in(file).len() as i32)?;
            }
            F::GetOverrideRecordCount => {
                let file = self.file(a.handle(0)?)?;
                let count = self.records_in(file).into_iter().filter(|&r| self.is_override(r)).count();
                a.put_integer(1, count as i32)?;
            }
            F::GetFileLoadOrder => {
                let file = self.file(a.handle(0)?)?;
                a.put_integer(1, self.load_order(file).unwrap_or(0) as i32)?;
            }

            // masters
            F::CleanMasters => {
                let file = self.file(a.handle(0)?)?;
                let required = self.required_masters(file, file, true);
                if let Some(node) = self.tree.get_mut(file) {
                    node.masters.retain(|m| required.iter().any(|r| r.eq_ignore_ascii_case(m)));
                }
            }
            F::SortMasters => {
                let file = self.file(a.handle(0)?)?;
                let mut masters = self.masters(file);
                masters.sort_by_key(|m| self.file_named(m).and_then(|f| self.load_order(f)).unwrap_or(usize::MAX));
                if let Some(node) = self.tree.get_mut(file) {
                    node.masters = masters;
                }
            }
            F::AddMaster => {
                let file = self.file(a.handle(0)?)?;
                self.add_master(file, &a.text(1)?)?;
            }
            F::AddMasters => {
                let file = self.file(a.handle(0)?)?;
                for name in split_lines(&a.text(1)?) {
                    self.add_master(file, &name)?;
                }
            }
            F::AddRequiredMasters => {
                let record = self.element(a.handle(0)?)?;
                let file = self.file(a.handle(1)?)?;
                let as_new = a.boolean(2)?;
                for name in self.required_masters(record, file, !as_new) {
                    self.add_master(file, &name)?;
                }
            }
            F::GetMasters => {
                let file = self.file(a.handle(0)?)?;
                let masters = self.masters(file).iter().filter_map(|m| self.file_named(m)).collect();
                self.stage_nodes(a, masters)?;
            }
            F::GetRequiredBy => {
                let file = self.file(a.handle(0)?)?;
                let name = self.file_name(file);
                let dependents = self.files().into_iter().filter(|&f| self.has_master(f, &name)).collect();
                self.stage_nodes(a, dependents)?;
            }
            F::GetMasterNames => {
                let file = self.file(a.handle(0)?)?;
                let text = self.masters(file).join("\r\n");
                self.stage_text(a, text)?;
            }

            // elements
            F::HasElement => {
                let base = self.node(a.handle(0)?)?;
                let found = self.tree.resolve(base, &a.text(1)?).is_some();
                a.put_bool(2, found)?;
            }
            F::GetElement => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let handle = self.issue(node);
                a.put_cardinal(2, handle)?;
            }
            F::AddElement => {
                let base = self.node(a.handle(0)?)?;
                let node = self.add_path(base, &a.text(1)?)?;
                let handle = self.issue(node);
                a.put_cardinal(2, handle)?;
            }
            F::AddElementValue => {
                let base = self.node(a.handle(0)?)?;
                let node = self.add_path(base, &a.text(1)?)?;
                self.set_value(node, &a.text(2)?)?;
                let handle = self.issue(node);
                a.put_cardinal(3, handle)?;
            }
            F::RemoveElement => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                if node == ROOT {
                    return refuse("Cannot remove the root");
                }
                self.remove(node)?;
            }
            F::RemoveElementOrParent => {
                let node = self.element(a.handle(0)?)?;
                let target = match self.tree.get(node) {
                    Some(n) if n.has(ElementFlags::REMOVABLE) => node,
                    Some(n) => n.parent.filter(|&p| p != ROOT).or_refuse(|| "Element cannot be removed".to_string())?,
                    None => return refuse("Element no longer exists"),
                };
                self.remove(target)?;
            }
            F::SetElement => {
                let target = self.element(a.handle(0)?)?;
                let source = self.element(a.handle(1)?)?;
                let spec = self.tree.snapshot(source).or_refuse(|| "Source no longer exists".to_string())?;
                if spec.children.is_empty() {
                    self.set_value(target, &spec.value)?;
                } else {
                    for child in self.tree.children(target).to_vec() {
                        self.tree.remove(child);
                    }
                    for child in spec.children {
                        self.tree.insert(target, child, None);
                    }
                    self.tree.mark_modified(target);
                }
            }
            F::GetElements => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let mut children = self.tree.children(node).to_vec();
                if a.boolean(2)? {
                    children.sort_by_key(|&c| self.tree.sort_key(c));
                }
                self.stage_nodes(a, children)?;
            }
            F::GetAddList => {
                let node = self.element(a.handle(0)?)?;
                let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
                let names: Vec<String> = n
                    .spec
                    .optional
                    .iter()
                    .filter(|o| self.tree.resolve(node, &o.name).is_none())
                    .map(|o| o.signature.clone().unwrap_or_else(|| o.name.clone()))
                    .collect();
                self.stage_text(a, names.join("\r\n"))?;
            }
            F::GetLinksTo => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let target = self.link_target(node)?;
                let handle = self.issue(target);
                a.put_cardinal(2, handle)?;
            }
            F::SetLinksTo => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let target = self.record(a.handle(2)?)?;
                let form_id = self.form_id(target).unwrap_or(0);
                if self.tree.get(node).is_none_or(|n| n.spec.value_type != ValueType::Reference) {
                    return refuse("Element is not a reference");
                }
                self.set_value(node, &form_id_to_string(form_id))?;
            }
            F::GetElementIndex => {
                let node = self.element(a.handle(0)?)?;
                a.put_integer(1, self.tree.index_in_parent(node).unwrap_or(0) as i32)?;
            }
            F::GetContainer => {
                let node = self.element(a.handle(0)?)?;
                let parent = self
                    .tree
                    .parent(node)
                    .filter(|&p| p != ROOT)
                    .or_refuse(|| "Element has no container".to_string())?;
                let handle = self.issue(parent);
                a.put_cardinal(1, handle)?;
            }
            F::GetElementFile | F::GetElementGroup | F::GetElementRecord => {
                let node = self.element(a.handle(0)?)?;
                let kind = match func {
                    F::GetElementFile => ElementType::File,
                    F::GetElementGroup => ElementType::GroupRecord,
                    _ => ElementType::MainRecord,
                };
                let found = self
                    .tree
                    .ancestor(node, kind)
                    .or_refuse(|| format!("Element has no enclosing {kind:?}"))?;
                let handle = self.issue(found);
                a.put_cardinal(1, handle)?;
            }
            F::ElementCount => {
                let node = self.node(a.handle(0)?)?;
                a.put_integer(1, self.tree.children(node).len() as i32)?;
            }
            F::ElementEquals => {
                let same = self.node(a.handle(0)?)? == self.node(a.handle(1)?)?;
                a.put_bool(2, same)?;
            }
            F::ElementMatches => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let matches = self.value_matches(node, &a.text(2)?);
                a.put_bool(3, matches)?;
            }
            F::HasArrayItem => {
                let array = self.array(a.handle(0)?, &a.text(1)?)?;
                let found = self.find_item(array, &a.text(2)?, &a.text(3)?).is_some();
                a.put_bool(4, found)?;
            }
            F::GetArrayItem => {
                let array = self.array(a.handle(0)?, &a.text(1)?)?;
                let value = a.text(3)?;
                let item = self
                    .find_item(array, &a.text(2)?, &value)
                    .or_refuse(|| format!("Could not find array item with value {value}"))?;
                let handle = self.issue(item);
                a.put_cardinal(4, handle)?;
            }
            F::AddArrayItem => {
                let array = self.array(a.handle(0)?, &a.text(1)?)?;
                let item = self.add_path(array, ".")?;
                let (subpath, value) = (a.text(2)?, a.text(3)?);
                if !(subpath.is_empty() && value.is_empty()) {
                    let target = self
                        .tree
                        .resolve(item, &subpath)
                        .or_refuse(|| format!("Failed to resolve element at path: {subpath}"))?;
                    self.set_value(target, &value)?;
                }
                let handle = self.issue(item);
                a.put_cardinal(4, handle)?;
            }
            F::RemoveArrayItem => {
                let array = self.array(a.handle(0)?, &a.text(1)?)?;
                let value = a.text(3)?;
                let item = self
                    .find_item(array, &a.text(2)?, &value)
                    .or_refuse(|| format!("Could not find array item with value {value}"))?;
                self.tree.remove(item);
                self.tree.mark_modified(array);
            }
            F::MoveArrayItem => {
                let item = self.element(a.handle(0)?)?;
                let index = a.integer(1)?;
                let array = self.tree.parent(item).or_refuse(|| "Element has no container".to_string())?;
                let node = self.tree.get(array).or_refuse(|| "Container no longer exists".to_string())?;
                if !node.is_array() {
                    return refuse("Element is not an array item");
                }
                if node.has(ElementFlags::SORTED) {
                    return refuse("Cannot move elements in sorted arrays");
                }
                let len = node.children.len();
                let index = usize::try_from(index)
                    .ok()
                    .filter(|&i| i < len)
                    .or_refuse(|| format!("Index {index} is out of bounds"))?;
                if let Some(node) = self.tree.get_mut(array) {
                    node.children.retain(|&c| c != item);
                    node.children.insert(index, item);
                }
                self.tree.mark_modified(array);
            }
            F::CopyElement => {
                let source = self.record(a.handle(0)?)?;
                let file = self.file(a.handle(1)?)?;
                let as_new = a.boolean(2)?;
                let copied = self.copy_record(source, file, as_new)?;
                let handle = self.issue(copied);
                a.put_cardinal(3, handle)?;
            }
            F::GetIsModified | F::GetIsEditable | F::GetIsRemoveable | F::GetCanAdd | F::IsSorted | F::IsFixed => {
                let node = self.element(a.handle(0)?)?;
                let flag = match func {
                    F::GetIsModified => ElementFlags::MODIFIED,
                    F::GetIsEditable => ElementFlags::EDITABLE,
                    F::GetIsRemoveable => ElementFlags::REMOVABLE,
                    F::GetCanAdd => ElementFlags::CAN_ADD,
                    F::IsSorted => ElementFlags::SORTED,
                    _ => ElementFlags::FIXED,
                };
                let set = self.tree.get(node).is_some_and(|n| n.has(flag));
                a.put_bool(1, set)?;
            }
            F::SetIsEditable => {
                let node = self.element(a.handle(0)?)?;
                let editable = a.boolean(1)?;
                if let Some(n) = self.tree.get_mut(node) {
                    n.spec.flags.set(ElementFlags::EDITABLE, editable);
                }
            }
            F::SortKey => {
                let node = self.element(a.handle(0)?)?;
                let key = self.tree.sort_key(node);
                self.stage_text(a, key)?;
            }
            F::ElementType | F::DefType | F::SmashType | F::ValueType => {
                let node = self.element(a.handle(0)?)?;
                let spec = &self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?.spec;
                let code: u8 = match func {
                    F::ElementType => spec.element_type.into(),
                    F::DefType => spec.def_type.into(),
                    F::SmashType => spec.smash_type.into(),
                    _ => spec.value_type.into(),
                };
                a.put_byte(1, code)?;
            }

            // serialization
            F::ElementToJson => {
                let node = self.node(a.handle(0)?)?;
                let json = self.tree.to_json(node);
                self.stage_text(a, json)?;
            }
            F::ElementFromJson => return refuse("JSON import is not supported"),

            // element values
            F::Name | F::LongName | F::DisplayName => {
                let node = self.element(a.handle(0)?)?;
                let text = match func {
                    F::Name => self.name_of(node),
                    F::LongName => self.long_name_of(node),
                    _ => self.display_name_of(node),
                };
                self.stage_text(a, text)?;
            }
            F::Path => {
                let node = self.element(a.handle(0)?)?;
                let path = self.tree.path(node, a.boolean(1)?, a.boolean(2)?);
                self.stage_text(a, path)?;
            }
            F::Signature => {
                let node = self.element(a.handle(0)?)?;
                let signature = self
                    .tree
                    .get(node)
                    .and_then(|n| n.spec.signature.clone())
                    .or_refuse(|| "Element does not have a signature".to_string())?;
                self.stage_text(a, signature)?;
            }
            F::GetValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let value = self.value_of(node);
                self.stage_text(a, value)?;
            }
            F::SetValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                self.set_value(node, &a.text(2)?)?;
            }
            F::GetIntValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                a.put_integer(2, self.int_of(node)? as i32)?;
            }
            F::GetUIntValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                a.put_cardinal(2, self.int_of(node)? as u32)?;
            }
            F::SetIntValue | F::SetUIntValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let value = match func {
                    F::SetIntValue => i64::from(a.integer(2)?),
                    _ => i64::from(a.cardinal(2)?),
                };
                let text = self.int_text(node, value)?;
                self.set_value(node, &text)?;
            }
            F::GetFloatValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let value = self
                    .value_of(node)
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .or_refuse(|| "Element does not hold a number".to_string())?;
                a.put_double(2, value)?;
            }
            F::SetFloatValue => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                if !self.tree.get(node).is_some_and(|n| n.is_numeric()) {
                    return refuse("Element does not hold a number");
                }
                self.set_value(node, &format_float(a.double(2)?))?;
            }
            F::GetFlag => {
                let node = self.flags_node(a.handle(0)?, &a.text(1)?, &a.text(2)?)?;
                let name = a.text(2)?;
                let enabled = self.value_of(node).split(',').any(|f| f == name);
                a.put_bool(3, enabled)?;
            }
            F::SetFlag => {
                let name = a.text(2)?;
                let node = self.flags_node(a.handle(0)?, &a.text(1)?, &name)?;
                let mut enabled: Vec<String> = crate::strings::split_commas(&self.value_of(node));
                enabled.retain(|f| *f != name);
                if a.boolean(3)? {
                    enabled.push(name);
                }
                self.set_value(node, &enabled.join(","))?;
            }
            F::GetAllFlags | F::GetEnabledFlags => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
                if n.spec.value_type != ValueType::Flags {
                    return refuse("Element does not have flags");
                }
                let text = match func {
                    F::GetAllFlags => n.spec.flag_names.join(","),
                    _ => n.spec.value.clone(),
                };
                self.stage_text(a, text)?;
            }
            F::SetEnabledFlags => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                if self.tree.get(node).is_none_or(|n| n.spec.value_type != ValueType::Flags) {
                    return refuse("Element does not have flags");
                }
                self.set_value(node, &a.text(2)?)?;
            }
            F::GetEnumOptions => {
                let node = self.resolve(a.handle(0)?, &a.text(1)?)?;
                let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
                if n.spec.value_type != ValueType::Enum {
                    return refuse("Element is not an enumeration");
                }
                let text = n.spec.enum_options.join("\r\n");
                self.stage_text(a, text)?;
            }
            F::SignatureFromName => {
                let name = a.text(0)?;
                let signature = SIGNATURE_NAMES
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(s, _)| *s)
                    .or_refuse(|| format!("Unknown record name: {name}"))?;
                self.stage_text(a, signature)?;
            }
            F::NameFromSignature => {
                let signature = a.text(0)?;
                let name = SIGNATURE_NAMES
                    .iter()
                    .find(|(s, _)| *s == signature)
                    .map(|(_, n)| *n)
                    .or_refuse(|| format!("Unknown signature: {signature}"))?;
                self.stage_text(a, name)?;
            }

            // records
            F::GetFormID => {
                let node = self.element(a.handle(0)?)?;
                let form_id = self.form_id(node).or_refuse(|| "Element is not a record".to_string())?;
                a.put_cardinal(1, form_id)?;
            }
            F::SetFormID => {
                let record = self.record(a.handle(0)?)?;
                let form_id = a.cardinal(1)?;
                let old = self.form_id(record).unwrap_or(0);
                if let Some(n) = self.tree.get_mut(record) {
                    n.form_id = Some(form_id);
                }
                self.tree.mark_modified(record);
                if a.boolean(3)? {
                    self.retarget_references(old, form_id);
                }
            }
            F::GetRecord => {
                let scope = self.node(a.handle(0)?)?;
                let form_id = a.cardinal(1)?;
                let search_masters = a.boolean(2)?;
                let record = self
                    .find_record(scope, form_id, search_masters)
                    .or_refuse(|| format!("Failed to find record {}", form_id_to_string(form_id)))?;
                let handle = self.issue(record);
                a.put_cardinal(3, handle)?;
            }
            F::GetRecords => {
                let scope = self.node(a.handle(0)?)?;
                let search = a.text(1)?;
                let include_overrides = a.boolean(2)?;
                let signatures = crate::strings::split_commas(&search);
                let records = self
                    .records_in(scope)
                    .into_iter()
                    .filter(|&r| include_overrides || !self.is_override(r))
                    .filter(|&r| {
                        signatures.is_empty()
                            || self
                                .tree
                                .get(r)
                                .and_then(|n| n.spec.signature.as_ref())
                                .is_some_and(|s| signatures.contains(s))
                    })
                    .collect();
                self.stage_nodes(a, records)?;
            }
            F::GetOverrides => {
                let record = self.record(a.handle(0)?)?;
                let versions = self.versions(self.form_id(record).unwrap_or(0));
                let overrides = versions.into_iter().skip(1).collect();
                self.stage_nodes(a, overrides)?;
            }
            F::GetMasterRecord | F::GetWinningOverride => {
                let record = self.record(a.handle(0)?)?;
                let versions = self.versions(self.form_id(record).unwrap_or(0));
                let found = match func {
                    F::GetMasterRecord => versions.first(),
                    _ => versions.last(),
                }
                .copied()
                .unwrap_or(record);
                let handle = self.issue(found);
                a.put_cardinal(1, handle)?;
            }
            F::GetReferencedBy => {
                let record = self.record(a.handle(0)?)?;
                let form_id = self.form_id(record).unwrap_or(0);
                let referrers = self
                    .records_in(ROOT)
                    .into_iter()
                    .filter(|&r| r != record && self.references_in(r).contains(&form_id))
                    .collect();
                self.stage_nodes(a, referrers)?;
            }
            F::IsMaster | F::IsInjected | F::IsOverride | F::IsWinningOverride => {
                let record = self.record(a.handle(0)?)?;
                let answer = match func {
                    F::IsMaster => !self.is_override(record),
                    F::IsInjected => false,
                    F::IsOverride => self.is_override(record),
                    _ => self.winning(self.form_id(record).unwrap_or(0)) == Some(record),
                };
                a.put_bool(1, answer)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn global(&self, key: &str) -> Option<String> {
        match key {
            "FileCount" => Some(self.files().len().to_string()),
            _ => self.globals.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()),
        }
    }

    fn exception_part(&self, stack: bool) -> String {
        match &self.exception {
            Some((message, trace)) => (if stack { trace } else { message }).clone(),
            None => String::new(),
        }
    }

    /// Add `name` to the loaded files if it is installed.
    fn load_named(&mut self, name: &str) -> bool {
        if self.file_named(name).is_some() {
            return true;
        }
        if !self.installed.iter().any(|i| i.eq_ignore_ascii_case(name)) {
            return false;
        }
        self.add_plugin(name);
        true
    }

    fn flags_node(&self, handle: u32, path: &str, flag: &str) -> Outcome<NodeId> {
        let node = self.resolve(handle, path)?;
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        if n.spec.value_type != ValueType::Flags {
            return refuse("Element does not have flags");
        }
        if !n.spec.flag_names.iter().any(|f| f == flag) {
            return refuse(format!("Flag {flag} not found"));
        }
        Ok(node)
    }

    fn link_target(&self, node: NodeId) -> Outcome<NodeId> {
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        if n.spec.value_type != ValueType::Reference {
            return refuse(format!("{} is not a reference", n.spec.name));
        }
        let form_id = u32::from_str_radix(n.spec.value.trim(), 16).unwrap_or(0);
        if form_id == 0 {
            return refuse("Reference is NULL");
        }
        self.winning(form_id)
            .or_refuse(|| format!("Failed to resolve reference {}", form_id_to_string(form_id)))
    }

    fn find_record(&self, scope: NodeId, form_id: u32, search_masters: bool) -> Option<NodeId> {
        if scope == ROOT {
            return self.winning(form_id);
        }
        let file = self.tree.ancestor(scope, ElementType::File)?;
        let local = self
            .records_in(file)
            .into_iter()
            .find(|&r| self.form_id(r) == Some(form_id));
        if local.is_some() || !search_masters {
            return local;
        }
        self.masters(file)
            .iter()
            .filter_map(|m| self.file_named(m))
            .find_map(|m| self.records_in(m).into_iter().find(|&r| self.form_id(r) == Some(form_id)))
    }

    fn copy_record(&mut self, source: NodeId, file: NodeId, as_new: bool) -> Outcome<NodeId> {
        let spec = self.tree.snapshot(source).or_refuse(|| "Source no longer exists".to_string())?;
        let signature = spec.signature.clone().unwrap_or_default();
        let form_id = if as_new {
            self.next_local_id(file)
        } else {
            let form_id = self.form_id(source).unwrap_or(0);
            if self.records_in(file).into_iter().any(|r| self.form_id(r) == Some(form_id)) {
                return refuse(format!("{} already has an override of {}", self.file_name(file), form_id_to_string(form_id)));
            }
            form_id
        };
        for name in self.required_masters(source, file, !as_new) {
            if !self.has_master(file, &name) {
                return refuse(format!("{} requires master {name}", self.file_name(file)));
            }
        }
        let group = self.group(file, &signature);
        let copied = self.tree.insert(group, spec, None);
        if let Some(n) = self.tree.get_mut(copied) {
            n.form_id = Some(form_id);
        }
        self.tree.mark_modified(copied);
        Ok(copied)
    }

    fn retarget_references(&mut self, old: u32, new: u32) {
        let old_text = form_id_to_string(old);
        for node in self.tree.descendants(ROOT) {
            if let Some(n) = self.tree.get_mut(node)
                && n.spec.value_type == ValueType::Reference
                && n.spec.value.eq_ignore_ascii_case(&old_text)
            {
                n.spec.value = form_id_to_string(new);
            }
        }
    }
}
