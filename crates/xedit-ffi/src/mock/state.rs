//! Engine-side state of the mock and the queries its handlers share.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use xedit_core::{
    DefType, ElementFlags, ElementType, LoaderState, SmashType, ValueType, bytes_to_hex, form_id_to_string,
    hex_to_bytes,
};

use super::FillRecord;
use super::args::{Args, Fault, OrRefuse, Outcome, refuse};
use super::tree::{NodeId, NodeSpec, ROOT, Tree, format_float};
use crate::catalog::NativeFn;
use crate::strings::split_commas;

/// Result staged by the first half of a two-call operation.
#[derive(Debug)]
pub(crate) enum Staged {
    Text(Vec<u16>),
    Array(Vec<u32>),
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) tree: Tree,
    pub(crate) handles: FxHashMap<u32, NodeId>,
    pub(crate) free: BTreeSet<u32>,
    pub(crate) next_handle: u32,
    pub(crate) staged: Option<Staged>,
    pub(crate) exception: Option<(String, String)>,
    pub(crate) messages: Vec<String>,
    pub(crate) calls: Vec<NativeFn>,
    pub(crate) fills: Vec<FillRecord>,
    pub(crate) released: Vec<u32>,
    pub(crate) injected: Vec<(NativeFn, String)>,
    pub(crate) globals: Vec<(String, String)>,
    pub(crate) installed: Vec<String>,
    pub(crate) game_mode: Option<i32>,
    pub(crate) game_path: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) backup_path: Option<String>,
    pub(crate) loader: LoaderState,
    pub(crate) loader_polls: u32,
    pub(crate) saves: Vec<(String, String)>,
    pub(crate) initialized: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            tree: Tree::default(),
            handles: FxHashMap::default(),
            free: BTreeSet::new(),
            next_handle: 0,
            staged: None,
            exception: None,
            messages: Vec::new(),
            calls: Vec::new(),
            fills: Vec::new(),
            released: Vec::new(),
            injected: Vec::new(),
            globals: vec![("Version".to_string(), "0.6.0".to_string())],
            installed: Vec::new(),
            game_mode: None,
            game_path: None,
            language: None,
            backup_path: None,
            loader: LoaderState::Inactive,
            loader_polls: 0,
            saves: Vec::new(),
            initialized: false,
        }
    }
}

pub(crate) const HEADER: &str = "File Header";
const RECORD_FLAGS: &[&str] = &["ESM", "Deleted", "Localized", "Persistent", "Initially Disabled", "Ignored"];
const FIRST_LOCAL_ID: u32 = 0x800;

impl State {
    // ========================================================================
    // Handles
    // ========================================================================

    /// Hand out a fresh handle for `node`, reusing the lowest released number.
    pub(crate) fn issue(&mut self, node: NodeId) -> u32 {
        if node == ROOT {
            return 0;
        }
        let handle = match self.free.pop_first() {
            Some(h) => h,
            None => {
                self.next_handle += 1;
                self.next_handle
            }
        };
        self.handles.insert(handle, node);
        handle
    }

    pub(crate) fn node(&self, handle: u32) -> Outcome<NodeId> {
        if handle == 0 {
            return Ok(ROOT);
        }
        match self.handles.get(&handle) {
            Some(&node) if self.tree.get(node).is_some() => Ok(node),
            Some(_) => refuse(format!("Element for handle {handle} has been removed")),
            None => refuse(format!("Failed to resolve handle: {handle}")),
        }
    }

    /// Non-root node behind `handle`.
    pub(crate) fn element(&self, handle: u32) -> Outcome<NodeId> {
        match self.node(handle)? {
            ROOT => refuse("The root handle is not an element"),
            node => Ok(node),
        }
    }

    pub(crate) fn resolve(&self, handle: u32, path: &str) -> Outcome<NodeId> {
        let base = self.node(handle)?;
        self.tree
            .resolve(base, path)
            .or_refuse(|| format!("Failed to resolve element at path: {path}"))
    }

    pub(crate) fn release_all(&mut self) {
        self.handles.clear();
        self.free.clear();
        self.next_handle = 0;
    }

    // ========================================================================
    // Staging
    // ========================================================================

    pub(crate) fn stage_text(&mut self, args: &mut Args<'_, '_>, text: impl AsRef<str>) -> Outcome {
        let units: Vec<u16> = text.as_ref().encode_utf16().collect();
        args.put_len(units.len())?;
        self.staged = Some(Staged::Text(units));
        Ok(())
    }

    pub(crate) fn stage_nodes(&mut self, args: &mut Args<'_, '_>, nodes: Vec<NodeId>) -> Outcome {
        let handles: Vec<u32> = nodes.into_iter().map(|n| self.issue(n)).collect();
        args.put_len(handles.len())?;
        self.staged = Some(Staged::Array(handles));
        Ok(())
    }

    pub(crate) fn fill_text(&mut self, func: NativeFn, args: &mut Args<'_, '_>) -> Outcome {
        let Some(Staged::Text(units)) = self.staged.take() else {
            return refuse("No string result is staged");
        };
        let (max_len, copied) = copy_units(args, &units)?;
        self.fills.push(FillRecord {
            func,
            staged: units.len(),
            max_len,
            copied,
        });
        Ok(())
    }

    pub(crate) fn fill_array(&mut self, func: NativeFn, args: &mut Args<'_, '_>) -> Outcome {
        let Some(Staged::Array(handles)) = self.staged.take() else {
            return refuse("No array result is staged");
        };
        let max_len = args.integer(1)?.max(0) as usize;
        let buf = args.cardinal_buf(0)?;
        let copied = handles.len().min(max_len).min(buf.len());
        buf[..copied].copy_from_slice(&handles[..copied]);
        self.fills.push(FillRecord {
            func,
            staged: handles.len(),
            max_len,
            copied,
        });
        Ok(())
    }

    // ========================================================================
    // Files and load order
    // ========================================================================

    pub(crate) fn files(&self) -> Vec<NodeId> {
        self.tree.children(ROOT).to_vec()
    }

    pub(crate) fn file_named(&self, name: &str) -> Option<NodeId> {
        self.files()
            .into_iter()
            .find(|&f| self.tree.get(f).is_some_and(|n| n.spec.name.eq_ignore_ascii_case(name)))
    }

    pub(crate) fn file(&self, handle: u32) -> Outcome<NodeId> {
        let node = self.element(handle)?;
        match self.tree.get(node) {
            Some(n) if n.is(ElementType::File) => Ok(node),
            _ => refuse("Element is not a file"),
        }
    }

    pub(crate) fn file_name(&self, file: NodeId) -> String {
        self.tree.get(file).map(|n| n.spec.name.clone()).unwrap_or_default()
    }

    pub(crate) fn load_order(&self, file: NodeId) -> Option<usize> {
        self.tree.children(ROOT).iter().position(|&f| f == file)
    }

    /// File that defines `form_id`, by its load-order byte.
    pub(crate) fn origin(&self, form_id: u32) -> Option<NodeId> {
        self.tree.children(ROOT).get((form_id >> 24) as usize).copied()
    }

    pub(crate) fn add_plugin(&mut self, name: &str) -> NodeId {
        let mut spec = NodeSpec::structure(name, Vec::new()).element_type(ElementType::File);
        spec.def_type = DefType::Record;
        spec.value_type = ValueType::Unknown;
        spec.smash_type = SmashType::Unknown;
        spec.signature = None;
        spec.flags = ElementFlags::EDITABLE | ElementFlags::CAN_ADD;
        let file = self.tree.insert(ROOT, spec, None);

        let mut header = record_spec("TES4", HEADER);
        header.children.push(NodeSpec::string("CNAM", ""));
        header.children.push(NodeSpec::string("SNAM", ""));
        header.flags.remove(ElementFlags::REMOVABLE);
        let header = self.tree.insert(file, header, None);
        if let Some(node) = self.tree.get_mut(header) {
            node.form_id = Some(0);
        }
        file
    }

    pub(crate) fn group(&mut self, file: NodeId, signature: &str) -> NodeId {
        if let Some(existing) = self.tree.children(file).iter().copied().find(|&c| {
            self.tree
                .get(c)
                .is_some_and(|n| n.is(ElementType::GroupRecord) && n.spec.signature.as_deref() == Some(signature))
        }) {
            return existing;
        }
        let mut spec = NodeSpec::structure(signature, Vec::new()).element_type(ElementType::GroupRecord);
        spec.def_type = DefType::Record;
        spec.value_type = ValueType::Unknown;
        spec.smash_type = SmashType::Unknown;
        spec.signature = Some(signature.to_string());
        self.tree.insert(file, spec, None)
    }

    pub(crate) fn add_record(&mut self, file: NodeId, signature: &str, form_id: u32, editor_id: &str) -> NodeId {
        let group = self.group(file, signature);
        let mut spec = record_spec(signature, editor_id);
        spec.children.insert(1, NodeSpec::string("EDID", editor_id));
        let record = self.tree.insert(group, spec, None);
        if let Some(node) = self.tree.get_mut(record) {
            node.form_id = Some(form_id);
        }
        record
    }

    pub(crate) fn header(&self, file: NodeId) -> Option<NodeId> {
        self.tree.resolve(file, HEADER)
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub(crate) fn is_record(&self, node: NodeId) -> bool {
        self.tree
            .get(node)
            .is_some_and(|n| n.is(ElementType::MainRecord) && n.spec.signature.as_deref() != Some("TES4"))
    }

    pub(crate) fn record(&self, handle: u32) -> Outcome<NodeId> {
        let node = self.element(handle)?;
        if self.is_record(node) {
            Ok(node)
        } else {
            refuse("Element is not a record")
        }
    }

    pub(crate) fn form_id(&self, node: NodeId) -> Option<u32> {
        self.tree.get(node).and_then(|n| n.form_id)
    }

    /// Records under `scope`, file header excluded.
    pub(crate) fn records_in(&self, scope: NodeId) -> Vec<NodeId> {
        self.tree
            .descendants(scope)
            .into_iter()
            .filter(|&d| self.is_record(d))
            .collect()
    }

    /// Whether `record` overrides a record first defined by another file.
    pub(crate) fn is_override(&self, record: NodeId) -> bool {
        let file = self.tree.ancestor(record, ElementType::File);
        match (self.form_id(record), file.and_then(|f| self.load_order(f))) {
            (Some(form_id), Some(lo)) => (form_id >> 24) as usize != lo,
            _ => false,
        }
    }

    /// Every version of `form_id`, in load order.
    pub(crate) fn versions(&self, form_id: u32) -> Vec<NodeId> {
        self.records_in(ROOT)
            .into_iter()
            .filter(|&r| self.form_id(r) == Some(form_id))
            .collect()
    }

    pub(crate) fn winning(&self, form_id: u32) -> Option<NodeId> {
        self.versions(form_id).last().copied()
    }

    /// Non-null form ids referenced anywhere under `scope`.
    pub(crate) fn references_in(&self, scope: NodeId) -> Vec<u32> {
        self.tree
            .descendants(scope)
            .into_iter()
            .filter_map(|d| self.tree.get(d))
            .filter(|n| n.spec.value_type == ValueType::Reference)
            .filter_map(|n| u32::from_str_radix(&n.spec.value, 16).ok())
            .filter(|&id| id != 0)
            .collect()
    }

    pub(crate) fn next_local_id(&self, file: NodeId) -> u32 {
        let lo = self.load_order(file).unwrap_or(0) as u32;
        let next = self
            .records_in(file)
            .into_iter()
            .filter_map(|r| self.form_id(r))
            .filter(|id| id >> 24 == lo)
            .map(|id| (id & 0x00FF_FFFF) + 1)
            .max()
            .unwrap_or(FIRST_LOCAL_ID);
        (lo << 24) | next.max(FIRST_LOCAL_ID)
    }

    // ========================================================================
    // Masters
    // ========================================================================

    /// Names of the files `scope` references, excluding `file` itself.
    pub(crate) fn required_masters(&self, scope: NodeId, file: NodeId, include_self: bool) -> Vec<String> {
        let mut ids = self.references_in(scope);
        if include_self {
            if self.is_record(scope) {
                ids.extend(self.form_id(scope));
            } else {
                ids.extend(self.records_in(scope).into_iter().filter_map(|r| self.form_id(r)));
            }
        }
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for id in ids {
            if let Some(origin) = self.origin(id)
                && origin != file
                && seen.insert(origin)
            {
                names.push(self.file_name(origin));
            }
        }
        names
    }

    pub(crate) fn add_master(&mut self, file: NodeId, name: &str) -> Outcome {
        let file_name = self.file_name(file);
        if file_name.eq_ignore_ascii_case(name) {
            return refuse(format!("Cannot add {name} as a master of itself"));
        }
        let masters = self.tree.get(file).map(|n| n.masters.clone()).unwrap_or_default();
        if masters.iter().any(|m| m.eq_ignore_ascii_case(name)) {
            return Ok(());
        }
        let master = self
            .file_named(name)
            .or_refuse(|| format!("Master file {name} is not loaded"))?;
        if self.load_order(master) > self.load_order(file) {
            return refuse(format!("Master {name} is loaded after {file_name}"));
        }
        let master_name = self.file_name(master);
        if let Some(node) = self.tree.get_mut(file) {
            node.masters.push(master_name);
        }
        if let Some(header) = self.header(file) {
            self.tree.mark_modified(header);
        }
        Ok(())
    }

    pub(crate) fn masters(&self, file: NodeId) -> Vec<String> {
        self.tree.get(file).map(|n| n.masters.clone()).unwrap_or_default()
    }

    pub(crate) fn has_master(&self, file: NodeId, name: &str) -> bool {
        self.masters(file).iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub(crate) fn value_of(&self, node: NodeId) -> String {
        match self.tree.get(node) {
            Some(n) if n.children.is_empty() => n.spec.value.clone(),
            _ => String::new(),
        }
    }

    pub(crate) fn child_value(&self, node: NodeId, path: &str) -> Option<String> {
        self.tree.resolve(node, path).map(|c| self.value_of(c))
    }

    /// Validate and store `value` on a leaf node.
    pub(crate) fn set_value(&mut self, node: NodeId, value: &str) -> Outcome {
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        if !n.children.is_empty() || !n.spec.def_type.is_value() {
            return refuse(format!("Cannot set the value of {}", n.spec.name));
        }
        if !n.has(ElementFlags::EDITABLE) {
            return refuse(format!("{} is not editable", n.spec.name));
        }
        let stored = match n.spec.value_type {
            ValueType::Reference => {
                let id = u32::from_str_radix(value.trim(), 16)
                    .map_err(|_| Fault::Engine(format!("{value} is not a valid FormID")))?;
                form_id_to_string(id)
            }
            ValueType::Enum => {
                if !n.spec.enum_options.iter().any(|o| o == value) {
                    return refuse(format!("{value} is not a valid option for {}", n.spec.name));
                }
                value.to_string()
            }
            ValueType::Flags => {
                let wanted = split_commas(value);
                if let Some(unknown) = wanted.iter().find(|w| !n.spec.flag_names.contains(*w)) {
                    return refuse(format!("Flag {unknown} not found"));
                }
                n.spec
                    .flag_names
                    .iter()
                    .filter(|f| wanted.contains(*f))
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(",")
            }
            ValueType::Bytes => {
                let bytes = hex_to_bytes(value).map_err(|e| Fault::Engine(e.to_string()))?;
                bytes_to_hex(&bytes)
            }
            _ if n.spec.def_type == DefType::Float => {
                let v: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| Fault::Engine(format!("{value} is not a valid float")))?;
                format_float(v)
            }
            _ if n.is_numeric() => {
                let v: i64 = value
                    .trim()
                    .parse()
                    .map_err(|_| Fault::Engine(format!("{value} is not a valid integer")))?;
                v.to_string()
            }
            _ => value.to_string(),
        };
        if let Some(n) = self.tree.get_mut(node) {
            n.spec.value = stored;
        }
        self.tree.mark_modified(node);
        self.tree.resort_enclosing(node);
        Ok(())
    }

    /// Integer view of a leaf: enum index, flag bits, form id or number.
    pub(crate) fn int_of(&self, node: NodeId) -> Outcome<i64> {
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        let value = n.spec.value.trim();
        let parsed = match n.spec.value_type {
            ValueType::Reference => u32::from_str_radix(value, 16).ok().map(i64::from),
            ValueType::Enum => n.spec.enum_options.iter().position(|o| o == value).map(|i| i as i64),
            ValueType::Flags => {
                let enabled = split_commas(value);
                Some(
                    n.spec
                        .flag_names
                        .iter()
                        .enumerate()
                        .filter(|(_, f)| enabled.contains(*f))
                        .fold(0i64, |acc, (bit, _)| acc | (1 << bit)),
                )
            }
            _ => value
                .parse::<i64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().map(|f| f as i64)),
        };
        parsed.or_refuse(|| format!("{} does not hold a number", n.spec.name))
    }

    /// Textual form of an integer written through `SetIntValue`.
    pub(crate) fn int_text(&self, node: NodeId, value: i64) -> Outcome<String> {
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        match n.spec.value_type {
            ValueType::Reference => Ok(form_id_to_string(value as u32)),
            ValueType::Enum => usize::try_from(value)
                .ok()
                .and_then(|i| n.spec.enum_options.get(i).cloned())
                .or_refuse(|| format!("{value} is out of range for {}", n.spec.name)),
            ValueType::Flags => Ok(n
                .spec
                .flag_names
                .iter()
                .enumerate()
                .filter(|(bit, _)| value & (1 << bit) != 0)
                .map(|(_, f)| f.clone())
                .collect::<Vec<_>>()
                .join(",")),
            _ if n.is_numeric() => Ok(value.to_string()),
            _ => refuse(format!("{} does not hold a number", n.spec.name)),
        }
    }

    /// Compare a leaf against a search value the way array lookups do.
    pub(crate) fn value_matches(&self, node: NodeId, value: &str) -> bool {
        let Some(n) = self.tree.get(node) else {
            return false;
        };
        let own = n.spec.value.trim();
        let value = value.trim();
        match n.spec.value_type {
            ValueType::Reference => {
                u32::from_str_radix(own, 16).ok().is_some_and(|a| u32::from_str_radix(value, 16).ok() == Some(a))
            }
            _ if n.is_numeric() => match (own.parse::<f64>(), value.parse::<f64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => own == value,
            },
            _ => own == value,
        }
    }

    /// Item of `array` whose `subpath` holds `value`.
    pub(crate) fn find_item(&self, array: NodeId, subpath: &str, value: &str) -> Option<NodeId> {
        self.tree.children(array).iter().copied().find(|&item| {
            self.tree
                .resolve(item, subpath)
                .is_some_and(|target| self.value_matches(target, value))
        })
    }

    pub(crate) fn array(&self, handle: u32, path: &str) -> Outcome<NodeId> {
        let node = self.resolve(handle, path)?;
        match self.tree.get(node) {
            Some(n) if n.is_array() => Ok(node),
            _ => refuse(format!("Element at {path} is not an array")),
        }
    }

    // ========================================================================
    // Structure edits
    // ========================================================================

    /// Walk `path` below `base`, creating missing elements the schema allows.
    pub(crate) fn add_path(&mut self, base: NodeId, path: &str) -> Outcome<NodeId> {
        let mut cur = base;
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            cur = self.add_segment(cur, segment)?;
        }
        self.tree.mark_modified(cur);
        Ok(cur)
    }

    fn add_segment(&mut self, cur: NodeId, segment: &str) -> Outcome<NodeId> {
        let node = self.tree.get(cur).or_refuse(|| "Element no longer exists".to_string())?;
        if segment == "." {
            if !node.is_array() {
                return refuse(format!("Cannot append to {}, it is not an array", node.spec.name));
            }
            let item = node
                .spec
                .item
                .as_deref()
                .cloned()
                .or_refuse(|| "Array has no item definition".to_string())?;
            return Ok(self.insert_item(cur, item));
        }
        if let Some(existing) = self.tree.resolve(cur, segment) {
            return Ok(existing);
        }
        if node.is(ElementType::File) && segment.len() == 4 {
            return Ok(self.group(cur, segment));
        }
        let optional = node
            .spec
            .optional
            .iter()
            .find(|o| o.matches(segment))
            .cloned()
            .filter(|_| node.has(ElementFlags::CAN_ADD));
        match optional {
            Some(spec) => Ok(self.tree.insert(cur, spec, None)),
            None => refuse(format!("Cannot add element at {segment}")),
        }
    }

    pub(crate) fn insert_item(&mut self, array: NodeId, item: NodeSpec) -> NodeId {
        let id = self.tree.insert(array, item, None);
        self.tree.resort_enclosing(id);
        self.tree.mark_modified(id);
        id
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> Outcome {
        let n = self.tree.get(node).or_refuse(|| "Element no longer exists".to_string())?;
        if !n.has(ElementFlags::REMOVABLE) {
            return refuse(format!("{} cannot be removed", n.spec.name));
        }
        let parent = n.parent;
        self.tree.remove(node);
        if let Some(parent) = parent {
            self.tree.mark_modified(parent);
        }
        Ok(())
    }

    // ========================================================================
    // Names
    // ========================================================================

    pub(crate) fn name_of(&self, node: NodeId) -> String {
        let Some(n) = self.tree.get(node) else {
            return String::new();
        };
        if n.is(ElementType::MainRecord)
            && let Some(form_id) = n.form_id
        {
            return self
                .child_value(node, "EDID")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| form_id_to_string(form_id));
        }
        n.spec.name.clone()
    }

    pub(crate) fn long_name_of(&self, node: NodeId) -> String {
        match self.tree.get(node) {
            Some(n) if self.is_record(node) => format!(
                "{} [{}:{}]",
                self.name_of(node),
                n.spec.signature.as_deref().unwrap_or("????"),
                form_id_to_string(n.form_id.unwrap_or(0))
            ),
            _ => self.name_of(node),
        }
    }

    pub(crate) fn display_name_of(&self, node: NodeId) -> String {
        match self.tree.get(node) {
            Some(n) if n.is(ElementType::File) => {
                format!("[{:02X}] {}", self.load_order(node).unwrap_or(0), n.spec.name)
            }
            Some(_) if self.is_record(node) => self
                .child_value(node, "FULL")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| self.name_of(node)),
            _ => self.name_of(node),
        }
    }

    pub(crate) fn messages_text(&self) -> String {
        self.messages.join("\r\n")
    }
}

/// Copy `units` into the wide buffer at slot 0, bounded by the length in slot 1.
pub(crate) fn copy_units(args: &mut Args<'_, '_>, units: &[u16]) -> Outcome<(usize, usize)> {
    let max_len = args.integer(1)?.max(0) as usize;
    let buf = args.wide_buf(0)?;
    let copied = units.len().min(max_len).min(buf.len());
    buf[..copied].copy_from_slice(&units[..copied]);
    if let Some(slot) = buf.get_mut(copied) {
        *slot = 0;
    }
    Ok((max_len, copied))
}

fn record_spec(signature: &str, name: &str) -> NodeSpec {
    let header = NodeSpec::structure(
        "Record Header",
        vec![
            NodeSpec::string("Signature", signature).read_only().removable(false),
            NodeSpec::integer("Data Size", 0).read_only().removable(false),
            NodeSpec::flags("Record Flags", RECORD_FLAGS, &[]).removable(false),
            NodeSpec::integer("Form Version", 44).removable(false),
        ],
    )
    .removable(false);
    let mut spec = NodeSpec::structure(name, vec![header]).element_type(ElementType::MainRecord);
    spec.def_type = DefType::Record;
    spec.value_type = ValueType::Struct;
    spec.smash_type = SmashType::Record;
    spec.signature = Some(signature.to_string());
    spec
}

/// FNV-1a, rendered the way the engine renders CRCs.
pub(crate) fn checksum(text: &str) -> String {
    let hash = text
        .bytes()
        .fold(0x811C_9DC5u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    format!("{hash:08X}")
}
