//! In-memory engine implementing the native call table.
//!
//! [`MockEngine`] answers every catalog entry against a small document
//! tree: files hold groups, groups hold records, records hold subrecords.
//! It follows the engine's conventions closely enough for the layers above
//! the bridge to be tested without the real library:
//!
//! - every lookup hands out a fresh handle, and released numbers are reused
//!   lowest first
//! - variable-length results are staged and only survive until the next
//!   non-`GetResult*` call
//! - a refused call returns `false` and leaves its message and stack in the
//!   exception side channel until the next call
//!
//! The engine is cheap to clone; clones share state, so a test can keep one
//! for inspection after handing another to a [`Bridge`](crate::Bridge).

mod args;
mod handlers;
mod state;
mod tree;

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use xedit_core::{Handle, XEditResult};

pub use tree::{NodeId, NodeSpec, ROOT};

use crate::arg::{NativeArg, NativeReturn};
use crate::bridge::NativeApi;
use crate::catalog::{NativeFn, ReturnRule};
use args::{Args, Fault};
use state::State;

/// One buffer copy performed by a `GetResult*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRecord {
    pub func: NativeFn,
    /// Units the staging call reported.
    pub staged: usize,
    /// Length the host asked for.
    pub max_len: usize,
    /// Units actually written.
    pub copied: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Rc<RefCell<State>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RefMut<'_, State> {
        self.state.borrow_mut()
    }

    // ========================================================================
    // Fixtures
    // ========================================================================

    /// Load an empty plugin with a file header.
    pub fn add_plugin(&self, name: &str) -> NodeId {
        self.state().add_plugin(name)
    }

    /// Form id local to `file`: its load-order byte over `local`.
    pub fn form_id(&self, file: NodeId, local: u32) -> u32 {
        let lo = self.state().load_order(file).unwrap_or(0) as u32;
        (lo << 24) | (local & 0x00FF_FFFF)
    }

    /// Add a record with a record header and an `EDID`.
    pub fn add_record(&self, file: NodeId, signature: &str, form_id: u32, editor_id: &str) -> NodeId {
        self.state().add_record(file, signature, form_id, editor_id)
    }

    pub fn add_child(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let mut state = self.state();
        let node = state.tree.insert(parent, spec, None);
        state.tree.resort_enclosing(node);
        node
    }

    /// Let `parent` accept `spec` through `AddElement`.
    pub fn allow_child(&self, parent: NodeId, spec: NodeSpec) {
        if let Some(node) = self.state().tree.get_mut(parent) {
            node.spec.flags |= xedit_core::ElementFlags::CAN_ADD;
            node.spec.optional.push(spec);
        }
    }

    /// Record `name` as a master without any checks.
    pub fn push_master(&self, file: NodeId, name: &str) {
        if let Some(node) = self.state().tree.get_mut(file) {
            node.masters.push(name.to_string());
        }
    }

    pub fn set_author(&self, file: NodeId, author: &str) {
        let mut state = self.state();
        if let Some(cnam) = state.tree.resolve(file, "File Header\\CNAM")
            && let Some(node) = state.tree.get_mut(cnam)
        {
            node.spec.value = author.to_string();
        }
    }

    /// Plugins present in the data folder, in load order.
    pub fn set_installed(&self, plugins: &[&str]) {
        self.state().installed = plugins.iter().map(|p| p.to_string()).collect();
    }

    pub fn set_global(&self, key: &str, value: &str) {
        let mut state = self.state();
        state.globals.retain(|(k, _)| k != key);
        state.globals.push((key.to_string(), value.to_string()));
    }

    pub fn push_message(&self, message: &str) {
        self.state().messages.push(message.to_string());
    }

    /// Make the next call of `func` fail with `message`.
    pub fn fail_next(&self, func: NativeFn, message: &str) {
        self.state().injected.push((func, message.to_string()));
    }

    /// Issue a handle to a fixture node directly.
    pub fn handle_for(&self, node: NodeId) -> Handle {
        Handle(self.state().issue(node))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn calls(&self) -> Vec<NativeFn> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, func: NativeFn) -> usize {
        self.state().calls.iter().filter(|&&f| f == func).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn fills(&self) -> Vec<FillRecord> {
        self.state().fills.clone()
    }

    /// Handles released so far, in release order.
    pub fn released(&self) -> Vec<Handle> {
        self.state().released.iter().copied().map(Handle).collect()
    }

    pub fn live_handles(&self) -> usize {
        self.state().handles.len()
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.state().handles.contains_key(&handle.raw())
    }

    /// `(file, path)` pairs written by `SaveFile`.
    pub fn saves(&self) -> Vec<(String, String)> {
        self.state().saves.clone()
    }

    pub fn masters_of(&self, file: NodeId) -> Vec<String> {
        self.state().masters(file)
    }

    pub fn value_at(&self, node: NodeId, path: &str) -> Option<String> {
        self.state().child_value(node, path)
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.state().tree.get(node).is_some()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state().tree.children(node).to_vec()
    }

    pub fn game_mode(&self) -> Option<i32> {
        self.state().game_mode
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }
}

impl NativeApi for MockEngine {
    fn call(&mut self, func: NativeFn, args: &mut [NativeArg<'_>]) -> XEditResult<NativeReturn> {
        self.state().call(func, &mut Args::new(func, args))
    }
}

impl State {
    fn call(&mut self, func: NativeFn, args: &mut Args<'_, '_>) -> XEditResult<NativeReturn> {
        use NativeFn as F;

        self.calls.push(func);
        if !matches!(func, F::GetResultString | F::GetResultArray | F::GetResultBytes) {
            self.staged = None;
        }
        let reads_exception = matches!(
            func,
            F::GetExceptionMessageLength | F::GetExceptionMessage | F::GetExceptionStackLength | F::GetExceptionStack
        );
        if !reads_exception {
            self.exception = None;
        }

        let outcome = match self.injected.iter().position(|(f, _)| *f == func) {
            Some(index) => Err(Fault::Engine(self.injected.remove(index).1)),
            None => self.handle(func, args),
        };

        let void = func.signature().ret == ReturnRule::Void;
        match outcome {
            Ok(()) if void => Ok(NativeReturn::Void),
            Ok(()) => Ok(NativeReturn::Bool(true)),
            Err(Fault::Engine(message)) => {
                self.exception = Some((message, format!("  at {func}")));
                Ok(if void { NativeReturn::Void } else { NativeReturn::Bool(false) })
            }
            Err(Fault::Host(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use xedit_core::{Color, ElementType, LoaderState, XEditError};

    use super::*;
    use crate::Bridge;

    fn fixture() -> (MockEngine, Bridge, NodeId, NodeId) {
        let engine = MockEngine::new();
        let file = engine.add_plugin("Test.esp");
        let record = engine.add_record(file, "ARMO", 0x0000_0800, "IronHelmet");
        engine.add_child(record, NodeSpec::string("FULL", "Iron Helmet"));
        engine.add_child(
            record,
            NodeSpec::sorted_array(
                "KWDA",
                NodeSpec::reference("Keyword", 0),
                vec![NodeSpec::reference("Keyword", 0x0000_0900)],
            ),
        );
        engine.add_child(record, NodeSpec::color("CNAM", Color::new(255, 0, 16)));
        let bridge = Bridge::new(engine.clone());
        (engine, bridge, file, record)
    }

    #[test]
    fn lookups_hand_out_fresh_handles() {
        let (_, mut bridge, _, _) = fixture();
        let a = bridge.get_element(Handle::ROOT, "Test.esp").unwrap();
        let b = bridge.get_element(Handle::ROOT, "Test.esp").unwrap();
        assert_ne!(a, b);
        assert!(bridge.element_equals(a, b).unwrap());
    }

    #[test]
    fn released_numbers_are_reused_lowest_first() {
        let (engine, mut bridge, _, _) = fixture();
        let a = bridge.get_element(Handle::ROOT, "Test.esp").unwrap();
        let b = bridge.get_element(a, "File Header").unwrap();
        bridge.release(b).unwrap();
        bridge.release(a).unwrap();
        let c = bridge.get_element(Handle::ROOT, "Test.esp").unwrap();
        assert_eq!(c, a);
        assert_eq!(engine.released(), vec![b, a]);
        assert!(bridge.release(Handle(99)).is_err());
    }

    #[test]
    fn paths_resolve_records_by_form_id() {
        let (_, mut bridge, _, _) = fixture();
        let full = bridge.get_value(Handle::ROOT, "Test.esp\\ARMO\\00000800\\FULL").unwrap();
        assert_eq!(full, "Iron Helmet");
        let short = bridge.get_value(Handle::ROOT, "Test.esp\\00000800\\EDID").unwrap();
        assert_eq!(short, "IronHelmet");
    }

    #[test]
    fn path_forms() {
        let (engine, mut bridge, _, record) = fixture();
        let record = engine.handle_for(record);
        let full = bridge.get_element(record, "FULL").unwrap();
        assert_eq!(bridge.path(full, false, false).unwrap(), "Test.esp\\ARMO\\00000800\\FULL");
        assert_eq!(bridge.path(full, true, false).unwrap(), "Test.esp\\00000800\\FULL");
        assert_eq!(bridge.path(full, true, true).unwrap(), "FULL");
    }

    #[test]
    fn sorted_arrays_keep_order_and_refuse_moves() {
        let (engine, mut bridge, _, record) = fixture();
        let record = engine.handle_for(record);
        bridge.add_array_item(record, "KWDA", "", "00000100").unwrap();
        let items = bridge.get_elements(record, "KWDA", false, false).unwrap();
        let values: Vec<String> = items.iter().map(|&i| bridge.get_value(i, "").unwrap()).collect();
        assert_eq!(values, vec!["00000100", "00000900"]);
        let err = bridge.move_array_item(items[1], 0).unwrap_err();
        assert_eq!(err.native().unwrap().message, "Cannot move elements in sorted arrays");
    }

    #[test]
    fn value_validation() {
        let (engine, mut bridge, _, record) = fixture();
        let record = engine.handle_for(record);
        assert!(bridge.set_int_value(record, "CNAM\\Red", 12).is_ok());
        assert_eq!(bridge.get_int_value(record, "CNAM\\Red").unwrap(), 12);
        assert!(bridge.set_value(record, "CNAM\\Red", "twelve").is_err());
        assert!(bridge.set_value(record, "KWDA\\[0]", "not hex").is_err());
    }

    #[test]
    fn flags_on_the_record_header() {
        let (engine, mut bridge, file, _) = fixture();
        let file = engine.handle_for(file);
        let path = "File Header\\Record Header\\Record Flags";
        assert!(!bridge.get_flag(file, path, "ESM").unwrap());
        bridge.set_flag(file, path, "ESM", true).unwrap();
        assert!(bridge.get_flag(file, path, "ESM").unwrap());
        assert_eq!(bridge.get_enabled_flags(file, path).unwrap(), vec!["ESM"]);
        let err = bridge.get_flag(file, path, "Bogus").unwrap_err();
        assert_eq!(err.native().unwrap().message, "Flag Bogus not found");
    }

    #[test]
    fn loader_reports_active_then_done() {
        let engine = MockEngine::new();
        engine.set_installed(&["Skyrim.esm", "Update.esm"]);
        let mut bridge = Bridge::new(engine.clone());
        bridge.init_xedit().unwrap();
        bridge.set_game_mode(xedit_core::GameMode::SkyrimSE).unwrap();
        bridge.load_plugins(&["Skyrim.esm", "Update.esm"], true).unwrap();
        assert_eq!(bridge.get_loader_status().unwrap(), LoaderState::Active);
        assert_eq!(bridge.get_loader_status().unwrap(), LoaderState::Done);
        assert_eq!(bridge.get_global("FileCount").unwrap(), "2");
    }

    #[test]
    fn loading_an_unknown_plugin_ends_in_error() {
        let engine = MockEngine::new();
        let mut bridge = Bridge::new(engine.clone());
        bridge.init_xedit().unwrap();
        bridge.set_game_mode(xedit_core::GameMode::Skyrim).unwrap();
        bridge.load_plugins(&["Missing.esp"], false).unwrap();
        assert_eq!(bridge.get_loader_status().unwrap(), LoaderState::Error);
        assert!(bridge.messages().contains("Failed to load Missing.esp"));
    }

    #[test]
    fn clean_masters_drops_unreferenced() {
        let engine = MockEngine::new();
        let base = engine.add_plugin("Base.esm");
        engine.add_plugin("Other.esm");
        let plugin = engine.add_plugin("Patch.esp");
        engine.add_record(base, "KYWD", engine.form_id(base, 0x800), "Kw");
        let armor = engine.add_record(plugin, "ARMO", engine.form_id(plugin, 0x800), "Helm");
        engine.add_child(armor, NodeSpec::reference("KWDA", engine.form_id(base, 0x800)));
        engine.push_master(plugin, "Base.esm");
        engine.push_master(plugin, "Other.esm");
        let mut bridge = Bridge::new(engine.clone());
        let handle = engine.handle_for(plugin);
        bridge.clean_masters(handle).unwrap();
        assert_eq!(engine.masters_of(plugin), vec!["Base.esm"]);
    }

    #[test]
    fn descriptor_of_a_record() {
        let (engine, mut bridge, _, record) = fixture();
        let record = engine.handle_for(record);
        let descriptor = bridge.descriptor(record).unwrap();
        assert_eq!(descriptor.element_type, ElementType::MainRecord);
        assert_eq!(descriptor.signature.map(|s| s.to_string()).as_deref(), Some("ARMO"));
    }

    #[test]
    fn root_is_not_an_element() {
        let (_, mut bridge, _, _) = fixture();
        let err = bridge.element_type(Handle::ROOT).unwrap_err();
        assert!(matches!(err, XEditError::NativeCall(_)));
    }
}
