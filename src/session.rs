//! The engine session: one initialised engine, its handle frames and the
//! record kind table.
//!
//! A [`Session`] is the single owner of the engine. Every wrapper borrows it,
//! so wrappers cannot outlive the session and the engine is never touched
//! from two places at once. Frames nest on the session's own stack; see
//! [`Session::scope`] and [`ScopeGuard`].

use std::cell::{Cell, RefCell, RefMut};
use std::path::Path;
use std::thread;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};
use xedit_core::{FrameId, Handle, HandleRef, LoaderState, Signature, XEditError, XEditResult};
use xedit_ffi::{Bridge, DynamicLibrary, NativeApi};
use xedit_registry::{HandleDump, HandleRegistry, ScopeReport, SubclassRegistry};

use crate::config::SessionConfig;
use crate::element::{Element, Entry, Object};
use crate::plugin::Plugin;
use crate::record::RecordKind;

/// Suffix of the engine's built-in pseudo plugins.
const HARDCODED_SUFFIX: &str = ".Hardcoded.dat";

pub struct Session {
    bridge: RefCell<Bridge>,
    handles: RefCell<HandleRegistry>,
    kinds: RefCell<SubclassRegistry<RecordKind>>,
    config: SessionConfig,
    /// Set once `InitXEdit` succeeded, cleared by `CloseXEdit`.
    open: Cell<bool>,
}

impl Session {
    /// Initialise the engine behind `api` with `config`.
    ///
    /// Steps run in the order the engine requires: init, game mode, game
    /// path, language, backup path, then plugin loading (when
    /// [`SessionConfig::load_on_open`] is set) until the loader finishes.
    pub fn open(config: SessionConfig, api: impl NativeApi + 'static) -> XEditResult<Self> {
        let session = Self {
            bridge: RefCell::new(Bridge::new(api)),
            handles: RefCell::new(HandleRegistry::new()),
            kinds: RefCell::new(RecordKind::defaults()),
            config,
            open: Cell::new(false),
        };
        session.initialize()?;
        Ok(session)
    }

    /// Load the engine library named by [`SessionConfig::library_path`] and
    /// open a session on it.
    ///
    /// # Safety
    ///
    /// See [`DynamicLibrary::load`]: the library must be a build of
    /// XEditLib matching the catalog.
    pub unsafe fn load(config: SessionConfig) -> XEditResult<Self> {
        // SAFETY: forwarded to the caller.
        let library = unsafe { DynamicLibrary::load(config.library_path()) }?;
        Self::open(config, library)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn initialize(&self) -> XEditResult<()> {
        let config = &self.config;
        {
            let mut bridge = self.bridge();
            bridge.init_xedit()?;
            self.open.set(true);
            bridge.set_game_mode(config.game_mode)?;
            if let Some(path) = &config.game_path {
                bridge.set_game_path(&path_text(path))?;
            }
            if let Some(language) = &config.language {
                bridge.set_language(language)?;
            }
            if let Some(path) = &config.backup_path {
                bridge.set_backup_path(&path_text(path))?;
            }
        }
        info!(game = %config.game_mode, "engine initialised");

        if config.load_on_open && !config.load_order.is_empty() {
            self.load_plugins(&config.load_order, config.smart_load)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the engine is still open.
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Start loading `plugins` and block until the loader finishes.
    pub fn load_plugins<S: AsRef<str>>(&self, plugins: &[S], smart_load: bool) -> XEditResult<()> {
        self.bridge().load_plugins(plugins, smart_load)?;
        debug!(count = plugins.len(), smart_load, "plugin load started");
        self.wait_for_loader()
    }

    /// Load one more plugin after the initial load.
    pub fn load_plugin(&self, filename: &str) -> XEditResult<()> {
        self.bridge().load_plugin(filename)?;
        self.wait_for_loader()
    }

    /// Poll `GetLoaderStatus` until the loader is done.
    ///
    /// A loader error is returned with the engine's message log, which is
    /// where it reports what went wrong.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn wait_for_loader(&self) -> XEditResult<()> {
        loop {
            let state = self.bridge().get_loader_status()?;
            match state {
                LoaderState::Active => thread::sleep(self.config.poll_interval),
                LoaderState::Error => {
                    let messages = self.bridge().messages();
                    warn!(%messages, "plugin loader failed");
                    return Err(XEditError::Loader(messages.trim().to_string()));
                }
                LoaderState::Done | LoaderState::Inactive => {
                    debug!(?state, "plugin loader finished");
                    return Ok(());
                }
            }
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Release every tracked handle and close the engine.
    pub fn close(self) -> XEditResult<ScopeReport> {
        self.shutdown()
    }

    fn shutdown(&self) -> XEditResult<ScopeReport> {
        if !self.open.replace(false) {
            return Ok(ScopeReport::default());
        }
        let report = {
            let mut handles = self.handles.borrow_mut();
            let mut bridge = self.bridge();
            handles.release_all(&mut |h| bridge.release(h))
        };
        debug!(released = report.released, leaks = report.leaks.len(), "session handles released");
        self.bridge().close_xedit()?;
        info!("engine closed");
        Ok(report)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Push a frame. Handles obtained from now on belong to it.
    pub fn enter_scope(&self) -> FrameId {
        self.handles.borrow_mut().enter_scope()
    }

    /// Pop the current frame, releasing what it still owns.
    pub fn exit_scope(&self) -> XEditResult<ScopeReport> {
        let mut handles = self.handles.borrow_mut();
        let mut bridge = self.bridge();
        handles.exit_scope(&mut |h| bridge.release(h))
    }

    /// Push a frame that pops when the guard drops.
    pub fn scope_guard(&self) -> ScopeGuard<'_> {
        let frame = self.enter_scope();
        ScopeGuard { session: self, frame }
    }

    /// Run `f` inside a fresh frame.
    ///
    /// Wrappers created inside `f` are released when it returns. Promote
    /// any that must survive before returning them.
    pub fn scope<'s, R>(&'s self, f: impl FnOnce(&'s Session) -> XEditResult<R>) -> XEditResult<R> {
        let guard = self.scope_guard();
        let result = f(self);
        let report = guard.finish()?;
        if !report.is_clean() {
            debug!(leaks = report.leaks.len(), "scope closed with leaks");
        }
        result
    }

    /// Move `element`'s handle to the frame enclosing its owner.
    pub fn promote(&self, element: &Element<'_>) -> XEditResult<FrameId> {
        let handle = self.live(element.href())?;
        self.handles.borrow_mut().promote(handle)
    }

    /// Frame stack and live handle counts, for leak hunting.
    pub fn dump_handles(&self) -> HandleDump {
        self.handles.borrow().dump()
    }

    pub fn current_frame(&self) -> FrameId {
        self.handles.borrow().current_frame()
    }

    /// Handles tracked across every frame.
    pub fn tracked_handles(&self) -> usize {
        self.handles.borrow().tracked()
    }

    // ========================================================================
    // Record kinds
    // ========================================================================

    /// Bind `signature` to `kind`, returning the previous binding.
    pub fn register_record_kind(&self, signature: Signature, kind: RecordKind) -> Option<RecordKind> {
        self.kinds.borrow_mut().register(signature, kind)
    }

    pub fn unregister_record_kind(&self, signature: Signature) -> Option<RecordKind> {
        self.kinds.borrow_mut().unregister(signature)
    }

    pub fn record_kind(&self, signature: Option<Signature>) -> Option<RecordKind> {
        self.kinds.borrow().resolve(signature).copied()
    }

    // ========================================================================
    // Root navigation
    // ========================================================================

    /// The engine root. Its children are the loaded files.
    pub fn root(&self) -> Element<'_> {
        Element::root(self)
    }

    /// Resolve an absolute path such as `Skyrim.esm\ARMO\00012E46\FULL`.
    pub fn get(&self, path: &str) -> XEditResult<Option<Entry<'_>>> {
        self.root().get(path)
    }

    /// Like [`get`](Self::get) but always returns the wrapper.
    pub fn element(&self, path: &str) -> XEditResult<Object<'_>> {
        self.root().element(path)
    }

    pub fn file_by_name(&self, name: &str) -> XEditResult<Option<Plugin<'_>>> {
        let handle = self.bridge().try_file_by_name(name)?;
        handle.map(|h| self.plugin(h)).transpose()
    }

    pub fn file_by_load_order(&self, load_order: usize) -> XEditResult<Plugin<'_>> {
        let index = i32::try_from(load_order)
            .map_err(|_| XEditError::invariant(format!("load order {load_order} out of range")))?;
        let handle = self.bridge().file_by_load_order(index)?;
        self.plugin(handle)
    }

    /// Loaded plugins in load order, the engine's hardcoded files excluded.
    pub fn plugins(&self) -> XEditResult<Vec<Plugin<'_>>> {
        let handles = self.bridge().get_elements(Handle::ROOT, "", false, false)?;
        let mut plugins = Vec::with_capacity(handles.len());
        for plugin in self.plugins_from(handles)? {
            if plugin.name()?.ends_with(HARDCODED_SUFFIX) {
                plugin.release()?;
            } else {
                plugins.push(plugin);
            }
        }
        Ok(plugins)
    }

    /// Names of the loaded plugins in load order, hardcoded files excluded.
    ///
    /// Every file handle is released again, even when a name cannot be read.
    pub fn plugin_names(&self) -> XEditResult<Vec<String>> {
        let handles = self.bridge().get_elements(Handle::ROOT, "", false, false)?;
        let mut names = Vec::with_capacity(handles.len());
        let mut failure = None;
        for href in self.track_all(&handles) {
            let name = self.bridge().name(href.handle);
            self.release_ref(href)?;
            match name {
                Ok(name) if !name.ends_with(HARDCODED_SUFFIX) => names.push(name),
                Ok(_) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(names),
        }
    }

    /// Number of loaded files as the engine counts them.
    pub fn plugin_count(&self) -> XEditResult<usize> {
        let count = self.global("FileCount")?;
        count
            .trim()
            .parse()
            .map_err(|_| XEditError::Decode(format!("invalid FileCount '{count}'")))
    }

    /// Create a new empty plugin at the end of the load order.
    pub fn add_file(&self, name: &str) -> XEditResult<Plugin<'_>> {
        let handle = self.bridge().add_file(name)?;
        info!(plugin = name, "plugin created");
        self.plugin(handle)
    }

    pub fn global(&self, key: &str) -> XEditResult<String> {
        self.bridge().get_global(key)
    }

    pub fn globals(&self) -> XEditResult<FxHashMap<String, String>> {
        self.bridge().get_globals()
    }

    /// Load order of every plugin installed for the game.
    pub fn load_order(&self) -> XEditResult<Vec<String>> {
        self.bridge().get_load_order()
    }

    /// Plugins the game has enabled.
    pub fn active_plugins(&self) -> XEditResult<Vec<String>> {
        self.bridge().get_active_plugins()
    }

    /// The engine's message log.
    pub fn messages(&self) -> String {
        self.bridge().messages()
    }

    pub fn clear_messages(&self) -> XEditResult<()> {
        self.bridge().clear_messages()
    }

    /// Wrap a raw handle obtained through [`with_bridge`](Self::with_bridge),
    /// tracking it in the current frame.
    pub fn wrap(&self, handle: Handle) -> XEditResult<Object<'_>> {
        self.objectify(handle)
    }

    /// Direct access to the typed call table.
    ///
    /// Handles returned by the bridge are untracked until passed to
    /// [`wrap`](Self::wrap).
    pub fn with_bridge<R>(&self, f: impl FnOnce(&mut Bridge) -> R) -> R {
        f(&mut self.bridge())
    }

    // ========================================================================
    // Crate plumbing
    // ========================================================================

    pub(crate) fn bridge(&self) -> RefMut<'_, Bridge> {
        self.bridge.borrow_mut()
    }

    /// The raw handle behind `href`, failing fast when its frame is gone.
    pub(crate) fn live(&self, href: HandleRef) -> XEditResult<Handle> {
        self.handles.borrow().validate(href)
    }

    pub(crate) fn track(&self, handle: Handle) -> HandleRef {
        self.handles.borrow_mut().track(handle)
    }

    pub(crate) fn release_ref(&self, href: HandleRef) -> XEditResult<bool> {
        let mut handles = self.handles.borrow_mut();
        let mut bridge = self.bridge();
        handles.release_ref(href, &mut |h| bridge.release(h))
    }

    /// Track a whole batch before anything else touches the engine, so a
    /// later failure cannot strand the untracked tail.
    pub(crate) fn track_all(&self, handles: &[Handle]) -> Vec<HandleRef> {
        let mut registry = self.handles.borrow_mut();
        handles.iter().map(|&h| registry.track(h)).collect()
    }

    fn release_all(&self, hrefs: &[HandleRef]) {
        for &href in hrefs {
            if let Err(e) = self.release_ref(href) {
                warn!(handle = %href.handle, error = %e, "failed to release batch handle");
            }
        }
    }

    /// Track `handle` and wrap it in the variant its descriptor calls for.
    pub(crate) fn objectify(&self, handle: Handle) -> XEditResult<Object<'_>> {
        let href = self.track(handle);
        self.describe(href)
    }

    /// Wrap a batch of handles. On failure the whole batch is released.
    pub(crate) fn objectify_all(&self, handles: Vec<Handle>) -> XEditResult<Vec<Object<'_>>> {
        let hrefs = self.track_all(&handles);
        let mut objects = Vec::with_capacity(hrefs.len());
        for &href in &hrefs {
            match self.describe(href) {
                Ok(object) => objects.push(object),
                Err(e) => {
                    self.release_all(&hrefs);
                    return Err(e);
                }
            }
        }
        Ok(objects)
    }

    /// Query the descriptor of a tracked handle, releasing it when the
    /// engine cannot describe it.
    fn describe(&self, href: HandleRef) -> XEditResult<Object<'_>> {
        let queried = self.bridge().descriptor(href.handle);
        match queried {
            Ok(descriptor) => Ok(Object::classify(Element::bound(self, href, descriptor))),
            Err(e) => {
                if let Err(release) = self.release_ref(href) {
                    warn!(handle = %href.handle, error = %release, "failed to release undescribable handle");
                }
                Err(e)
            }
        }
    }

    pub(crate) fn plugin(&self, handle: Handle) -> XEditResult<Plugin<'_>> {
        match self.objectify(handle)? {
            Object::Plugin(plugin) => Ok(plugin),
            other => {
                let path = other.path().unwrap_or_default();
                other.release()?;
                Err(XEditError::invariant(format!("{handle} ({path}) is not a plugin")))
            }
        }
    }

    /// Wrap a batch of file handles, releasing all of them when one fails or
    /// turns out not to be a file.
    pub(crate) fn plugins_from(&self, handles: Vec<Handle>) -> XEditResult<Vec<Plugin<'_>>> {
        let objects = self.objectify_all(handles)?;
        if let Some(stray) = objects.iter().find(|o| !matches!(o, Object::Plugin(_))) {
            let message = format!("{} is not a plugin", stray.path().unwrap_or_default());
            let hrefs: Vec<HandleRef> = objects.iter().map(|o| o.href()).collect();
            self.release_all(&hrefs);
            return Err(XEditError::invariant(message));
        }
        Ok(objects
            .into_iter()
            .filter_map(|o| match o {
                Object::Plugin(plugin) => Some(plugin),
                _ => None,
            })
            .collect())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "engine did not close cleanly");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("game", &self.config.game_mode)
            .field("open", &self.open.get())
            .field("handles", &self.handles.borrow().tracked())
            .finish()
    }
}

fn path_text(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// Scope guard
// ============================================================================

/// Frame that pops when dropped.
///
/// Dropping a guard whose frame is no longer on top (an inner guard was
/// leaked) leaves the stack alone and logs instead.
#[must_use = "the frame pops as soon as the guard is dropped"]
pub struct ScopeGuard<'s> {
    session: &'s Session,
    frame: FrameId,
}

impl ScopeGuard<'_> {
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Pop the frame now and report what was released.
    pub fn finish(self) -> XEditResult<ScopeReport> {
        let report = self.pop();
        std::mem::forget(self);
        report
    }

    fn pop(&self) -> XEditResult<ScopeReport> {
        let current = self.session.current_frame();
        if current != self.frame {
            warn!(expected = %self.frame, %current, "scope guard is not the innermost frame");
            return Err(XEditError::NoActiveScope);
        }
        self.session.exit_scope()
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.pop() {
            warn!(frame = %self.frame, error = %e, "scope guard failed to pop its frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xedit_core::GameMode;
    use xedit_ffi::{MockEngine, NativeFn};

    fn config() -> SessionConfig {
        SessionConfig::new(GameMode::SkyrimSE).with_poll_interval(std::time::Duration::ZERO)
    }

    #[test]
    fn open_applies_config_in_order() {
        let engine = MockEngine::new();
        engine.set_installed(&["Skyrim.esm"]);
        let session = Session::open(
            config()
                .with_game_path("C:/Skyrim")
                .with_language("English")
                .with_backup_path("C:/backups")
                .with_load_order(["Skyrim.esm"]),
            engine.clone(),
        )
        .unwrap();

        let calls = engine.calls();
        let position = |f: NativeFn| calls.iter().position(|&c| c == f).unwrap();
        assert!(position(NativeFn::InitXEdit) < position(NativeFn::SetGameMode));
        assert!(position(NativeFn::SetGameMode) < position(NativeFn::SetGamePath));
        assert!(position(NativeFn::SetGamePath) < position(NativeFn::SetLanguage));
        assert!(position(NativeFn::SetLanguage) < position(NativeFn::SetBackupPath));
        assert!(position(NativeFn::SetBackupPath) < position(NativeFn::LoadPlugins));
        assert!(position(NativeFn::LoadPlugins) < position(NativeFn::GetLoaderStatus));
        assert_eq!(engine.game_mode(), Some(GameMode::SkyrimSE.code()));
        assert_eq!(session.plugin_names().unwrap(), vec!["Skyrim.esm"]);
    }

    #[test]
    fn loader_error_fails_open() {
        let engine = MockEngine::new();
        let err = Session::open(config().with_load_order(["Missing.esp"]), engine.clone()).unwrap_err();
        assert!(matches!(err, XEditError::Loader(_)));
        // the half-open session still closed the engine
        assert!(!engine.is_initialized());
    }

    #[test]
    fn close_releases_everything() {
        let engine = MockEngine::new();
        engine.add_plugin("Skyrim.esm");
        let session = Session::open(config(), engine.clone()).unwrap();
        let plugin = session.file_by_name("Skyrim.esm").unwrap().unwrap();
        let _header = plugin.header().unwrap();
        assert_eq!(engine.live_handles(), 2);

        let report = session.close().unwrap();
        assert_eq!(report.released, 2);
        assert!(report.is_clean());
        assert_eq!(engine.live_handles(), 0);
        assert!(!engine.is_initialized());
    }

    #[test]
    fn drop_closes_the_engine() {
        let engine = MockEngine::new();
        {
            let _session = Session::open(config(), engine.clone()).unwrap();
            assert!(engine.is_initialized());
        }
        assert!(!engine.is_initialized());
    }

    #[test]
    fn scope_closure_releases_its_handles() {
        let engine = MockEngine::new();
        engine.add_plugin("Skyrim.esm");
        let session = Session::open(config(), engine.clone()).unwrap();

        let name = session
            .scope(|s| {
                let plugin = s.file_by_name("Skyrim.esm")?.ok_or(XEditError::NoActiveScope)?;
                plugin.name()
            })
            .unwrap();
        assert_eq!(name, "Skyrim.esm");
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(session.dump_handles().total(), 0);
    }

    #[test]
    fn guard_out_of_order_is_refused() {
        let session = Session::open(config(), MockEngine::new()).unwrap();
        let outer = session.scope_guard();
        let inner = session.scope_guard();
        assert!(matches!(outer.finish(), Err(XEditError::NoActiveScope)));
        inner.finish().unwrap();
        assert_eq!(session.dump_handles().frames.len(), 2);
        session.exit_scope().unwrap();
    }

    #[test]
    fn hardcoded_files_are_hidden() {
        let engine = MockEngine::new();
        engine.add_plugin("Skyrim.esm");
        engine.add_plugin("Skyrim.Hardcoded.dat");
        let session = Session::open(config(), engine.clone()).unwrap();
        assert_eq!(session.plugin_names().unwrap(), vec!["Skyrim.esm"]);
        let plugins = session.plugins().unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(session.plugin_count().unwrap(), 2);
        drop(plugins);
        assert_eq!(engine.live_handles(), 1);
    }
}
