//! Session configuration.
//!
//! Everything here is applied once by [`Session::open`](crate::Session::open)
//! before the first handle is issued.

use std::path::{Path, PathBuf};
use std::time::Duration;

use xedit_core::GameMode;
use xedit_ffi::DEFAULT_LIBRARY;

/// Default interval between `GetLoaderStatus` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Startup settings for a [`Session`](crate::Session).
///
/// # Example
///
/// ```
/// use xedit::{GameMode, SessionConfig};
///
/// let config = SessionConfig::new(GameMode::SkyrimSE)
///     .with_game_path("C:/Games/Skyrim Special Edition")
///     .with_language("English")
///     .with_load_order(["Skyrim.esm", "Update.esm"]);
///
/// assert_eq!(config.executable(), "SkyrimSE.exe");
/// assert_eq!(config.load_order.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub game_mode: GameMode,
    /// Installation folder. The engine detects it when unset.
    pub game_path: Option<PathBuf>,
    pub language: Option<String>,
    /// Where the engine writes backups before saving over a plugin.
    pub backup_path: Option<PathBuf>,
    /// Plugins to load, in load order.
    pub load_order: Vec<String>,
    /// Let the engine pull in masters the listed plugins need.
    pub smart_load: bool,
    /// Load `load_order` while opening. When off, call
    /// [`Session::load_plugins`](crate::Session::load_plugins) later.
    pub load_on_open: bool,
    pub poll_interval: Duration,
    /// Engine library used by [`Session::load`](crate::Session::load).
    pub library_path: PathBuf,
}

impl SessionConfig {
    pub fn new(game_mode: GameMode) -> Self {
        Self {
            game_mode,
            game_path: None,
            language: None,
            backup_path: None,
            load_order: Vec::new(),
            smart_load: true,
            load_on_open: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            library_path: PathBuf::from(DEFAULT_LIBRARY),
        }
    }

    pub fn with_game_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.game_path = Some(path.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    pub fn with_load_order<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_order = plugins.into_iter().map(Into::into).collect();
        self
    }

    /// Append one plugin to the load order.
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.load_order.push(plugin.into());
        self
    }

    pub fn with_smart_load(mut self, smart_load: bool) -> Self {
        self.smart_load = smart_load;
        self
    }

    pub fn with_load_on_open(mut self, load_on_open: bool) -> Self {
        self.load_on_open = load_on_open;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = path.into();
        self
    }

    /// Executable name of the configured game.
    pub fn executable(&self) -> &'static str {
        self.game_mode.exe_name()
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new(GameMode::Fallout4);
        assert!(config.smart_load);
        assert!(config.load_on_open);
        assert!(config.load_order.is_empty());
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.library_path(), Path::new("XEditLib.dll"));
        assert_eq!(config.executable(), "Fallout4.exe");
    }

    #[test]
    fn builder_chain() {
        let config = SessionConfig::new(GameMode::Skyrim)
            .with_game_path("/games/skyrim")
            .with_backup_path("/tmp/backups")
            .with_load_order(["Skyrim.esm"])
            .with_plugin("Update.esm")
            .with_smart_load(false)
            .with_load_on_open(false)
            .with_poll_interval(Duration::from_millis(5))
            .with_library_path("lib/XEditLib.dll");

        assert_eq!(config.game_path.as_deref(), Some(Path::new("/games/skyrim")));
        assert_eq!(config.load_order, vec!["Skyrim.esm", "Update.esm"]);
        assert!(!config.smart_load);
        assert!(!config.load_on_open);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.library_path(), Path::new("lib/XEditLib.dll"));
    }
}
