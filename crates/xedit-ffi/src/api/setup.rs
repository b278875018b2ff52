use xedit_core::{GameMode, Handle, LoaderState, XEditResult, decode_enum};

use crate::arg::NativeArg;
use crate::bridge::Bridge;
use crate::catalog::NativeFn;
use crate::strings::{join_lines, split_lines, to_wide};

impl Bridge {
    pub fn get_game_path(&mut self, mode: GameMode) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::GetGamePath, vec![NativeArg::Integer(mode.code())])
    }

    pub fn set_game_path(&mut self, path: &str) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(NativeFn::SetGamePath, vec![NativeArg::Str(&path)])
    }

    pub fn get_game_language(&mut self, mode: GameMode) -> XEditResult<String> {
        self.fetch_dynamic(NativeFn::GetGameLanguage, vec![NativeArg::Integer(mode.code())])
    }

    pub fn set_language(&mut self, language: &str) -> XEditResult<()> {
        let language = to_wide(language);
        self.call(NativeFn::SetLanguage, vec![NativeArg::Str(&language)])
    }

    pub fn set_backup_path(&mut self, path: &str) -> XEditResult<()> {
        let path = to_wide(path);
        self.call(NativeFn::SetBackupPath, vec![NativeArg::Str(&path)])
    }

    pub fn set_game_mode(&mut self, mode: GameMode) -> XEditResult<()> {
        self.call(NativeFn::SetGameMode, vec![NativeArg::Integer(mode.code())])
    }

    /// Plugins installed for the current game, in load order.
    pub fn get_load_order(&mut self) -> XEditResult<Vec<String>> {
        let text: String = self.fetch_dynamic(NativeFn::GetLoadOrder, vec![])?;
        Ok(split_lines(&text))
    }

    pub fn get_active_plugins(&mut self) -> XEditResult<Vec<String>> {
        let text: String = self.fetch_dynamic(NativeFn::GetActivePlugins, vec![])?;
        Ok(split_lines(&text))
    }

    /// Start loading `load_order` in the background. Poll
    /// [`get_loader_status`](Self::get_loader_status) for completion.
    pub fn load_plugins<S: AsRef<str>>(&mut self, load_order: &[S], smart_load: bool) -> XEditResult<()> {
        let load_order = to_wide(&join_lines(load_order));
        self.call(
            NativeFn::LoadPlugins,
            vec![NativeArg::Str(&load_order), NativeArg::Bool(smart_load)],
        )
    }

    pub fn load_plugin(&mut self, filename: &str) -> XEditResult<()> {
        let filename = to_wide(filename);
        self.call(NativeFn::LoadPlugin, vec![NativeArg::Str(&filename)])
    }

    pub fn build_references(&mut self, id: Handle, synchronous: bool) -> XEditResult<()> {
        self.call(
            NativeFn::BuildReferences,
            vec![NativeArg::Handle(id), NativeArg::Bool(synchronous)],
        )
    }

    pub fn get_loader_status(&mut self) -> XEditResult<LoaderState> {
        let code: u8 = self.call_out(NativeFn::GetLoaderStatus, vec![])?;
        decode_enum("LoaderState", code)
    }

    pub fn unload_plugin(&mut self, id: Handle) -> XEditResult<()> {
        self.call(NativeFn::UnloadPlugin, vec![NativeArg::Handle(id)])
    }
}
