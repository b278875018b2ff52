//! Plugin files and their master lists.
//!
//! A plugin may only depend on files loaded before it. [`Plugin::add_master`]
//! checks that on the host before the engine is asked, so a refused master
//! leaves no trace in the engine's message log or the master list.
//!
//! Batch operations (`add_masters`, `add_all_masters`,
//! `add_required_masters`) are not transactional. When one fails, the
//! masters added before it stay; re-read [`Plugin::master_names`] to see
//! where the list ended up.

use tracing::{debug, info};
use xedit_core::{XEditError, XEditResult};

use crate::element::{Element, Object, element_wrapper};

const HEADER: &str = "File Header";
const HEADER_AUTHOR: &str = "File Header\\CNAM";
const HEADER_DESCRIPTION: &str = "File Header\\SNAM";
const HEADER_FLAGS: &str = "File Header\\Record Header\\Record Flags";
const ESM_FLAG: &str = "ESM";

#[derive(Debug, Clone)]
pub struct Plugin<'s> {
    element: Element<'s>,
}

element_wrapper!(Plugin);

impl<'s> Plugin<'s> {
    pub(crate) fn new(element: Element<'s>) -> Self {
        Self { element }
    }

    /// The `TES4` header record.
    pub fn header(&self) -> XEditResult<Object<'s>> {
        self.element(HEADER)
    }

    pub fn author(&self) -> XEditResult<String> {
        self.header_text(HEADER_AUTHOR)
    }

    pub fn set_author(&self, author: &str) -> XEditResult<()> {
        self.set(HEADER_AUTHOR, author)
    }

    pub fn description(&self) -> XEditResult<String> {
        self.header_text(HEADER_DESCRIPTION)
    }

    pub fn set_description(&self, description: &str) -> XEditResult<()> {
        self.set(HEADER_DESCRIPTION, description)
    }

    fn header_text(&self, path: &str) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session().bridge().get_value(handle, path)
    }

    pub fn is_esm(&self) -> XEditResult<bool> {
        let handle = self.handle()?;
        self.session().bridge().get_flag(handle, HEADER_FLAGS, ESM_FLAG)
    }

    pub fn set_esm(&self, esm: bool) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().set_flag(handle, HEADER_FLAGS, ESM_FLAG, esm)
    }

    pub fn record_count(&self) -> XEditResult<usize> {
        let handle = self.handle()?;
        let count = self.session().bridge().get_record_count(handle)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn override_record_count(&self) -> XEditResult<usize> {
        let handle = self.handle()?;
        let count = self.session().bridge().get_override_record_count(handle)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Position in the global load order.
    pub fn load_order(&self) -> XEditResult<usize> {
        let handle = self.handle()?;
        let order = self.session().bridge().get_file_load_order(handle)?;
        usize::try_from(order).map_err(|_| XEditError::Decode(format!("negative load order {order}")))
    }

    /// Checksum of the file as the engine would write it.
    pub fn crc(&self) -> XEditResult<String> {
        let handle = self.handle()?;
        self.session().bridge().crc_hash(handle)
    }

    /// Records of the signatures in `search` (comma separated, empty for
    /// all), in file order.
    pub fn records(&self, search: &str, include_overrides: bool) -> XEditResult<Vec<Object<'s>>> {
        let handle = self.handle()?;
        let handles = self.session().bridge().get_records(handle, search, include_overrides)?;
        self.session().objectify_all(handles)
    }

    // ========================================================================
    // Masters
    // ========================================================================

    /// Loaded masters in master-list order.
    pub fn masters(&self) -> XEditResult<Vec<Plugin<'s>>> {
        let handle = self.handle()?;
        let handles = self.session().bridge().get_masters(handle)?;
        self.session().plugins_from(handles)
    }

    pub fn master_names(&self) -> XEditResult<Vec<String>> {
        let handle = self.handle()?;
        self.session().bridge().get_master_names(handle)
    }

    /// Loaded plugins that list this one as a master.
    pub fn required_by(&self) -> XEditResult<Vec<Plugin<'s>>> {
        let handle = self.handle()?;
        let handles = self.session().bridge().get_required_by(handle)?;
        self.session().plugins_from(handles)
    }

    /// Append `name` to the master list.
    ///
    /// Fails with [`XEditError::InvariantViolation`], without calling the
    /// engine, unless `name` is another loaded plugin that loads before
    /// this one. Adding a master already listed does nothing.
    pub fn add_master(&self, name: &str) -> XEditResult<()> {
        self.check_master(name)?;
        let handle = self.handle()?;
        self.session().bridge().add_master(handle, name)?;
        debug!(plugin = %self.describe(), master = name, "master added");
        Ok(())
    }

    /// Add several masters, checking each before any is added.
    ///
    /// All names are checked up front, so an ordering violation adds
    /// nothing. An engine failure part way leaves the earlier masters added.
    pub fn add_masters<S: AsRef<str>>(&self, names: &[S]) -> XEditResult<()> {
        for name in names {
            self.check_master(name.as_ref())?;
        }
        let handle = self.handle()?;
        self.session().bridge().add_masters(handle, names)
    }

    /// Add every loaded plugin that loads before this one.
    pub fn add_all_masters(&self) -> XEditResult<()> {
        let own = self.name()?;
        let earlier: Vec<String> = self
            .session()
            .plugin_names()?
            .into_iter()
            .take_while(|name| !name.eq_ignore_ascii_case(&own))
            .collect();
        self.add_masters(&earlier)
    }

    /// Plugins that could become masters: loaded earlier and not yet listed.
    pub fn available_masters(&self) -> XEditResult<Vec<String>> {
        let own = self.name()?;
        let current = self.master_names()?;
        Ok(self
            .session()
            .plugin_names()?
            .into_iter()
            .take_while(|name| !name.eq_ignore_ascii_case(&own))
            .filter(|name| !current.iter().any(|m| m.eq_ignore_ascii_case(name)))
            .collect())
    }

    /// Add whatever masters copying `record` into this plugin needs.
    ///
    /// The record's file and that file's masters must all load before this
    /// plugin; otherwise this fails with [`XEditError::InvariantViolation`]
    /// and the engine is not called.
    pub fn add_required_masters(&self, record: &Element<'_>, as_new: bool) -> XEditResult<()> {
        self.check_sources(record)?;
        let (record, file) = (record.handle()?, self.handle()?);
        self.session().bridge().add_required_masters(record, file, as_new)
    }

    /// Drop masters nothing in the plugin references any more.
    pub fn clean_masters(&self) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().clean_masters(handle)
    }

    /// Reorder the master list to follow the load order.
    pub fn sort_masters(&self) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().sort_masters(handle)
    }

    /// Every file `record` can draw masters from: its own file and the
    /// masters of that file.
    fn check_sources(&self, record: &Element<'_>) -> XEditResult<()> {
        let source = record.plugin()?;
        let listed = source.name().and_then(|name| Ok((name, source.master_names()?)));
        source.release()?;
        let (source_name, masters) = listed?;
        let own_name = self.name()?;
        for name in std::iter::once(source_name).chain(masters) {
            if !name.eq_ignore_ascii_case(&own_name) {
                self.check_master(&name)?;
            }
        }
        Ok(())
    }

    fn check_master(&self, name: &str) -> XEditResult<()> {
        let own_name = self.name()?;
        if own_name.eq_ignore_ascii_case(name) {
            return Err(XEditError::invariant(format!("{own_name} cannot be its own master")));
        }
        let Some(master) = self.session().file_by_name(name)? else {
            return Err(XEditError::invariant(format!(
                "{name} is not loaded and cannot become a master of {own_name}"
            )));
        };
        let master_order = master.load_order();
        master.release()?;
        let (master_order, own_order) = (master_order?, self.load_order()?);
        if master_order >= own_order {
            return Err(XEditError::invariant(format!(
                "{name} (load order {master_order}) loads after {own_name} (load order {own_order})"
            )));
        }
        Ok(())
    }

    // ========================================================================
    // File operations
    // ========================================================================

    /// Write the plugin back to where it was loaded from.
    pub fn save(&self) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().save_file(handle, "")?;
        info!(plugin = %self.describe(), "plugin saved");
        Ok(())
    }

    pub fn save_as(&self, path: impl AsRef<std::path::Path>) -> XEditResult<()> {
        let handle = self.handle()?;
        let path = path.as_ref().display().to_string();
        self.session().bridge().save_file(handle, &path)?;
        info!(plugin = %self.describe(), %path, "plugin saved");
        Ok(())
    }

    pub fn rename(&self, filename: &str) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().rename_file(handle, filename)
    }

    /// Remove every record, keeping only the header.
    pub fn nuke(&self) -> XEditResult<()> {
        let handle = self.handle()?;
        self.session().bridge().nuke_file(handle)
    }
}
