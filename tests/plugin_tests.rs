//! Plugin files: header fields, master lists, copies and saving.

mod common;

use common::{HELMET, fixture};
use xedit::{Object, RecordKind, Signature, XEditError};
use xedit_ffi::NativeFn;

// =============================================================================
// Header
// =============================================================================

#[test]
fn header_fields() {
    let f = fixture();
    f.engine.set_author(f.patch, "Lydia");
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();

    assert_eq!(patch.author().unwrap(), "Lydia");
    patch.set_author("Farkas").unwrap();
    patch.set_description("Helmet tweaks").unwrap();
    assert_eq!(patch.author().unwrap(), "Farkas");
    assert_eq!(patch.description().unwrap(), "Helmet tweaks");
    assert_eq!(f.engine.value_at(f.patch, "File Header\\SNAM").as_deref(), Some("Helmet tweaks"));

    assert!(!patch.is_esm().unwrap());
    patch.set_esm(true).unwrap();
    assert!(patch.is_esm().unwrap());

    let header = patch.header().unwrap();
    assert_eq!(header.signature_name().unwrap().as_deref(), Some("TES4"));
}

#[test]
fn counts_and_load_order() {
    let f = fixture();
    let session = f.open();
    let skyrim = session.file_by_name("Skyrim.esm").unwrap().unwrap();
    let patch = session.file_by_load_order(2).unwrap();

    assert_eq!(skyrim.load_order().unwrap(), 0);
    assert_eq!(patch.name().unwrap(), "Patch.esp");
    assert_eq!(skyrim.record_count().unwrap(), 2);
    assert_eq!(skyrim.override_record_count().unwrap(), 0);
    assert_eq!(patch.record_count().unwrap(), 0);

    let armor = skyrim.records("ARMO", false).unwrap();
    assert_eq!(armor.len(), 1);
    assert!(matches!(armor[0], Object::Record(_)));
    assert_eq!(skyrim.records("", true).unwrap().len(), 2);
    assert!(skyrim.records("NPC_", true).unwrap().is_empty());
}

#[test]
fn crc_follows_content() {
    let f = fixture();
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();

    let before = patch.crc().unwrap();
    assert_eq!(before.len(), 8);
    assert_eq!(patch.crc().unwrap(), before);
    patch.set_author("Someone").unwrap();
    assert_ne!(patch.crc().unwrap(), before);
}

// =============================================================================
// Masters
// =============================================================================

#[test]
fn masters_must_load_first() {
    let f = fixture();
    let session = f.open();
    let update = session.file_by_name("Update.esm").unwrap().unwrap();

    let err = update.add_master("Patch.esp").unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    let err = update.add_master("Update.esm").unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    let err = update.add_master("Dawnguard.esm").unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    assert_eq!(f.engine.count_calls(NativeFn::AddMaster), 0);
    assert!(f.engine.masters_of(f.update).is_empty());

    update.add_master("Skyrim.esm").unwrap();
    update.add_master("skyrim.esm").unwrap();
    assert_eq!(update.master_names().unwrap(), vec!["Skyrim.esm"]);
    assert_eq!(f.engine.count_calls(NativeFn::AddMaster), 2);
}

#[test]
fn batch_masters_are_checked_up_front() {
    let f = fixture();
    let session = f.open();
    let update = session.file_by_name("Update.esm").unwrap().unwrap();

    let err = update.add_masters(&["Skyrim.esm", "Patch.esp"]).unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    assert!(update.master_names().unwrap().is_empty());
    assert_eq!(f.engine.count_calls(NativeFn::AddMasters), 0);

    update.add_masters(&["Skyrim.esm"]).unwrap();
    assert_eq!(update.master_names().unwrap(), vec!["Skyrim.esm"]);
}

#[test]
fn available_and_all_masters() {
    let f = fixture();
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();

    assert_eq!(patch.available_masters().unwrap(), vec!["Skyrim.esm", "Update.esm"]);
    patch.add_master("Update.esm").unwrap();
    assert_eq!(patch.available_masters().unwrap(), vec!["Skyrim.esm"]);

    patch.add_all_masters().unwrap();
    assert!(patch.available_masters().unwrap().is_empty());
    let masters: Vec<String> = patch.masters().unwrap().iter().map(|m| m.name().unwrap()).collect();
    assert_eq!(masters, vec!["Update.esm", "Skyrim.esm"]);

    let skyrim = session.file_by_name("Skyrim.esm").unwrap().unwrap();
    let dependents: Vec<String> = skyrim.required_by().unwrap().iter().map(|p| p.name().unwrap()).collect();
    assert_eq!(dependents, vec!["Patch.esp"]);

    // the first plugin has nothing before it
    assert!(skyrim.available_masters().unwrap().is_empty());
    skyrim.add_all_masters().unwrap();
    assert!(skyrim.master_names().unwrap().is_empty());
}

#[test]
fn sort_and_clean() {
    let f = fixture();
    f.engine.push_master(f.patch, "Update.esm");
    f.engine.push_master(f.patch, "Skyrim.esm");
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();

    patch.sort_masters().unwrap();
    assert_eq!(patch.master_names().unwrap(), vec!["Skyrim.esm", "Update.esm"]);

    // nothing in the patch references either master yet
    patch.clean_masters().unwrap();
    assert!(patch.master_names().unwrap().is_empty());
}

// =============================================================================
// Copies
// =============================================================================

#[test]
fn overrides_need_their_masters() {
    let f = fixture();
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();
    let helmet = session.element(HELMET).unwrap();

    let err = helmet.copy_into(&patch, false).unwrap_err();
    assert!(matches!(err, XEditError::NativeCall(_)));

    patch.add_required_masters(&helmet, false).unwrap();
    assert_eq!(patch.master_names().unwrap(), vec!["Skyrim.esm"]);

    let copy = helmet.copy_into(&patch, false).unwrap().into_record().unwrap();
    assert_eq!(copy.plugin().unwrap().name().unwrap(), "Patch.esp");
    assert!(copy.is_override().unwrap());
    assert!(copy.is_winning_override().unwrap());
    assert_eq!(patch.override_record_count().unwrap(), 1);

    let original = helmet.into_record().unwrap();
    assert!(original.is_master().unwrap());
    assert!(!original.is_winning_override().unwrap());
    assert_eq!(original.overrides().unwrap().len(), 1);
    let winner = original.winning_override().unwrap();
    assert!(winner.equals(&copy).unwrap());
    assert!(copy.master_record().unwrap().equals(&original).unwrap());

    // the copy keeps the master in use
    patch.add_master("Update.esm").unwrap();
    patch.clean_masters().unwrap();
    assert_eq!(patch.master_names().unwrap(), vec!["Skyrim.esm"]);
}

#[test]
fn required_masters_must_load_first() {
    let f = fixture();
    f.engine.add_record(f.patch, "KYWD", f.engine.form_id(f.patch, 0x800), "PatchKeyword");
    f.engine.add_record(f.update, "KYWD", f.engine.form_id(f.update, 0x800), "UpdateKeyword");
    f.engine.push_master(f.update, "Skyrim.esm");
    let session = f.open();
    let skyrim = session.file_by_name("Skyrim.esm").unwrap().unwrap();
    let update = session.file_by_name("Update.esm").unwrap().unwrap();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();
    let late = session.element("Patch.esp\\KYWD\\02000800").unwrap();
    let early = session.element("Update.esm\\KYWD\\01000800").unwrap();

    let err = skyrim.add_required_masters(&late, false).unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    let err = update.add_required_masters(&late, true).unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    let err = skyrim.add_required_masters(&early, false).unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    assert_eq!(f.engine.count_calls(NativeFn::AddRequiredMasters), 0);
    assert!(skyrim.master_names().unwrap().is_empty());

    patch.add_required_masters(&early, false).unwrap();
    assert_eq!(patch.master_names().unwrap(), vec!["Update.esm"]);
    assert_eq!(f.engine.count_calls(NativeFn::AddRequiredMasters), 1);
}

#[test]
fn referenced_by_lists_referrers() {
    let f = fixture();
    let session = f.open();
    let kind = RecordKind::Custom {
        name: "Keyword",
        attributes: &[],
    };
    session.register_record_kind(Signature::from_bytes(*b"KYWD"), kind);

    let keyword = session.element("Skyrim.esm\\KYWD\\0006BBD8").unwrap().into_record().unwrap();
    let referrers: Vec<String> = keyword
        .referenced_by()
        .unwrap()
        .iter()
        .map(|r| r.name().unwrap())
        .collect();
    assert_eq!(referrers, vec!["ArmorIronHelmet"]);

    let helmet = session.element(HELMET).unwrap().into_record().unwrap();
    assert!(helmet.referenced_by().unwrap().is_empty());
}

// =============================================================================
// File operations
// =============================================================================

#[test]
fn save_in_place_and_elsewhere() {
    let f = fixture();
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();

    patch.set_author("Farkas").unwrap();
    assert!(patch.is_modified().unwrap());
    patch.save().unwrap();
    patch.save_as("backup/Patch.esp").unwrap();

    assert_eq!(
        f.engine.saves(),
        vec![
            ("Patch.esp".to_string(), "Patch.esp".to_string()),
            ("Patch.esp".to_string(), "backup/Patch.esp".to_string()),
        ]
    );
}

#[test]
fn rename_and_nuke() {
    let f = fixture();
    let session = f.open();
    let skyrim = session.file_by_name("Skyrim.esm").unwrap().unwrap();

    skyrim.rename("Skyrim Copy.esm").unwrap();
    assert!(session.file_by_name("Skyrim.esm").unwrap().is_none());
    assert!(session.file_by_name("Skyrim Copy.esm").unwrap().is_some());

    skyrim.nuke().unwrap();
    assert_eq!(skyrim.record_count().unwrap(), 0);
    assert!(skyrim.has("File Header").unwrap());
}

#[test]
fn new_files_load_last() {
    let f = fixture();
    let session = f.open();

    let added = session.add_file("Extra.esp").unwrap();
    assert_eq!(added.load_order().unwrap(), 3);
    assert_eq!(session.plugin_count().unwrap(), 4);
    added.add_all_masters().unwrap();
    assert_eq!(added.master_names().unwrap(), vec!["Skyrim.esm", "Update.esm", "Patch.esp"]);

    assert!(matches!(session.add_file("Extra.esp"), Err(XEditError::NativeCall(_))));
}
