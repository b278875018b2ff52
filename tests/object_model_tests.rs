//! Object model against the in-memory engine: dispatch, navigation, value
//! coercion, arrays, flags and attributes.

mod common;

use common::{FIRST_PERSON, HELMET, KEYWORD_ID, fixture};
use rustc_hash::FxHashMap;
use xedit::{Attribute, Entry, HEAD_PART_TYPES, Object, RecordKind, Storage, Value, XEditError, signatures};
use xedit_core::Color;
use xedit_ffi::NativeFn;
use xedit_ffi::mock::NodeSpec;

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn variants_follow_the_descriptor() {
    let f = fixture();
    let session = f.open();

    assert_eq!(session.element("Skyrim.esm").unwrap().variant(), "plugin");
    assert_eq!(session.element(HELMET).unwrap().variant(), "record");
    assert_eq!(session.element("Skyrim.esm\\ARMO").unwrap().variant(), "generic");
    assert_eq!(session.element(&format!("{HELMET}\\KWDA")).unwrap().variant(), "array");
    assert_eq!(
        session.element(&format!("{HELMET}\\BOD2\\First Person Flags")).unwrap().variant(),
        "flags"
    );
    // no kind registered for keywords
    assert_eq!(session.element("Skyrim.esm\\KYWD\\0006BBD8").unwrap().variant(), "generic");
}

static HELMET_FIELDS: [Attribute; 1] = [Attribute::new("name", "FULL").stored_as(Storage::Text)];

#[test]
fn rebinding_a_signature_changes_later_resolutions() {
    let f = fixture();
    let session = f.open();
    let custom = RecordKind::Custom {
        name: "Helmet",
        attributes: &HELMET_FIELDS,
    };

    let before = session.element(HELMET).unwrap().into_record().unwrap();
    assert_eq!(before.kind(), RecordKind::Armor);

    assert_eq!(session.register_record_kind(signatures::ARMO, custom), Some(RecordKind::Armor));
    for _ in 0..3 {
        let record = session.element(HELMET).unwrap().into_record().unwrap();
        assert_eq!(record.kind(), custom);
        assert_eq!(record.attr_value("name").unwrap(), Some(Value::Text("Iron Helmet".into())));
    }
    // wrappers already handed out keep their kind
    assert_eq!(before.kind(), RecordKind::Armor);

    session.unregister_record_kind(signatures::ARMO);
    assert_eq!(session.element(HELMET).unwrap().variant(), "generic");
}

// =============================================================================
// Navigation and values
// =============================================================================

#[test]
fn get_coerces_leaves_and_releases_their_handles() {
    let f = fixture();
    let session = f.open();

    let full = session.get(&format!("{HELMET}\\FULL")).unwrap().unwrap();
    assert_eq!(full.as_value(), Some(&Value::Text("Iron Helmet".into())));
    let rating = session.get(&format!("{HELMET}\\DNAM")).unwrap().unwrap();
    assert_eq!(rating.into_value(), Some(Value::Float(15.0)));
    let color = session.get(&format!("{HELMET}\\CNAM")).unwrap().unwrap();
    assert_eq!(color.into_value(), Some(Value::Color(Color::new(10, 20, 30))));

    assert_eq!(f.engine.live_handles(), 0);
    assert_eq!(session.tracked_handles(), 0);
    assert!(session.get(&format!("{HELMET}\\Missing")).unwrap().is_none());
}

#[test]
fn references_resolve_to_their_target() {
    let f = fixture();
    let session = f.open();

    let entry = session.get(&format!("{HELMET}\\KWDA\\[0]")).unwrap().unwrap();
    let target = match entry {
        Entry::Reference(Some(target)) => target,
        other => panic!("expected a resolved reference, got {other:?}"),
    };
    assert_eq!(target.name().unwrap(), "ArmorHelmet");
    assert_eq!(target.form_id().unwrap(), KEYWORD_ID);
    // only the target is still held
    assert_eq!(f.engine.live_handles(), 1);

    let raw = session.root().value(&format!("{HELMET}\\KWDA\\[0]")).unwrap();
    assert_eq!(raw, Some(Value::FormId(KEYWORD_ID)));
}

#[test]
fn paths_and_parents() {
    let f = fixture();
    let session = f.open();
    let full = session.element(&format!("{HELMET}\\FULL")).unwrap();

    assert_eq!(full.long_path().unwrap(), "Skyrim.esm\\ARMO\\00012E46\\FULL");
    assert_eq!(full.path().unwrap(), "Skyrim.esm\\00012E46\\FULL");
    assert_eq!(full.local_path().unwrap(), "FULL");

    let record = full.parent().unwrap().unwrap();
    assert_eq!(record.signature(), Some(signatures::ARMO));
    assert!(record.equals(&full.record().unwrap()).unwrap());
    assert_eq!(full.plugin().unwrap().name().unwrap(), "Skyrim.esm");
}

#[test]
fn children_and_descendants() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    let names: Vec<String> = helmet.children().unwrap().iter().map(|c| c.name().unwrap()).collect();
    assert_eq!(names.len(), helmet.num_child_elements().unwrap());
    assert!(names.contains(&"FULL".to_string()));

    let descendants = helmet.descendants().unwrap();
    let flags = descendants.iter().position(|d| d.name().unwrap() == "First Person Flags").unwrap();
    let bod2 = descendants.iter().position(|d| d.name().unwrap() == "BOD2").unwrap();
    assert!(bod2 < flags);
}

#[test]
fn set_converts_to_the_storage_kind() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    helmet.set("DNAM", 20).unwrap();
    assert_eq!(helmet.value("DNAM").unwrap(), Some(Value::Float(20.0)));
    helmet.set("CNAM", Color::new(1, 2, 3)).unwrap();
    assert_eq!(f.engine.value_at(f.helmet, "CNAM\\Green").as_deref(), Some("2"));

    let err = helmet.set("DNAM", "heavy").unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
    let err = helmet.set("Nope", 1).unwrap_err();
    assert!(matches!(err, XEditError::SchemaMismatch { .. }));
}

#[test]
fn add_requires_a_free_slot_the_schema_allows() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    let desc = helmet.add("DESC").unwrap();
    assert_eq!(desc.name().unwrap(), "DESC");
    assert!(matches!(helmet.add("DESC"), Err(XEditError::InvariantViolation(_))));

    let full = helmet.element("FULL").unwrap();
    assert!(matches!(full.add("Anything"), Err(XEditError::InvariantViolation(_))));
    assert!(matches!(
        full.get_or_add("Anything\\Deeper"),
        Err(XEditError::SchemaMismatch { .. })
    ));
}

#[test]
fn delete_refuses_fixed_elements() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    let bounds = helmet.element("OBND").unwrap();
    assert!(matches!(bounds.delete(), Err(XEditError::InvariantViolation(_))));
    assert_eq!(f.engine.count_calls(NativeFn::RemoveElement), 0);

    helmet.element("FULL").unwrap().delete().unwrap();
    assert!(!helmet.has("FULL").unwrap());
}

#[test]
fn released_wrappers_fail_fast() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();
    let alias = helmet.clone();

    helmet.release().unwrap();
    assert!(matches!(alias.name(), Err(XEditError::InvalidHandleUse { .. })));

    // the recycled number now names a different node; the stale wrapper
    // still refuses
    let _plugin = session.file_by_name("Update.esm").unwrap().unwrap();
    assert!(matches!(alias.name(), Err(XEditError::InvalidHandleUse { .. })));
}

#[test]
fn promoted_wrappers_outlive_their_scope() {
    let f = fixture();
    let session = f.open();

    let kept = session
        .scope(|s| {
            let keep = s.element(HELMET)?;
            let scratch = s.element(&format!("{HELMET}\\FULL"))?;
            keep.promote()?;
            assert!(scratch.is_live());
            Ok(keep)
        })
        .unwrap();

    assert!(kept.is_live());
    assert_eq!(kept.name().unwrap(), "ArmorIronHelmet");
    assert_eq!(f.engine.live_handles(), 1);
}

#[test]
fn json_export() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();
    let json = helmet.to_json().unwrap();
    assert!(json.contains("Iron Helmet"));
    assert!(matches!(helmet.from_json("", &json), Err(XEditError::NativeCall(_))));
}

// =============================================================================
// Failures inside frames
// =============================================================================

#[test]
fn undescribable_handles_fail_without_leaking() {
    let f = fixture();
    let session = f.open();

    f.engine.fail_next(NativeFn::ElementType, "Access violation");
    let err = session.root().lookup(HELMET).unwrap_err();
    let XEditError::NativeCall(failure) = &err else {
        panic!("expected an engine failure, got {err:?}");
    };
    assert_eq!(failure.operation, "ElementType");
    assert_eq!(session.tracked_handles(), 0);
    assert_eq!(f.engine.live_handles(), 0);

    // nothing is left borrowed
    assert_eq!(session.element(HELMET).unwrap().name().unwrap(), "ArmorIronHelmet");
}

#[test]
fn failed_batches_release_every_handle() {
    let f = fixture();
    let session = f.open();
    let baseline = f.engine.live_handles();

    session.enter_scope();
    let helmet = session.element(HELMET).unwrap();
    f.engine.fail_next(NativeFn::ElementType, "Access violation");
    assert!(matches!(helmet.children(), Err(XEditError::NativeCall(_))));
    assert_eq!(session.tracked_handles(), 1);
    assert_eq!(f.engine.live_handles(), baseline + 1);

    let report = session.exit_scope().unwrap();
    assert_eq!(report.released, 1);
    assert_eq!(f.engine.live_handles(), baseline);
}

#[test]
fn failed_operations_inside_a_scope_return_to_baseline() {
    let f = fixture();
    let session = f.open();
    let baseline = f.engine.live_handles();

    let err = session
        .scope(|s| {
            let skyrim = s.file_by_name("Skyrim.esm")?.ok_or(XEditError::NoActiveScope)?;
            let _header = skyrim.header()?;
            f.engine.fail_next(NativeFn::Name, "Access violation");
            s.plugins()
        })
        .unwrap_err();
    assert!(matches!(err, XEditError::NativeCall(_)));
    assert_eq!(f.engine.live_handles(), baseline);
    assert_eq!(session.tracked_handles(), 0);

    {
        let _guard = session.scope_guard();
        let helmet = session.element(HELMET).unwrap();
        f.engine.fail_next(NativeFn::ElementType, "Access violation");
        assert!(helmet.children().is_err());
        f.engine.fail_next(NativeFn::Name, "Access violation");
        assert!(session.plugin_names().is_err());
        assert_eq!(f.engine.live_handles(), baseline + 1);
    }
    assert_eq!(f.engine.live_handles(), baseline);
}

#[test]
fn failed_master_batches_release_every_handle() {
    let f = fixture();
    f.engine.push_master(f.patch, "Skyrim.esm");
    f.engine.push_master(f.patch, "Update.esm");
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();
    let baseline = f.engine.live_handles();

    f.engine.fail_next(NativeFn::ElementType, "Access violation");
    assert!(matches!(patch.masters(), Err(XEditError::NativeCall(_))));
    assert_eq!(f.engine.live_handles(), baseline);
    assert_eq!(patch.masters().unwrap().len(), 2);
}

// =============================================================================
// Arrays
// =============================================================================

#[test]
fn sorted_arrays_insert_by_key_and_refuse_moves() {
    let f = fixture();
    f.engine
        .add_child(f.helmet, NodeSpec::sorted_array("Keys", NodeSpec::integer("Key", 0), Vec::new()));
    let session = f.open();
    let keys = session.element(&format!("{HELMET}\\Keys")).unwrap().into_array().unwrap();

    for key in [3, 1, 2] {
        keys.add_item_with(key, "").unwrap();
    }
    let order: Vec<i64> = keys
        .items()
        .unwrap()
        .iter()
        .map(|item| item.read_value().unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(order, vec![1, 2, 3]);

    for index in 0..3 {
        let item = keys.get_at(index).unwrap().unwrap();
        let err = keys.move_item(&item, 0).unwrap_err();
        assert!(matches!(err, XEditError::InvariantViolation(_)));
    }
    assert_eq!(f.engine.count_calls(NativeFn::MoveArrayItem), 0);
}

#[test]
fn unsorted_arrays_move_items() {
    let f = fixture();
    f.engine.add_child(
        f.helmet,
        NodeSpec::array(
            "Parts",
            NodeSpec::string("Part", ""),
            vec![NodeSpec::string("Part", "a"), NodeSpec::string("Part", "b"), NodeSpec::string("Part", "c")],
        ),
    );
    let session = f.open();
    let parts = session.element(&format!("{HELMET}\\Parts")).unwrap().into_array().unwrap();

    let last = parts.get_at(-1).unwrap().unwrap();
    assert_eq!(parts.index_of(&last).unwrap(), Some(2));
    parts.move_item(&last, 0).unwrap();
    let order: Vec<String> = parts.items().unwrap().iter().map(|i| i.read_value().unwrap().to_string()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);

    assert!(parts.get_at(3).unwrap().is_none());
    assert!(parts.get_at(-4).unwrap().is_none());
    let err = parts.move_item(&last, 7).unwrap_err();
    assert!(matches!(err, XEditError::InvariantViolation(_)));
}

#[test]
fn array_predicates() {
    let f = fixture();
    let session = f.open();
    let keywords = session.element(&format!("{HELMET}\\KWDA")).unwrap().into_array().unwrap();

    assert!(keywords.has_item_with(Value::FormId(KEYWORD_ID), "").unwrap());
    assert!(!keywords.has_item_with(Value::FormId(0x1234), "").unwrap());
    let found = keywords.find_item_with(Value::FormId(KEYWORD_ID), "").unwrap().unwrap();
    assert_eq!(keywords.index_of(&found).unwrap(), Some(0));

    keywords.add_item_with(Value::FormId(0x0001_0000), "").unwrap();
    assert_eq!(keywords.len().unwrap(), 2);
    keywords.remove_item_with(Value::FormId(KEYWORD_ID), "").unwrap();
    assert_eq!(keywords.len().unwrap(), 1);
    assert!(keywords.find_item_with(Value::FormId(KEYWORD_ID), "").unwrap().is_none());
}

// =============================================================================
// Flags
// =============================================================================

#[test]
fn flag_bits_by_name() {
    let f = fixture();
    let session = f.open();
    let flags = session
        .element(&format!("{HELMET}\\BOD2\\First Person Flags"))
        .unwrap()
        .into_flags()
        .unwrap();

    assert_eq!(flags.all_flags().unwrap(), FIRST_PERSON);
    assert_eq!(flags.len().unwrap(), 4);
    assert!(flags.get_flag("Head").unwrap());
    flags.enable("Hands").unwrap();
    flags.disable("Head").unwrap();
    assert_eq!(flags.enabled().unwrap(), vec!["Hair", "Hands"]);
    assert!(flags.set_flag("Tail", true).is_err());
}

#[test]
fn flags_dict_round_trip() {
    let f = fixture();
    f.engine.add_child(
        f.helmet,
        NodeSpec::flags("Letters", &["A", "B", "C", "D"], &["A", "C"]),
    );
    let session = f.open();
    let flags = session.element(&format!("{HELMET}\\Letters")).unwrap().into_flags().unwrap();

    let dict = flags.to_dict().unwrap();
    flags.set_enabled(&["B", "D"]).unwrap();
    flags.from_dict(&dict).unwrap();
    assert_eq!(flags.enabled().unwrap(), vec!["A", "C"]);
    assert_eq!(flags.to_dict().unwrap(), dict);

    // flags left out of the map end up disabled
    let mut only_b = FxHashMap::default();
    only_b.insert("B", true);
    flags.from_dict(&only_b).unwrap();
    assert_eq!(flags.enabled().unwrap(), vec!["B"]);

    let mut unknown = FxHashMap::default();
    unknown.insert("Z", true);
    assert!(matches!(flags.from_dict(&unknown), Err(XEditError::SchemaMismatch { .. })));
    assert_eq!(flags.enabled().unwrap(), vec!["B"]);
}

// =============================================================================
// Records and attributes
// =============================================================================

#[test]
fn attributes_read_and_write_their_paths() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap().into_record().unwrap();

    assert_eq!(helmet.editor_id().unwrap().as_deref(), Some("ArmorIronHelmet"));
    assert_eq!(helmet.attr_value("full_name").unwrap(), Some(Value::Text("Iron Helmet".into())));
    assert_eq!(helmet.attr_value("armor_rating").unwrap(), Some(Value::Float(15.0)));
    assert!(matches!(helmet.attr("keywords").unwrap(), Some(Entry::Object(Object::Array(_)))));

    helmet.set_attr("armor_rating", 18.5).unwrap();
    assert_eq!(f.engine.value_at(f.helmet, "DNAM").as_deref(), Some("18.500000"));
    helmet.set_editor_id("ArmorSteelHelmet").unwrap();
    assert_eq!(helmet.name().unwrap(), "ArmorSteelHelmet");

    assert!(matches!(helmet.attr("unknown"), Err(XEditError::SchemaMismatch { .. })));
    assert!(matches!(
        helmet.set_attr("armor_rating", "heavy"),
        Err(XEditError::InvariantViolation(_))
    ));
    assert!(matches!(helmet.set_attr("keywords", 1), Err(XEditError::InvariantViolation(_))));
}

#[test]
fn missing_attributes_are_created_then_cleared() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap().into_record().unwrap();

    assert!(helmet.attr("description").unwrap().is_none());
    helmet.set_attr("description", "Sturdy").unwrap();
    assert_eq!(f.engine.value_at(f.helmet, "DESC").as_deref(), Some("Sturdy"));

    helmet.clear_attr("description").unwrap();
    assert!(!helmet.has("DESC").unwrap());
    // clearing twice is fine
    helmet.clear_attr("description").unwrap();

    assert!(matches!(
        helmet.clear_attr("object_bounds"),
        Err(XEditError::InvariantViolation(_))
    ));
}

#[test]
fn failed_writes_remove_what_they_created() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap().into_record().unwrap();

    f.engine.fail_next(NativeFn::SetUIntValue, "write refused");
    let err = helmet.set_attr("enchantment", Value::FormId(KEYWORD_ID)).unwrap_err();
    assert!(matches!(err, XEditError::NativeCall(_)));
    assert!(!helmet.has("EITM").unwrap());

    helmet.set_attr("enchantment", Value::FormId(KEYWORD_ID)).unwrap();
    assert_eq!(helmet.attr_value("object_effect").unwrap(), Some(Value::FormId(KEYWORD_ID)));
}

#[test]
fn placed_object_coordinates() {
    let f = fixture();
    let reference = f.engine.add_record(f.skyrim, "REFR", f.engine.form_id(f.skyrim, 0x1000), "");
    let axis = |name: &str| {
        NodeSpec::structure(
            name,
            vec![NodeSpec::float("X", 1.0), NodeSpec::float("Y", 2.0), NodeSpec::float("Z", 3.0)],
        )
    };
    f.engine.add_child(
        reference,
        NodeSpec::structure("DATA", vec![axis("Position"), axis("Rotation")]),
    );
    let session = f.open();
    let placed = session.element("Skyrim.esm\\REFR\\00001000").unwrap().into_record().unwrap();

    assert_eq!(placed.position().unwrap(), [1.0, 2.0, 3.0]);
    placed.set_rotation([0.5, 0.0, -0.5]).unwrap();
    assert_eq!(placed.rotation().unwrap(), [0.5, 0.0, -0.5]);

    let helmet = session.element(HELMET).unwrap().into_record().unwrap();
    assert!(matches!(helmet.position(), Err(XEditError::InvariantViolation(_))));
}

#[test]
fn failed_coordinate_writes_remove_created_containers() {
    let f = fixture();
    let reference = f.engine.add_record(f.skyrim, "REFR", f.engine.form_id(f.skyrim, 0x1001), "");
    let axis = |name: &str| {
        NodeSpec::structure(
            name,
            vec![NodeSpec::float("X", 0.0), NodeSpec::float("Y", 0.0), NodeSpec::float("Z", 0.0)],
        )
    };
    f.engine.allow_child(
        reference,
        NodeSpec::structure("DATA", vec![axis("Position"), axis("Rotation")]),
    );
    let session = f.open();
    let placed = session.element("Skyrim.esm\\REFR\\00001001").unwrap().into_record().unwrap();
    assert!(!placed.has("DATA").unwrap());

    f.engine.fail_next(NativeFn::SetFloatValue, "write refused");
    assert!(matches!(placed.set_position([4.0, 5.0, 6.0]), Err(XEditError::NativeCall(_))));
    assert!(!placed.has("DATA").unwrap());
    assert_eq!(f.engine.live_handles(), 1);

    placed.set_position([4.0, 5.0, 6.0]).unwrap();
    assert_eq!(placed.position().unwrap(), [4.0, 5.0, 6.0]);
}

#[test]
fn head_part_file_paths_are_sorted_and_unique() {
    let f = fixture();
    let part = f.engine.add_record(f.skyrim, "HDPT", f.engine.form_id(f.skyrim, 0x2000), "HairMale01");
    f.engine.add_child(
        part,
        NodeSpec::structure("Model", vec![NodeSpec::string("MODL", "Actors\\Hair\\Male01.nif")]),
    );
    let entry = |file: &str| NodeSpec::structure("Part", vec![NodeSpec::string("NAM1", file)]);
    f.engine.add_child(
        part,
        NodeSpec::array(
            "Parts",
            entry(""),
            vec![entry("Actors\\Hair\\Male01.tri"), entry("Actors\\Hair\\Male01.nif"), entry("")],
        ),
    );
    f.engine.add_child(part, NodeSpec::enumeration("PNAM", &HEAD_PART_TYPES, "Hair"));
    let session = f.open();
    let record = session.element("Skyrim.esm\\HDPT\\00002000").unwrap().into_record().unwrap();

    assert_eq!(
        record.file_paths().unwrap(),
        vec!["Meshes\\Actors\\Hair\\Male01.nif", "Meshes\\Actors\\Hair\\Male01.tri"]
    );
    assert_eq!(record.attr_value("headpart_type").unwrap(), Some(Value::Enum("Hair".into())));
    record.set_attr("headpart_type", "Eyes").unwrap();
    assert!(matches!(
        record.set_attr("headpart_type", "Nose"),
        Err(XEditError::InvariantViolation(_))
    ));
}
