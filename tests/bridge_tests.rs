//! Variable-length results through a session: every fill copies exactly
//! what the staging call reported.

mod common;

use common::{HELMET, fixture};
use proptest::prelude::*;
use xedit::XEditError;
use xedit_ffi::NativeFn;

fn assert_exact_fills(engine: &xedit_ffi::MockEngine) {
    let fills = engine.fills();
    assert!(!fills.is_empty());
    for fill in fills {
        assert_eq!(fill.copied, fill.staged, "{:?} copied a different length", fill.func);
        assert_eq!(fill.max_len, fill.staged, "{:?} asked for a different length", fill.func);
    }
}

#[test]
fn strings_and_arrays_fill_exactly() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    assert_eq!(helmet.long_path().unwrap(), "Skyrim.esm\\ARMO\\00012E46");
    let children = helmet.children().unwrap();
    assert!(!children.is_empty());
    assert_eq!(session.plugin_names().unwrap().len(), 3);

    let funcs: Vec<NativeFn> = f.engine.fills().iter().map(|fill| fill.func).collect();
    assert!(funcs.contains(&NativeFn::GetResultString));
    assert!(funcs.contains(&NativeFn::GetResultArray));
    assert_exact_fills(&f.engine);
}

#[test]
fn empty_results_skip_the_fill() {
    let f = fixture();
    let session = f.open();
    let patch = session.file_by_name("Patch.esp").unwrap().unwrap();
    f.engine.clear_calls();

    assert_eq!(patch.author().unwrap(), "");
    assert!(patch.master_names().unwrap().is_empty());
    assert_eq!(f.engine.count_calls(NativeFn::GetResultString), 0);
}

#[test]
fn engine_failures_carry_the_side_channel() {
    let f = fixture();
    let session = f.open();
    let helmet = session.element(HELMET).unwrap();

    f.engine.fail_next(NativeFn::SetValue, "Value rejected");
    let err = helmet.set("FULL", "Steel Helmet").unwrap_err();
    let XEditError::NativeCall(failure) = &err else {
        panic!("expected an engine failure, got {err:?}");
    };
    assert_eq!(failure.operation, "SetValue");
    assert_eq!(failure.message, "Value rejected");

    // the next call succeeds and the value is untouched
    assert_eq!(f.engine.value_at(f.helmet, "FULL").as_deref(), Some("Iron Helmet"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn text_of_any_length_survives_the_fill(text in "\\PC{0,300}") {
        let f = fixture();
        let session = f.open();
        let helmet = session.element(HELMET).unwrap();

        helmet.set("FULL", text.as_str()).unwrap();
        f.engine.clear_calls();
        let read = helmet.value("FULL").unwrap().unwrap();
        prop_assert_eq!(read.as_str(), Some(text.as_str()));
        for fill in f.engine.fills() {
            prop_assert_eq!(fill.copied, fill.staged);
        }
    }
}
