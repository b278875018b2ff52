//! Property tests: arbitrary scope nesting releases every handle exactly once.

use std::collections::BTreeSet;

use proptest::prelude::*;

use xedit_core::{Handle, XEditError, XEditResult};
use xedit_registry::{HandleRegistry, HandleReleaser};

/// Engine stand-in that recycles numbers and rejects double releases.
#[derive(Default)]
struct Engine {
    live: BTreeSet<u32>,
    free: BTreeSet<u32>,
    next: u32,
    double_releases: usize,
}

impl Engine {
    fn allocate(&mut self) -> Handle {
        let raw = self.free.pop_first().unwrap_or_else(|| {
            self.next += 1;
            self.next
        });
        self.live.insert(raw);
        Handle(raw)
    }
}

impl HandleReleaser for Engine {
    fn release_handle(&mut self, handle: Handle) -> XEditResult<()> {
        if !self.live.remove(&handle.raw()) {
            self.double_releases += 1;
            return Err(XEditError::InvalidHandleUse { handle });
        }
        self.free.insert(handle.raw());
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Op {
    Enter,
    Exit,
    Track,
    Release(usize),
    Promote(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Enter),
        2 => Just(Op::Exit),
        4 => Just(Op::Track),
        1 => any::<usize>().prop_map(Op::Release),
        1 => any::<usize>().prop_map(Op::Promote),
    ]
}

proptest! {
    #[test]
    fn prop_every_handle_released_once(ops in prop::collection::vec(op(), 0..200)) {
        let mut engine = Engine::default();
        let mut registry = HandleRegistry::new();
        let mut held: Vec<Handle> = Vec::new();

        for op in ops {
            match op {
                Op::Enter => {
                    registry.enter_scope();
                }
                Op::Exit => {
                    if registry.depth() > 1 {
                        let report = registry.exit_scope(&mut engine).unwrap();
                        prop_assert!(report.is_clean());
                    }
                }
                Op::Track => {
                    let handle = engine.allocate();
                    registry.track(handle);
                    held.push(handle);
                }
                Op::Release(i) if !held.is_empty() => {
                    let handle = held[i % held.len()];
                    registry.release(handle, &mut engine).unwrap();
                }
                Op::Promote(i) if !held.is_empty() => {
                    let handle = held[i % held.len()];
                    // Failing promotions leave ownership untouched.
                    let _ = registry.promote(handle);
                }
                _ => {}
            }
        }

        while registry.depth() > 1 {
            prop_assert!(registry.exit_scope(&mut engine).unwrap().is_clean());
        }
        prop_assert!(registry.release_all(&mut engine).is_clean());

        prop_assert_eq!(engine.double_releases, 0);
        prop_assert!(engine.live.is_empty());
        prop_assert_eq!(registry.tracked(), 0);
    }

    #[test]
    fn prop_promoted_handles_survive_inner_exit(extra in 0usize..10) {
        let mut engine = Engine::default();
        let mut registry = HandleRegistry::new();
        registry.enter_scope();
        registry.enter_scope();
        let kept = engine.allocate();
        let kept_ref = registry.track(kept);
        for _ in 0..extra {
            let h = engine.allocate();
            registry.track(h);
        }
        registry.promote(kept).unwrap();
        let report = registry.exit_scope(&mut engine).unwrap();

        prop_assert_eq!(report.released, extra);
        prop_assert!(registry.is_live(kept_ref));
        prop_assert_eq!(engine.live.len(), 1);
    }
}
