//! Handle bookkeeping benchmarks.
//!
//! Measures the registry on its own and a session driving the in-memory
//! engine, so the cost of frame tracking can be told apart from the cost of
//! the call bridge.
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use xedit::{GameMode, Session, SessionConfig, XEditResult};
use xedit_core::Handle;
use xedit_ffi::MockEngine;
use xedit_ffi::mock::NodeSpec;
use xedit_registry::HandleRegistry;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

fn noop(_: Handle) -> XEditResult<()> {
    Ok(())
}

fn engine_with_records(count: u32) -> MockEngine {
    let engine = MockEngine::new();
    let file = engine.add_plugin("Bench.esp");
    for local in 0..count {
        let record = engine.add_record(file, "ARMO", engine.form_id(file, 0x800 + local), &format!("Armor{local}"));
        engine.add_child(record, NodeSpec::string("FULL", "Armor"));
        engine.add_child(record, NodeSpec::float("DNAM", 10.0));
    }
    engine
}

fn open(engine: &MockEngine) -> Session {
    let config = SessionConfig::new(GameMode::SkyrimSE).with_poll_interval(Duration::ZERO);
    Session::open(config, engine.clone()).expect("mock session opens")
}

// ============================================================================
// Registry
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("registry");

    for count in [16u32, 256, 4096] {
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::new("track_and_exit", count), &count, |b, &count| {
            b.iter(|| {
                let mut registry = HandleRegistry::new();
                registry.enter_scope();
                for raw in 1..=count {
                    black_box(registry.track(Handle::new(raw)));
                }
                let report = registry.exit_scope(&mut noop).expect("frame closes");
                end_profiling_frame();
                black_box(report)
            });
        });
    }

    group.bench_function("nested_promote", |b| {
        b.iter(|| {
            let mut registry = HandleRegistry::new();
            for depth in 1..=32u32 {
                registry.enter_scope();
                registry.track(Handle::new(depth));
            }
            for depth in (1..=32u32).rev() {
                registry.promote(Handle::new(depth)).expect("handle is tracked");
                registry.exit_scope(&mut noop).expect("frame closes");
            }
            black_box(registry.tracked())
        });
    });

    group.finish();
}

// ============================================================================
// Session
// ============================================================================

fn bench_session(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("session");
    group.measurement_time(Duration::from_secs(5));

    let engine = engine_with_records(64);
    let session = open(&engine);

    group.bench_function("lookup_in_scope", |b| {
        b.iter(|| {
            session
                .scope(|s| {
                    let record = s.element("Bench.esp\\ARMO\\00000800")?;
                    black_box(record.name())
                })
                .expect("scope closes");
            end_profiling_frame();
        });
    });

    group.bench_function("get_value", |b| {
        b.iter(|| black_box(session.get("Bench.esp\\ARMO\\00000800\\DNAM").expect("value reads")));
    });

    group.throughput(Throughput::Elements(64));
    group.bench_function("walk_records", |b| {
        b.iter(|| {
            session
                .scope(|s| {
                    let Some(file) = s.file_by_name("Bench.esp")? else {
                        return Ok(0);
                    };
                    let mut total = 0usize;
                    for record in file.records("ARMO", false)? {
                        total += record.children()?.len();
                    }
                    Ok(total)
                })
                .expect("scope closes")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_session);
criterion_main!(benches);
