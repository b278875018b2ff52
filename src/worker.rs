//! A session owned by a dedicated thread.
//!
//! The engine must only ever be driven from one thread. [`EngineWorker`]
//! opens the session on its own thread and runs closures sent to it one at
//! a time, so any number of threads can share the engine through it.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};
use xedit_core::{XEditError, XEditResult};
use xedit_ffi::NativeApi;
use xedit_registry::ScopeReport;

use crate::config::SessionConfig;
use crate::session::Session;

type Job = Box<dyn FnOnce(&Session) + Send>;

pub struct EngineWorker {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<XEditResult<ScopeReport>>>,
}

impl EngineWorker {
    /// Start the worker thread and open a session on it.
    ///
    /// `factory` runs on the worker thread, so the engine it returns never
    /// crosses threads. Returns once the session is open, or with the error
    /// that kept it from opening.
    pub fn spawn<A, F>(config: SessionConfig, factory: F) -> XEditResult<Self>
    where
        A: NativeApi + 'static,
        F: FnOnce() -> XEditResult<A> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<XEditResult<()>>();

        let handle = thread::Builder::new()
            .name("xedit-engine".to_string())
            .spawn(move || {
                let session = match factory().and_then(|api| Session::open(config, api)) {
                    Ok(session) => session,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return Ok(ScopeReport::default());
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let mut jobs = 0usize;
                for job in receiver {
                    job(&session);
                    jobs += 1;
                }
                debug!(jobs, "engine worker draining");
                session.close()
            })
            .map_err(|e| XEditError::invariant(format!("failed to start engine thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sender: Some(sender),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(XEditError::WorkerGone)
            }
        }
    }

    /// Run `f` on the worker thread and wait for its result.
    ///
    /// `f` runs inside its own scope: every handle it obtains is released
    /// when it returns, which is why results must be owned data.
    pub fn run<R, F>(&self, f: F) -> XEditResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Session) -> XEditResult<R> + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(XEditError::WorkerGone)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        let job: Job = Box::new(move |session| {
            let _ = reply_tx.send(session.scope(|s| f(s)));
        });
        sender.send(job).map_err(|_| XEditError::WorkerGone)?;
        reply_rx.recv().map_err(|_| XEditError::WorkerGone)?
    }

    /// Close the session and join the thread.
    pub fn close(mut self) -> XEditResult<ScopeReport> {
        self.finish()
    }

    fn finish(&mut self) -> XEditResult<ScopeReport> {
        drop(self.sender.take());
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| XEditError::WorkerGone)?,
            None => Ok(ScopeReport::default()),
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "engine worker did not shut down cleanly");
        }
    }
}

impl std::fmt::Debug for EngineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use xedit_core::GameMode;
    use xedit_ffi::MockEngine;

    fn config() -> SessionConfig {
        SessionConfig::new(GameMode::SkyrimSE).with_poll_interval(Duration::ZERO)
    }

    fn engine() -> XEditResult<MockEngine> {
        let engine = MockEngine::new();
        engine.add_plugin("Skyrim.esm");
        engine.add_plugin("Update.esm");
        Ok(engine)
    }

    #[test]
    fn runs_closures_on_the_engine_thread() {
        let worker = EngineWorker::spawn(config(), engine).unwrap();
        let names = worker.run(|session| session.plugin_names()).unwrap();
        assert_eq!(names, vec!["Skyrim.esm", "Update.esm"]);

        let caller = thread::current().id();
        let engine_thread = worker.run(|_| Ok(thread::current().id())).unwrap();
        assert_ne!(caller, engine_thread);
    }

    #[test]
    fn shared_between_threads() {
        let worker = std::sync::Arc::new(EngineWorker::spawn(config(), engine).unwrap());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let worker = worker.clone();
                thread::spawn(move || worker.run(|session| session.plugin_count()).unwrap())
            })
            .collect();
        for t in threads {
            assert_eq!(t.join().unwrap(), 2);
        }
    }

    #[test]
    fn handles_do_not_outlive_a_job() {
        let worker = EngineWorker::spawn(config(), engine).unwrap();
        worker
            .run(|session| {
                let plugin = session.file_by_name("Skyrim.esm")?;
                Ok(plugin.is_some())
            })
            .unwrap();
        let tracked = worker.run(|session| Ok(session.tracked_handles())).unwrap();
        assert_eq!(tracked, 0);
        let report = worker.close().unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn open_failure_is_reported() {
        let err = EngineWorker::spawn(config().with_load_order(["Missing.esp"]), || Ok(MockEngine::new())).unwrap_err();
        assert!(matches!(err, XEditError::Loader(_)));

        let err = EngineWorker::spawn(config(), || Err::<MockEngine, _>(XEditError::WorkerGone)).unwrap_err();
        assert!(matches!(err, XEditError::WorkerGone));
    }
}
