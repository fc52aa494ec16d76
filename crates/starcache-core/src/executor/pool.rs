use crate::error::InternalError;
use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    thread::{self, JoinHandle},
};

type Job = Box<dyn FnOnce() + Send + 'static>;

///
/// WorkerPool
///
/// Fixed set of threads running SQL loads. Jobs are taken in submission
/// order; a panicking job is logged and the worker keeps running.
///

#[derive(Debug)]
pub(crate) struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    pub(crate) fn new(size: usize) -> Result<Self, InternalError> {
        if size == 0 {
            return Err(InternalError::config_invalid(
                "worker pool needs at least one thread",
            ));
        }

        let (tx, rx) = unbounded::<Job>();
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("starcache-worker-{i}"))
                .spawn(move || {
                    for job in rx.iter() {
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::warn!("worker job panicked");
                        }
                    }
                })
                .map_err(|err| {
                    InternalError::executor_internal(format!("cannot spawn worker: {err}"))
                })?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
            size,
        })
    }

    pub(crate) const fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<(), InternalError> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(InternalError::shutdown("worker pool is shut down"));
        };

        sender
            .send(Box::new(job))
            .map_err(|_| InternalError::shutdown("worker pool is shut down"))
    }

    /// Stop accepting jobs, let queued jobs finish, and join every worker.
    pub(crate) fn shutdown(&self) {
        drop(self.sender.lock().take());

        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
