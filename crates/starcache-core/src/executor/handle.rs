use crate::error::InternalError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};

/// Create a connected promise/handle pair.
pub(crate) fn promise<T>() -> (Promise<T>, Handle<T>) {
    let (tx, rx) = bounded(1);

    (Promise { tx }, Handle { rx })
}

///
/// Handle
///
/// The eventual result of work submitted to the executor or a worker.
/// Resolves exactly once; a handle whose producer went away resolves to a
/// shutdown error.
///

#[derive(Debug)]
pub struct Handle<T> {
    rx: Receiver<Result<T, InternalError>>,
}

impl<T> Handle<T> {
    /// A handle that is already resolved.
    #[must_use]
    pub fn ready(result: Result<T, InternalError>) -> Self {
        let (promise, handle) = promise();
        promise.fulfill(result);

        handle
    }

    /// Block until the result is available.
    pub fn wait(self) -> Result<T, InternalError> {
        self.rx
            .recv()
            .map_err(|_| dropped())
            .and_then(|result| result)
    }

    /// The result if it is available now. Call at most once after it
    /// returns `Some`.
    #[must_use]
    pub fn try_wait(&self) -> Option<Result<T, InternalError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(dropped())),
        }
    }
}

fn dropped() -> InternalError {
    InternalError::shutdown("operation was dropped before it completed")
}

///
/// Promise
///

#[derive(Debug)]
pub(crate) struct Promise<T> {
    tx: Sender<Result<T, InternalError>>,
}

impl<T> Promise<T> {
    pub(crate) fn fulfill(self, result: Result<T, InternalError>) {
        if self.tx.send(result).is_err() {
            tracing::trace!("result handle dropped before completion");
        }
    }
}
