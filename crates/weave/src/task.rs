use std::{
    error::Error,
    future::Future,
    panic::{self, AssertUnwindSafe},
};

use futures::FutureExt;
use tracing::debug;

use crate::{
    deferred::{deferred, Deferred, Resolver},
    fiber::{Fiber, FiberId},
    unwind, TaskError,
};

/// A callable bound to its own fiber and the [Deferred] it reports into.
pub(crate) struct Task<T> {
    fiber: Fiber,
    deferred: Deferred<T>,
}

impl<T: 'static> Task<T> {
    pub fn new<F, Fut, E>(parent: Option<FiberId>, callable: F) -> Self
    where
        F: FnOnce(Fiber) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<Box<dyn Error>> + 'static,
    {
        unwind::install_hook();

        let fiber = Fiber::new(parent);
        let (resolver, deferred) = deferred();

        fiber.load(Box::pin(entry(fiber.clone(), callable, resolver)));

        Self { fiber, deferred }
    }

    /// Enter the fiber, returns once it suspends or finishes.
    pub fn start(self) -> Deferred<T> {
        debug!(fiber = %self.fiber.id(), parent = ?self.fiber.parent(), "Spawning");
        self.fiber.resume();
        self.deferred
    }
}

/// Fiber entry point, the only place a task's deferred gets resolved.
///
/// Protocol violations keep unwinding, the deferred of every fiber they
/// pass through stays pending.
async fn entry<F, Fut, T, E>(fiber: Fiber, callable: F, resolver: Resolver<T>)
where
    F: FnOnce(Fiber) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Box<dyn Error>>,
{
    let id = fiber.id();
    let run = async move { callable(fiber).await };

    let outcome = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TaskError::failed(error)),
        Err(payload) if unwind::is_violation() => panic::resume_unwind(payload),
        Err(payload) => Err(TaskError::panicked(payload, unwind::take_location())),
    };

    if let Err(error) = &outcome {
        debug!(fiber = %id, %error, "Task failed");
    }

    resolver.resolve(outcome);
}

/// Run `callable` in a new fiber, returning the [Deferred] of its outcome.
///
/// The callable starts right away and runs until it first suspends on a
/// [Waiter](crate::Waiter), or to completion. Errors and panics it raises
/// are captured into the deferred and never escape `spawn`, except for
/// misuse of [Waiter](crate::Waiter) or
/// [ReadinessWatcher](crate::ReadinessWatcher), which panics through.
pub fn spawn<F, Fut, T, E>(callable: F) -> Deferred<T>
where
    F: FnOnce(Fiber) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    T: 'static,
    E: Into<Box<dyn Error>> + 'static,
{
    Task::new(None, callable).start()
}
