mod join;
mod task;
mod waker;

use std::{future::Future, task::Context};

use futures::channel::oneshot;
use tracing::debug;
use weave_interface::{NopReactor, Reactor};

pub use join::JoinHandle;
use task::TaskQueue;
use waker::waker;

/// Single threaded executor for the async side of the bridge.
///
/// Tasks are polled in rounds; between rounds the executor runs one
/// iteration of its reactor, which is where suspended fibers get resumed
/// and their deferreds resolved.
pub struct Executor<R = NopReactor> {
    queue: TaskQueue,
    reactor: R,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::with_reactor(NopReactor)
    }
}

impl<R> Executor<R>
where
    R: Reactor,
{
    pub fn with_reactor(reactor: R) -> Self {
        Self {
            queue: TaskQueue::new(),
            reactor,
        }
    }

    pub fn reactor(&self) -> &R {
        &self.reactor
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        self.queue.schedule(async move {
            let _ = sender.send(future.await);
        });

        JoinHandle::new(receiver)
    }

    /// Run until `future` and every other spawned task finish.
    ///
    /// Does not return while some task is parked on a fiber that never
    /// gets resumed, use [Executor::turn] to drive a bounded number of
    /// rounds instead.
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + 'static,
    {
        let mut handle = self.spawn(future);

        self.run();

        handle
            .try_join()
            .expect("Failed to complete future. Deadlock maybe?")
    }

    pub fn run(&self) {
        while self.turn() {}
    }

    /// Poll every ready task once, then wait on the reactor once.
    ///
    /// Returns false once no tasks remain.
    pub fn turn(&self) -> bool {
        if self.queue.is_done() {
            return false;
        }

        debug!("Executing tasks");
        for task in self.queue.drain() {
            let waker = waker(task.clone());
            let mut cx = Context::from_waker(&waker);
            let _ = task.poll(&mut cx);
        }

        if !self.queue.has_ready() && !self.queue.is_done() {
            debug!("Waiting on reactor");
            self.reactor.wait();
        }

        !self.queue.is_done()
    }
}
