use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};

use futures::{future::LocalBoxFuture, task::noop_waker_ref};
use tracing::{debug, trace};

use crate::{deferred::Deferred, task::Task, unwind};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // innermost last
    static RUNNING: RefCell<Vec<Fiber>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiberState {
    Created,
    /// Innermost running fiber, the only one a [Waiter](crate::Waiter) can
    /// be built for or awaited in.
    Running,
    /// Running, but a fiber it resumed has control right now.
    Nested,
    Suspended,
    Finished,
}

struct FiberInner {
    id: FiberId,
    parent: Option<FiberId>,
    state: Cell<FiberState>,
    body: RefCell<Option<LocalBoxFuture<'static, ()>>>,
}

/// Handle to an execution context.
///
/// A fiber owns its body and runs it only when explicitly resumed, either
/// by [spawn](crate::spawn) for the first time or by
/// [Waiter::switch](crate::Waiter::switch) after every suspension.
/// Whoever resumes a fiber regains control when the fiber suspends or
/// finishes.
#[derive(Clone)]
pub struct Fiber {
    inner: Rc<FiberInner>,
}

impl Fiber {
    pub(crate) fn new(parent: Option<FiberId>) -> Self {
        Self {
            inner: Rc::new(FiberInner {
                id: FiberId::next(),
                parent,
                state: Cell::new(FiberState::Created),
                body: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> FiberId {
        self.inner.id
    }

    /// Fiber that was running when this one was spawned, `None` for the
    /// root context.
    pub fn parent(&self) -> Option<FiberId> {
        self.inner.parent
    }

    pub fn state(&self) -> FiberState {
        self.inner.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == FiberState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state() == FiberState::Finished
    }

    /// Spawn a child fiber with this fiber as its parent.
    ///
    /// Same as [spawn](crate::spawn), control enters the child before this
    /// returns.
    pub fn spawn<F, Fut, T, E>(&self, callable: F) -> Deferred<T>
    where
        F: FnOnce(Fiber) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        T: 'static,
        E: Into<Box<dyn std::error::Error>> + 'static,
    {
        Task::new(Some(self.id()), callable).start()
    }

    pub(crate) fn load(&self, body: LocalBoxFuture<'static, ()>) {
        ensure!(
            self.state() == FiberState::Created,
            "Fiber {} already loaded",
            self.id()
        );
        self.inner.body.replace(Some(body));
    }

    /// Transfer control into the fiber until it suspends or finishes.
    ///
    /// The fiber that was running becomes [FiberState::Nested] until this
    /// returns. A panic unwinding out of the body leaves the fiber finished.
    pub(crate) fn resume(&self) {
        let id = self.id();
        match self.state() {
            FiberState::Created | FiberState::Suspended => {}
            FiberState::Running | FiberState::Nested => {
                violation!("Fiber {id} resumed while running")
            }
            FiberState::Finished => violation!("Fiber {id} resumed after it finished"),
        }

        trace!(fiber = %id, "Resuming");
        let _entered = Entered::new(self);

        let mut body = self.inner.body.borrow_mut();
        let Some(future) = body.as_mut() else {
            panic!("Fiber {id} has no body");
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                body.take();
                self.inner.state.set(FiberState::Finished);
                debug!(fiber = %id, "Finished");
            }

            Poll::Pending => {
                self.inner.state.set(FiberState::Suspended);
                trace!(fiber = %id, "Suspended");
            }
        }
    }
}

struct Entered<'a> {
    fiber: &'a Fiber,
}

impl<'a> Entered<'a> {
    fn new(fiber: &'a Fiber) -> Self {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            match running.last() {
                Some(outer) => outer.inner.state.set(FiberState::Nested),
                None => unwind::reset(),
            }
            running.push(fiber.clone());
        });

        fiber.inner.state.set(FiberState::Running);
        Self { fiber }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        // unwinding out of the body
        if self.fiber.state() == FiberState::Running {
            self.fiber.inner.state.set(FiberState::Finished);
        }

        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            running.pop();
            if let Some(outer) = running.last() {
                outer.inner.state.set(FiberState::Running);
            }
        });
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id())
            .field("parent", &self.parent())
            .field("state", &self.state())
            .finish()
    }
}
