use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::future::FusedFuture;
use tracing::trace;

use crate::fiber::{Fiber, FiberId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Suspended,
    Resumed,
    Done,
}

struct Inner<T> {
    fiber: RefCell<Option<Fiber>>,
    parent: Cell<Option<FiberId>>,
    phase: Cell<Phase>,
    value: RefCell<Option<T>>,
}

/// One-shot rendezvous between a suspended fiber and whoever resumes it.
///
/// The fiber parks itself with `waiter.get().await`, control goes back to
/// whatever resumed the fiber last. A later [Waiter::switch] resumes the
/// fiber in place and `get` evaluates to the switched value.
pub struct Waiter<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Waiter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Waiter<T> {
    /// Panics unless `fiber` is the innermost running fiber.
    pub fn new(fiber: &Fiber) -> Self {
        ensure!(
            fiber.is_running(),
            "Waiter must be created from inside fiber {}, which is {:?}",
            fiber.id(),
            fiber.state()
        );

        Self {
            inner: Rc::new(Inner {
                fiber: RefCell::new(Some(fiber.clone())),
                parent: Cell::new(fiber.parent()),
                phase: Cell::new(Phase::Idle),
                value: RefCell::new(None),
            }),
        }
    }

    /// Id of the fiber this waiter resumes, `None` once cleared.
    pub fn fiber(&self) -> Option<FiberId> {
        self.inner.fiber.borrow().as_ref().map(Fiber::id)
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.inner.parent.get()
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.phase.get() == Phase::Suspended
    }

    /// Suspend the current fiber until [Waiter::switch] is called.
    ///
    /// Can only be awaited once per waiter.
    pub fn get(&self) -> Get<T> {
        ensure!(
            self.inner.phase.get() == Phase::Idle,
            "Waiter::get called more than once"
        );

        Get {
            waiter: self.clone(),
            done: false,
        }
    }

    /// Resume the suspended fiber with `value`, returns once the fiber
    /// suspends again or finishes.
    pub fn switch(&self, value: T) {
        ensure!(
            self.inner.phase.get() == Phase::Suspended,
            "Waiter::switch called on a fiber that is not suspended"
        );

        let Some(fiber) = self.inner.fiber.borrow().clone() else {
            violation!("Waiter::switch called after clear");
        };

        trace!(fiber = %fiber.id(), "Switching");
        self.inner.value.replace(Some(value));
        self.inner.phase.set(Phase::Resumed);

        fiber.resume();
    }

    /// Drop the fiber references so a finished fiber is not kept alive.
    pub fn clear(&self) {
        self.inner.fiber.take();
        self.inner.parent.take();
    }
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("fiber", &self.fiber())
            .field("parent", &self.parent())
            .field("phase", &self.inner.phase.get())
            .finish()
    }
}

/// Suspension point returned by [Waiter::get].
pub struct Get<T> {
    waiter: Waiter<T>,
    done: bool,
}

impl<T> Future for Get<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = Pin::into_inner(self);
        let inner = &this.waiter.inner;

        match inner.phase.get() {
            Phase::Idle => {
                let running = inner
                    .fiber
                    .borrow()
                    .as_ref()
                    .is_some_and(Fiber::is_running);
                ensure!(running, "Waiter::get awaited outside of its fiber");

                inner.phase.set(Phase::Suspended);
                Poll::Pending
            }

            // another waiter of this fiber was switched
            Phase::Suspended => violation!("Waiter::get polled again before switch"),

            Phase::Resumed => {
                inner.phase.set(Phase::Done);
                this.done = true;
                let value = inner.value.take();
                Poll::Ready(value.unwrap_or_else(|| unreachable!("resumed without a value")))
            }

            Phase::Done => violation!("Waiter::get polled after completion"),
        }
    }
}

impl<T> FusedFuture for Get<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
