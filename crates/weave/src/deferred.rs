use std::{
    cell::RefCell,
    fmt,
    future::Future,
    mem,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use futures::future::FusedFuture;

use crate::TaskError;

enum State<T> {
    Pending(Vec<Waker>),
    Resolved(Result<T, TaskError>),
}

struct Inner<T> {
    state: RefCell<State<T>>,
}

impl<T> Inner<T> {
    fn resolve(&self, outcome: Result<T, TaskError>) {
        let previous = mem::replace(&mut *self.state.borrow_mut(), State::Resolved(outcome));
        match previous {
            State::Pending(wakers) => wakers.into_iter().for_each(Waker::wake),
            State::Resolved(_) => panic!("Deferred already resolved"),
        }
    }

    fn is_resolved(&self) -> bool {
        matches!(&*self.state.borrow(), State::Resolved(_))
    }
}

/// Single assignment cell holding the outcome of a spawned task.
///
/// Every clone observes the same outcome. Readers never block, use
/// [Deferred::value_or_failure] from an async caller to wait for it.
pub struct Deferred<T> {
    inner: Rc<Inner<T>>,
}

/// Write half of a [Deferred], consumed by resolving it.
pub(crate) struct Resolver<T> {
    inner: Rc<Inner<T>>,
}

pub(crate) fn deferred<T>() -> (Resolver<T>, Deferred<T>) {
    let inner = Rc::new(Inner {
        state: RefCell::new(State::Pending(Vec::new())),
    });

    (
        Resolver {
            inner: Rc::clone(&inner),
        },
        Deferred { inner },
    )
}

impl<T> Resolver<T> {
    pub fn resolve(self, outcome: Result<T, TaskError>) {
        self.inner.resolve(outcome)
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Deferred<T> {
    pub fn is_resolved(&self) -> bool {
        self.inner.is_resolved()
    }

    /// Inspect the outcome without waiting, `None` while pending.
    pub fn with_result<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Result<T, TaskError>) -> R,
    {
        match &*self.inner.state.borrow() {
            State::Pending(_) => None,
            State::Resolved(outcome) => Some(f(outcome)),
        }
    }
}

impl<T: Clone> Deferred<T> {
    pub fn result(&self) -> Option<Result<T, TaskError>> {
        self.with_result(Clone::clone)
    }

    /// Wait for the outcome: the value, or the failure the task raised.
    ///
    /// For async callers driven by a real waker, such as tasks on an
    /// executor. A fiber awaiting a pending deferred is never woken, fibers
    /// only resume through [Waiter::switch](crate::Waiter::switch).
    pub fn value_or_failure(&self) -> ValueOrFailure<T> {
        ValueOrFailure {
            deferred: self.clone(),
            done: false,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

pub struct ValueOrFailure<T> {
    deferred: Deferred<T>,
    done: bool,
}

impl<T: Clone> Future for ValueOrFailure<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = Pin::into_inner(self);
        assert!(!this.done, "ValueOrFailure polled after completion");

        match &mut *this.deferred.inner.state.borrow_mut() {
            State::Pending(wakers) => {
                if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }

            State::Resolved(outcome) => {
                this.done = true;
                Poll::Ready(outcome.clone())
            }
        }
    }
}

impl<T: Clone> FusedFuture for ValueOrFailure<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
