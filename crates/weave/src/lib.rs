//! Run blocking style code as fibers on top of a single threaded reactor.
//!
//! [spawn] runs a callable in its own [Fiber] right away. When the callable
//! would block on a descriptor it pairs a [ReadinessWatcher] with a
//! [Waiter] (or just calls [wait_ready]) and suspends, handing control back
//! to whoever resumed it. The reactor later fires the watcher, which
//! switches back into the fiber exactly where it stopped. The outcome of
//! the callable lands in the [Deferred] returned by [spawn].
//!
//! Everything here is `!Send`, one reactor and at most one running fiber
//! per thread.

#[macro_use]
mod unwind;

mod deferred;
mod error;
mod fiber;
mod task;
mod wait;
mod waiter;
mod watcher;

pub use deferred::{Deferred, ValueOrFailure};
pub use error::TaskError;
pub use fiber::{Fiber, FiberId, FiberState};
pub use task::spawn;
pub use wait::wait_ready;
pub use waiter::{Get, Waiter};
pub use watcher::ReadinessWatcher;

pub use weave_interface::{Callback, Interest, NopReactor, Reactor};
