use std::{io::Result, os::fd::RawFd};

use weave_interface::{Interest, Reactor};

use crate::{Fiber, ReadinessWatcher, Waiter};

/// Park `fiber` until `fd` is ready for `interest`.
///
/// This is what a would-block call does inside a spawned callable: the
/// fiber suspends, the reactor keeps running, and the call continues once
/// the descriptor is ready. If the descriptor never becomes ready the
/// fiber stays suspended and keeps its registration alive, there is no
/// timeout.
pub async fn wait_ready<R>(fiber: &Fiber, reactor: R, fd: RawFd, interest: Interest) -> Result<()>
where
    R: Reactor,
{
    let waiter = Waiter::new(fiber);
    let mut watcher = ReadinessWatcher::new(fiber, reactor, fd, interest);

    watcher.start(|waiter: Waiter<()>| waiter.switch(()), waiter.clone())?;
    waiter.get().await;

    let stopped = watcher.stop();
    waiter.clear();

    stopped
}
