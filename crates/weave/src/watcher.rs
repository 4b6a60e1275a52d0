use std::{io::Result, os::fd::RawFd};

use tracing::debug;
use weave_interface::{Interest, Reactor};

use crate::fiber::{Fiber, FiberId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WatcherState {
    Idle,
    Started,
    Stopped,
}

/// Interest in a single descriptor event, registered with a [Reactor].
///
/// Created for one suspension: [start](ReadinessWatcher::start) registers,
/// [stop](ReadinessWatcher::stop) unregisters, after which the watcher is
/// spent.
pub struct ReadinessWatcher<R: Reactor> {
    fd: RawFd,
    interest: Interest,
    owner: FiberId,
    reactor: R,
    state: WatcherState,
}

impl<R: Reactor> ReadinessWatcher<R> {
    pub fn new(owner: &Fiber, reactor: R, fd: RawFd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            owner: owner.id(),
            reactor,
            state: WatcherState::Idle,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn owner(&self) -> FiberId {
        self.owner
    }

    pub fn is_active(&self) -> bool {
        self.state == WatcherState::Started
    }

    /// Register with the reactor, `callback(args)` runs on every readiness
    /// notification until [stop](ReadinessWatcher::stop).
    ///
    /// Registration errors are returned as is and leave the watcher idle.
    pub fn start<F, A>(&mut self, callback: F, args: A) -> Result<()>
    where
        F: Fn(A) + 'static,
        A: Clone + 'static,
    {
        ensure!(
            self.state == WatcherState::Idle,
            "ReadinessWatcher can only be started once"
        );

        let trampoline = move || callback(args.clone());
        self.reactor
            .register(self.fd, self.interest, Box::new(trampoline))?;

        debug!(fiber = %self.owner, fd = self.fd, interest = ?self.interest, "Watching");
        self.state = WatcherState::Started;

        Ok(())
    }

    /// Unregister from the reactor. Panics unless the watcher is started.
    pub fn stop(&mut self) -> Result<()> {
        ensure!(
            self.state == WatcherState::Started,
            "ReadinessWatcher stopped without being started"
        );

        self.state = WatcherState::Stopped;
        self.reactor.unregister(self.fd, self.interest)?;

        debug!(fiber = %self.owner, fd = self.fd, interest = ?self.interest, "Unwatched");
        Ok(())
    }
}
