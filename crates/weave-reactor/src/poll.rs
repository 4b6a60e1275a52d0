use std::{
    cell::RefCell,
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    rc::Rc,
    time::Duration,
};

use tracing::{debug, trace, warn};
use weave_interface::{Callback, Interest, Reactor};

use crate::registry::{ready_interests, Registry};

pub struct PollOptions {
    capacity: usize,
    timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            capacity: 64,
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Upper bound for a single [PollReactor::wait], `None` blocks until
    /// some descriptor is ready.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> PollReactor {
        PollReactor {
            inner: Rc::new(RefCell::new(Inner {
                registry: Registry::with_capacity(self.capacity),
                timeout: self.timeout,
            })),
        }
    }
}

struct Inner {
    registry: Registry,
    timeout: Option<Duration>,
}

/// Reactor implemented over `poll(2)`.
///
/// Cloning yields another handle to the same reactor, which is how
/// watchers and executors share it on one thread.
#[derive(Clone)]
pub struct PollReactor {
    inner: Rc<RefCell<Inner>>,
}

impl Default for PollReactor {
    fn default() -> Self {
        PollReactor::options().build()
    }
}

impl PollReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options() -> PollOptions {
        PollOptions::default()
    }

    /// Returns number of live registrations.
    pub fn active(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    pub fn is_registered(&self, fd: RawFd, interest: Interest) -> bool {
        self.inner.borrow().registry.contains(fd, interest)
    }

    fn dispatch(&self, fd: RawFd, interest: Interest) {
        // a previous callback in this round may have unregistered it
        let Some(callback) = self.inner.borrow().registry.callback(fd, interest) else {
            trace!(fd, ?interest, "Skipping stale readiness");
            return;
        };

        let Ok(mut callback) = callback.try_borrow_mut() else {
            warn!(fd, ?interest, "Callback is already running");
            return;
        };

        trace!(fd, ?interest, "Dispatching");
        (*callback)();
    }
}

/// `poll(2)` timeout, rounded up so a short non-zero timeout still blocks.
fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        Some(timeout) => timeout
            .as_nanos()
            .div_ceil(1_000_000)
            .min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    }
}

fn validate(fd: RawFd) -> Result<()> {
    if fd < 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("invalid descriptor {fd}"),
        ));
    }

    if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
        return Err(Error::last_os_error());
    }

    Ok(())
}

impl Reactor for PollReactor {
    fn register(&self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()> {
        validate(fd)?;
        self.inner
            .borrow_mut()
            .registry
            .insert(fd, interest, callback)?;

        debug!(fd, ?interest, "Registered");
        Ok(())
    }

    fn unregister(&self, fd: RawFd, interest: Interest) -> Result<()> {
        self.inner.borrow_mut().registry.remove(fd, interest)?;

        debug!(fd, ?interest, "Unregistered");
        Ok(())
    }

    fn wait(&self) {
        let mut fds = {
            let inner = self.inner.borrow();
            if inner.registry.is_empty() {
                return;
            }
            inner.registry.pollfds()
        };

        let timeout = timeout_millis(self.inner.borrow().timeout);
        debug!(count = fds.len(), timeout, "Polling");

        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if ret < 0 {
            let err = Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                trace!("Poll interrupted");
                return;
            }
            panic!("poll failed: {err}");
        }

        let ready: Vec<(RawFd, Interest)> = fds
            .iter()
            .flat_map(|pollfd| ready_interests(pollfd.revents).map(move |i| (pollfd.fd, i)))
            .collect();

        debug!(ready = ready.len(), "Poll returned");

        for (fd, interest) in ready {
            self.dispatch(fd, interest);
        }
    }
}
