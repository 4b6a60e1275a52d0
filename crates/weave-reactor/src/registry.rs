use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    rc::Rc,
};

use slab::Slab;
use weave_interface::{Callback, Interest};

/// Callback handle that can be invoked without borrowing the [Registry].
pub type SharedCallback = Rc<RefCell<Callback>>;

struct Registration {
    fd: RawFd,
    interest: Interest,
    callback: SharedCallback,
}

pub struct Registry {
    slab: Slab<Registration>,
    index: HashMap<(RawFd, Interest), usize>,
}

impl Registry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: Slab::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    pub fn contains(&self, fd: RawFd, interest: Interest) -> bool {
        self.index.contains_key(&(fd, interest))
    }

    pub fn insert(&mut self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()> {
        if self.contains(fd, interest) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("fd {fd} is already registered for {interest:?}"),
            ));
        }

        let key = self.slab.insert(Registration {
            fd,
            interest,
            callback: Rc::new(RefCell::new(callback)),
        });
        self.index.insert((fd, interest), key);

        Ok(())
    }

    pub fn remove(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        let key = self.index.remove(&(fd, interest)).ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("fd {fd} is not registered for {interest:?}"),
            )
        })?;

        let registration = self.slab.remove(key);
        debug_assert_eq!((registration.fd, registration.interest), (fd, interest));

        Ok(())
    }

    pub fn callback(&self, fd: RawFd, interest: Interest) -> Option<SharedCallback> {
        let key = self.index.get(&(fd, interest))?;
        Some(Rc::clone(&self.slab[*key].callback))
    }

    /// One `pollfd` per registered descriptor, ordered by descriptor.
    pub fn pollfds(&self) -> Vec<libc::pollfd> {
        let mut events: BTreeMap<RawFd, libc::c_short> = BTreeMap::new();
        for (_, registration) in self.slab.iter() {
            *events.entry(registration.fd).or_default() |= match registration.interest {
                Interest::Read => libc::POLLIN,
                Interest::Write => libc::POLLOUT,
            };
        }

        events
            .into_iter()
            .map(|(fd, events)| libc::pollfd {
                fd,
                events,
                revents: 0,
            })
            .collect()
    }
}

/// Interests satisfied by the `revents` of a polled descriptor.
///
/// Hangups, errors and closed descriptors wake both directions so the owner
/// can observe them through its next read or write.
pub fn ready_interests(revents: libc::c_short) -> impl Iterator<Item = Interest> {
    let failed = revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0;
    let read = failed || revents & libc::POLLIN != 0;
    let write = failed || revents & libc::POLLOUT != 0;

    [(read, Interest::Read), (write, Interest::Write)]
        .into_iter()
        .filter_map(|(ready, interest)| ready.then_some(interest))
}
