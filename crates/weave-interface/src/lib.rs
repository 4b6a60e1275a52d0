use std::{
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    rc::Rc,
};

/// Readiness event a descriptor can be watched for.
///
/// The call interception layer encodes events as a bitmask where only
/// `1` (read) and `2` (write) are ever produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interest {
    Read,
    Write,
}

impl Interest {
    pub const RAW_READ: u32 = 1;
    pub const RAW_WRITE: u32 = 2;

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::RAW_READ => Some(Interest::Read),
            Self::RAW_WRITE => Some(Interest::Write),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u32 {
        match self {
            Interest::Read => Self::RAW_READ,
            Interest::Write => Self::RAW_WRITE,
        }
    }
}

/// Invoked by the reactor every time the registered descriptor is ready.
pub type Callback = Box<dyn FnMut()>;

/// Single threaded readiness notification loop.
///
/// At most one callback may be registered per descriptor and [Interest].
/// Callbacks run from inside [Reactor::wait] and are allowed to call back
/// into the reactor, in particular to unregister themselves.
pub trait Reactor {
    fn register(&self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()>;
    fn unregister(&self, fd: RawFd, interest: Interest) -> Result<()>;

    /// Run one iteration of the loop, dispatching every ready callback.
    fn wait(&self);
}

impl<R: Reactor + ?Sized> Reactor for &R {
    fn register(&self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()> {
        (**self).register(fd, interest, callback)
    }

    fn unregister(&self, fd: RawFd, interest: Interest) -> Result<()> {
        (**self).unregister(fd, interest)
    }

    fn wait(&self) {
        (**self).wait()
    }
}

impl<R: Reactor + ?Sized> Reactor for Rc<R> {
    fn register(&self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()> {
        (**self).register(fd, interest, callback)
    }

    fn unregister(&self, fd: RawFd, interest: Interest) -> Result<()> {
        (**self).unregister(fd, interest)
    }

    fn wait(&self) {
        (**self).wait()
    }
}

/// Reactor without any descriptors, for pure computations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopReactor;

impl Reactor for NopReactor {
    fn register(&self, _fd: RawFd, _interest: Interest, _callback: Callback) -> Result<()> {
        Err(Error::new(
            ErrorKind::Unsupported,
            "NopReactor does not watch descriptors",
        ))
    }

    fn unregister(&self, _fd: RawFd, _interest: Interest) -> Result<()> {
        Err(Error::new(
            ErrorKind::NotFound,
            "NopReactor does not watch descriptors",
        ))
    }

    fn wait(&self) {}
}
