use std::{
    cell::RefCell,
    collections::HashMap,
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    rc::Rc,
    sync::Once,
};

use weave::{spawn, Callback, Fiber, Interest, Reactor};

static TRACING: Once = Once::new();
pub fn setup_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
            .init();
    });
}

pub fn output<T>(init: T) -> (Rc<RefCell<T>>, Rc<RefCell<T>>) {
    let location = Rc::new(RefCell::new(init));
    (location.clone(), location)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Register(RawFd, Interest),
    Unregister(RawFd, Interest),
}

#[derive(Default)]
struct MockInner {
    callbacks: HashMap<(RawFd, Interest), Rc<RefCell<Callback>>>,
    log: Vec<Event>,
    waits: usize,
}

/// Reactor that never polls anything, readiness is injected with
/// [MockReactor::fire].
#[derive(Clone, Default)]
pub struct MockReactor {
    inner: Rc<RefCell<MockInner>>,
}

impl MockReactor {
    pub fn new() -> Self {
        setup_tracing();
        Self::default()
    }

    /// Run the callback registered for `fd` and `interest`, if any.
    pub fn fire(&self, fd: RawFd, interest: Interest) -> bool {
        let callback = self.inner.borrow().callbacks.get(&(fd, interest)).cloned();
        match callback {
            Some(callback) => {
                let mut callback = callback.borrow_mut();
                (*callback)();
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, fd: RawFd, interest: Interest) -> bool {
        self.inner.borrow().callbacks.contains_key(&(fd, interest))
    }

    pub fn active(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    pub fn log(&self) -> Vec<Event> {
        self.inner.borrow().log.clone()
    }

    pub fn waits(&self) -> usize {
        self.inner.borrow().waits
    }
}

impl Reactor for MockReactor {
    fn register(&self, fd: RawFd, interest: Interest, callback: Callback) -> Result<()> {
        if fd < 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "negative descriptor"));
        }

        let mut inner = self.inner.borrow_mut();
        if inner.callbacks.contains_key(&(fd, interest)) {
            return Err(Error::new(ErrorKind::AlreadyExists, "already registered"));
        }

        inner
            .callbacks
            .insert((fd, interest), Rc::new(RefCell::new(callback)));
        inner.log.push(Event::Register(fd, interest));

        Ok(())
    }

    fn unregister(&self, fd: RawFd, interest: Interest) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.callbacks.remove(&(fd, interest)).is_none() {
            return Err(Error::new(ErrorKind::NotFound, "not registered"));
        }

        inner.log.push(Event::Unregister(fd, interest));
        Ok(())
    }

    fn wait(&self) {
        self.inner.borrow_mut().waits += 1;
    }
}

/// Handle of a fiber that already ran to completion.
pub fn finished_fiber() -> Fiber {
    let (fiber, location) = output(None);

    let deferred = spawn(move |fiber: Fiber| async move {
        location.borrow_mut().replace(fiber);
        Ok::<_, std::convert::Infallible>(())
    });
    assert!(deferred.is_resolved());

    let fiber = fiber.take().unwrap();
    assert!(fiber.is_finished());
    fiber
}

pub struct Pipe {
    pub read: RawFd,
    pub write: RawFd,
}

impl Pipe {
    pub fn new() -> Self {
        setup_tracing();
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        Self {
            read: fds[0],
            write: fds[1],
        }
    }

    pub fn send(&self, byte: u8) {
        assert_eq!(write_byte(self.write, byte).unwrap(), 1);
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read);
            libc::close(self.write);
        }
    }
}

pub fn write_byte(fd: RawFd, byte: u8) -> Result<usize> {
    let ret = unsafe { libc::write(fd, (&byte as *const u8).cast(), 1) };
    if ret < 0 {
        return Err(Error::last_os_error());
    }
    Ok(ret as usize)
}

pub fn read_byte(fd: RawFd) -> Result<u8> {
    let mut byte = 0u8;
    let ret = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
    match ret {
        1 => Ok(byte),
        0 => Err(Error::new(ErrorKind::UnexpectedEof, "pipe closed")),
        _ => Err(Error::last_os_error()),
    }
}
