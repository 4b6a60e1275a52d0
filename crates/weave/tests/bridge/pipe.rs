use std::{io, time::Duration};

use weave::{spawn, wait_ready, Fiber, Interest};
use weave_executor::Executor;
use weave_reactor::PollReactor;

use crate::helpers::{read_byte, write_byte, Pipe};

fn reactor() -> PollReactor {
    PollReactor::options()
        .timeout(Some(Duration::from_secs(5)))
        .build()
}

#[test]
fn read_when_ready() {
    let reactor = reactor();
    let exe = Executor::with_reactor(reactor.clone());
    let pipe = Pipe::new();

    let fd = pipe.read;
    let handle = reactor.clone();
    let deferred = spawn(move |fiber: Fiber| async move {
        wait_ready(&fiber, handle, fd, Interest::Read).await?;
        Ok::<_, io::Error>(read_byte(fd)?)
    });

    assert!(!deferred.is_resolved());
    assert_eq!(reactor.active(), 1);

    pipe.send(9);

    let value = exe.block_on(async move { deferred.value_or_failure().await });

    assert_eq!(value.unwrap(), 9);
    assert_eq!(reactor.active(), 0);
}

#[test]
fn ping_pong() {
    let reactor = reactor();
    let exe = Executor::with_reactor(reactor.clone());
    let pipe = Pipe::new();

    let (read, write) = (pipe.read, pipe.write);

    let handle = reactor.clone();
    let reader = spawn(move |fiber: Fiber| async move {
        let mut sum = 0u32;
        for _ in 0..3 {
            wait_ready(&fiber, &handle, read, Interest::Read).await?;
            sum += read_byte(read)? as u32;
        }
        Ok::<_, io::Error>(sum)
    });

    let handle = reactor.clone();
    let writer = spawn(move |fiber: Fiber| async move {
        for byte in [1u8, 2, 3] {
            wait_ready(&fiber, &handle, write, Interest::Write).await?;
            write_byte(write, byte)?;
        }
        Ok::<_, io::Error>(())
    });

    assert!(!reader.is_resolved());
    assert!(!writer.is_resolved());

    let (sum, written) = exe.block_on(async move {
        let written = writer.value_or_failure().await;
        let sum = reader.value_or_failure().await;
        (sum, written)
    });

    assert!(written.is_ok());
    assert_eq!(sum.unwrap(), 6);
    assert_eq!(reactor.active(), 0);
}

#[test]
fn failure_reaches_awaiter() {
    let reactor = reactor();
    let exe = Executor::with_reactor(reactor.clone());
    let pipe = Pipe::new();

    let fd = pipe.read;
    let handle = reactor.clone();
    let deferred = spawn(move |fiber: Fiber| async move {
        wait_ready(&fiber, handle, fd, Interest::Read).await?;
        match read_byte(fd)? {
            0 => Err(io::Error::new(io::ErrorKind::InvalidData, "zero byte")),
            byte => Ok::<_, io::Error>(byte),
        }
    });

    pipe.send(0);

    let outcome = exe.block_on(async move { deferred.value_or_failure().await });

    let err = outcome.unwrap_err();
    assert_eq!(
        err.downcast_ref::<io::Error>().map(io::Error::kind),
        Some(io::ErrorKind::InvalidData)
    );
}
