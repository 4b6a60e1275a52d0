use std::io::ErrorKind;

use weave::{Interest, ReadinessWatcher, Reactor};

use crate::helpers::{finished_fiber, output, Event, MockReactor};

#[test]
fn interest_encoding() {
    assert_eq!(Interest::from_raw(1), Some(Interest::Read));
    assert_eq!(Interest::from_raw(2), Some(Interest::Write));
    assert_eq!(Interest::from_raw(0), None);
    assert_eq!(Interest::from_raw(3), None);
    assert_eq!(Interest::Write.as_raw(), 2);
}

#[test]
fn start_stop() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    let mut watcher = ReadinessWatcher::new(&fiber, reactor.clone(), 4, Interest::Read);
    assert!(!watcher.is_active());
    assert_eq!(watcher.owner(), fiber.id());

    watcher.start(|_: ()| {}, ()).unwrap();
    assert!(watcher.is_active());
    assert!(reactor.is_registered(4, Interest::Read));

    watcher.stop().unwrap();
    assert!(!watcher.is_active());
    assert!(!reactor.is_registered(4, Interest::Read));

    assert_eq!(
        reactor.log(),
        vec![
            Event::Register(4, Interest::Read),
            Event::Unregister(4, Interest::Read)
        ]
    );
}

#[test]
fn callback_gets_args() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();
    let (hits, location) = output(Vec::new());

    let mut watcher = ReadinessWatcher::new(&fiber, &reactor, 6, Interest::Write);
    watcher
        .start(
            move |(tag, n): (&'static str, u32)| location.borrow_mut().push(format!("{tag}{n}")),
            ("w", 6),
        )
        .unwrap();

    assert!(reactor.fire(6, Interest::Write));
    assert!(reactor.fire(6, Interest::Write));
    assert!(!reactor.fire(6, Interest::Read));

    watcher.stop().unwrap();
    assert!(!reactor.fire(6, Interest::Write));

    assert_eq!(hits.take(), vec!["w6", "w6"]);
}

#[test]
fn registration_error() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    reactor
        .register(8, Interest::Read, Box::new(|| {}))
        .unwrap();

    let mut watcher = ReadinessWatcher::new(&fiber, reactor.clone(), 8, Interest::Read);
    let err = watcher.start(|_: ()| {}, ()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(!watcher.is_active());
    assert_eq!(reactor.active(), 1);

    let mut invalid = ReadinessWatcher::new(&fiber, reactor.clone(), -1, Interest::Write);
    let err = invalid.start(|_: ()| {}, ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn same_pair_after_stop() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    let mut first = ReadinessWatcher::new(&fiber, reactor.clone(), 3, Interest::Read);
    first.start(|_: ()| {}, ()).unwrap();
    first.stop().unwrap();

    let mut second = ReadinessWatcher::new(&fiber, reactor.clone(), 3, Interest::Read);
    second.start(|_: ()| {}, ()).unwrap();

    assert_eq!(reactor.active(), 1);
}

#[test]
#[should_panic(expected = "without being started")]
fn stop_before_start() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    let mut watcher = ReadinessWatcher::new(&fiber, reactor, 4, Interest::Read);
    let _ = watcher.stop();
}

#[test]
#[should_panic(expected = "without being started")]
fn stop_twice() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    let mut watcher = ReadinessWatcher::new(&fiber, reactor.clone(), 4, Interest::Read);
    watcher.start(|_: ()| {}, ()).unwrap();
    watcher.stop().unwrap();

    let _ = watcher.stop();
}

#[test]
#[should_panic(expected = "started once")]
fn start_twice() {
    let reactor = MockReactor::new();
    let fiber = finished_fiber();

    let mut watcher = ReadinessWatcher::new(&fiber, reactor.clone(), 4, Interest::Read);
    watcher.start(|_: ()| {}, ()).unwrap();

    let _ = watcher.start(|_: ()| {}, ());
}
