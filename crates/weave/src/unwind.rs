//! Panics that must not be captured by a task.
//!
//! Misuse of the fiber protocol panics through [violation], which marks the
//! panic on the current thread. Task entry re-raises marked panics instead
//! of turning them into a [TaskError](crate::TaskError), so they unwind all
//! the way out of whoever resumed the outermost fiber.

use std::{
    cell::{Cell, RefCell},
    fmt, panic,
    sync::Once,
};

thread_local! {
    static VIOLATION: Cell<bool> = const { Cell::new(false) };
    static LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

macro_rules! violation {
    ($($arg:tt)+) => {
        $crate::unwind::violation(format_args!($($arg)+))
    };
}

macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            violation!($($arg)+)
        }
    };
}

#[track_caller]
pub(crate) fn violation(args: fmt::Arguments<'_>) -> ! {
    VIOLATION.with(|flag| flag.set(true));
    panic!("{args}")
}

pub(crate) fn is_violation() -> bool {
    VIOLATION.with(Cell::get)
}

/// Forget a violation that already unwound out of every fiber.
pub(crate) fn reset() {
    VIOLATION.with(|flag| flag.set(false));
}

/// Chain a panic hook that remembers where the last panic on each thread
/// was raised. The previous hook still runs afterwards.
pub(crate) fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info.location().map(ToString::to_string);
            let _ = LOCATION.try_with(|cell| cell.replace(location));
            previous(info);
        }));
    });
}

/// Location of the last panic raised on this thread, if the hook saw it.
pub(crate) fn take_location() -> Option<String> {
    LOCATION.with(|cell| cell.take())
}
