use std::{
    mem::ManuallyDrop,
    rc::Rc,
    task::{RawWaker, RawWakerVTable, Waker},
};

use crate::task::Task;

/// Waker that reschedules `task` on its executor.
///
/// Backed by an `Rc`, so it must never leave the executor thread. Fibers
/// and reactor callbacks run on that same thread.
pub fn waker(task: Rc<Task>) -> Waker {
    let raw = RawWaker::new(Rc::into_raw(task).cast::<()>(), &TaskWaker::VTABLE);
    unsafe { Waker::from_raw(raw) }
}

struct TaskWaker;

impl TaskWaker {
    const VTABLE: RawWakerVTable =
        RawWakerVTable::new(Self::clone, Self::wake, Self::wake_by_ref, Self::drop);

    unsafe fn borrow(ptr: *const ()) -> ManuallyDrop<Rc<Task>> {
        ManuallyDrop::new(Rc::from_raw(ptr.cast::<Task>()))
    }

    unsafe fn clone(ptr: *const ()) -> RawWaker {
        let task = Self::borrow(ptr);
        RawWaker::new(Rc::into_raw(Rc::clone(&task)).cast::<()>(), &Self::VTABLE)
    }

    unsafe fn wake(ptr: *const ()) {
        let task = Rc::from_raw(ptr.cast::<Task>());
        task.schedule();
    }

    unsafe fn wake_by_ref(ptr: *const ()) {
        Self::borrow(ptr).schedule();
    }

    unsafe fn drop(ptr: *const ()) {
        drop(Rc::from_raw(ptr.cast::<Task>()));
    }
}
