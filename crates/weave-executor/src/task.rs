use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use flume::{Receiver, Sender};

type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

pub struct Task {
    scheduled: Cell<bool>,
    future: RefCell<Option<BoxFuture>>,
    queue: RefCell<Option<Sender<Rc<Task>>>>,
}

impl Task {
    pub fn poll(&self, cx: &mut Context) -> Poll<()> {
        self.scheduled.set(false);

        let mut slot = self.future.borrow_mut();
        let Some(future) = slot.as_mut() else {
            return Poll::Ready(());
        };

        let poll = future.as_mut().poll(cx);
        if poll.is_ready() {
            // a finished task may outlive its future inside stale wakers,
            // it must not count as live for the queue
            slot.take();
            self.queue.take();
        }

        poll
    }

    /// Queue the task for the next round, at most once per round.
    pub fn schedule(self: &Rc<Self>) {
        if self.scheduled.replace(true) {
            return;
        }

        if let Some(queue) = self.queue.borrow().as_ref() {
            // only fails while the executor is being dropped
            let _ = queue.send(Rc::clone(self));
        }
    }
}

pub struct TaskQueue {
    sender: Sender<Rc<Task>>,
    receiver: Receiver<Rc<Task>>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    pub fn schedule<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let task = Rc::new(Task {
            scheduled: Cell::new(false),
            future: RefCell::new(Some(Box::pin(future))),
            queue: RefCell::new(Some(self.sender.clone())),
        });

        task.schedule();
    }

    pub fn drain(&self) -> impl Iterator<Item = Rc<Task>> + '_ {
        self.receiver.try_iter()
    }

    pub fn has_ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// True once every spawned task has finished or was dropped, tasks
    /// parked on a waker still count.
    pub fn is_done(&self) -> bool {
        self.receiver.sender_count() == 1
    }
}
