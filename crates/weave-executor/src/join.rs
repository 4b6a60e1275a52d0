use futures::channel::oneshot::Receiver;

/// Output of a task spawned on an [Executor](crate::Executor).
pub struct JoinHandle<T> {
    receiver: Receiver<T>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(receiver: Receiver<T>) -> Self {
        Self { receiver }
    }

    /// The output if the task already finished.
    pub fn try_join(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()?
    }

    /// Wait for the task, `None` if it was dropped before finishing.
    pub async fn join(self) -> Option<T> {
        self.receiver.await.ok()
    }
}
