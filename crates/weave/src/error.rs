use std::{any::Any, error::Error, rc::Rc};

/// Failure of a spawned callable, observed through its
/// [Deferred](crate::Deferred).
///
/// Cloning is cheap, every observer of the same deferred sees the same
/// failure.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(Rc<dyn Error>),

    /// `location` is where the panic was raised, as `file:line:column`.
    #[error("task panicked: {message}")]
    Panicked {
        message: String,
        location: Option<String>,
    },
}

impl TaskError {
    pub(crate) fn failed(error: impl Into<Box<dyn Error>>) -> Self {
        TaskError::Failed(Rc::from(error.into()))
    }

    pub(crate) fn panicked(payload: Box<dyn Any + Send>, location: Option<String>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => String::from("Box<dyn Any>"),
            },
        };

        TaskError::Panicked { message, location }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked { .. })
    }

    /// Where the callable panicked, `None` for returned errors.
    pub fn location(&self) -> Option<&str> {
        match self {
            TaskError::Failed(_) => None,
            TaskError::Panicked { location, .. } => location.as_deref(),
        }
    }

    /// The error returned by the callable, if it is an `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            TaskError::Failed(error) => error.downcast_ref::<E>(),
            TaskError::Panicked { .. } => None,
        }
    }
}
