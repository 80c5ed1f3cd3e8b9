//! Error types for the call queue

use std::any::Any;

/// Placeholder used when a panic payload is neither `&str` nor `String`
const NON_STRING_PANIC: &str = "work panicked with a non-string payload";

/// Errors that can surface from the call queue
///
/// The queue itself never fails. The only error is a panic raised by the
/// caller's work, and it is only turned into a value by the `run_catching`
/// variants; the plain `run` methods let the panic unwind untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallQueueError {
    /// The work for a key panicked
    #[error("Work for key '{key}' panicked: {message}")]
    WorkPanicked {
        /// Key the work was registered under
        key: String,
        /// Panic message, when the payload carried one
        message: String,
    },
}

impl CallQueueError {
    /// Build a [`CallQueueError::WorkPanicked`] from a caught panic payload
    pub(crate) fn from_panic(key: &str, payload: &(dyn Any + Send)) -> Self {
        Self::WorkPanicked {
            key: key.to_owned(),
            message: panic_message(payload),
        }
    }
}

/// Result type for call queue operations
pub type Result<T> = std::result::Result<T, CallQueueError>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        NON_STRING_PANIC.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_work_panicked_display() {
        let err = CallQueueError::WorkPanicked {
            key: "rebuild".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(format!("{}", err), "Work for key 'rebuild' panicked: boom");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_from_panic_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        let err = CallQueueError::from_panic("k", payload.as_ref());
        assert_eq!(
            err,
            CallQueueError::WorkPanicked {
                key: "k".to_string(),
                message: "static message".to_string(),
            }
        );
    }

    #[test]
    fn test_from_panic_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(format!("formatted {}", 42));
        let err = CallQueueError::from_panic("k", payload.as_ref());
        assert!(format!("{}", err).contains("formatted 42"));
    }

    #[test]
    fn test_from_panic_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(17_u32);
        let err = CallQueueError::from_panic("", payload.as_ref());
        assert!(format!("{}", err).contains(NON_STRING_PANIC));
        assert!(format!("{}", err).contains("key ''"));
    }
}
