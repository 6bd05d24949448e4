//! Error types for event registration, dispatch and argument access

/// Result type for event operations
pub type EventResult<T> = Result<T, EventError>;

/// Error type for event operations
///
/// Registry operations report these through diagnostics and return a plain
/// success flag; the typed accessors and `try_*` entry points surface them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    /// Producer and listener parameter lists are not compatible
    #[error(
        "Invalid Operation, failed convert signature. EventName = ({event}), Signal Signature = ({expected}), Broadcast Signature = ({actual})"
    )]
    SignatureMismatch {
        /// Event name
        event: String,
        /// Signature the event is bound to
        expected: String,
        /// Signature that was offered
        actual: String,
    },

    /// Listener signature cannot be invoked from the event's signature
    #[error(
        "Failed register listener for event ({event}). Signal Signature = ({expected}), Listener Signature = ({actual})"
    )]
    ListenerMismatch {
        /// Event name
        event: String,
        /// Signature the event is bound to
        expected: String,
        /// Signature of the rejected listener
        actual: String,
    },

    /// No signal is bound to the event name
    #[error("Event not found: {0}")]
    UnknownEvent(String),

    /// A reflected function cannot be used as a listener
    #[error("Function {0} is not a valid event listener")]
    InvalidSignature(String),

    /// Method lookup on a reflected object failed
    #[error("Method {method} not found on {object}")]
    MethodNotFound {
        /// Class name of the target object
        object: String,
        /// Requested method name
        method: String,
    },

    /// Argument index past the end of a tuple
    #[error("Argument index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of packed arguments
        len: usize,
    },

    /// Argument stored with a different type than requested
    #[error("Type mismatch at argument {index}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Argument index
        index: usize,
        /// Requested type
        expected: String,
        /// Recorded type
        actual: String,
    },

    /// Raw type layout that cannot be placed in a tuple
    #[error("Invalid layout for type {name}: size {size}, align {align}")]
    InvalidLayout {
        /// Type name
        name: String,
        /// Declared size
        size: usize,
        /// Declared alignment
        align: usize,
    },

    /// The signal is already dispatching
    #[error("Signal for event {0} is already broadcasting")]
    Locked(String),
}

impl EventError {
    /// Create a signature mismatch error
    pub fn mismatch(
        event: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        EventError::SignatureMismatch {
            event: event.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
