//! Error types for netlink operations.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised by observer code.
///
/// Stored verbatim in [`Error::Observer`] so callers can downcast it back to
/// the concrete type they returned.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during netlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Socket allocation or connection failed.
    #[error("{operation} failed: {source}")]
    Socket {
        /// The socket call that failed (`socket`, `bind`, ...).
        operation: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A required attribute was absent.
    #[error("missing attribute {attr}")]
    MissingAttribute {
        /// Attribute type that was looked up.
        attr: u16,
    },

    /// Attribute does not fit the 16-bit attribute or 32-bit message length.
    #[error("attribute {attr} overflows the message ({len} payload bytes)")]
    AttributeOverflow {
        /// Attribute type being appended.
        attr: u16,
        /// Payload length that did not fit.
        len: usize,
    },

    /// Sequence number mismatch.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Expected sequence number.
        expected: u32,
        /// Actual sequence number received.
        actual: u32,
    },

    /// Parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Generic netlink family is not registered in the kernel.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// The family name that was looked up.
        name: String,
    },

    /// Link is not present in the link cache.
    #[error("link not found: ifindex {ifindex}")]
    LinkNotFound {
        /// The interface index that was looked up.
        ifindex: i32,
    },

    /// The observer returned an error while handling an event.
    #[error("observer failed: {0}")]
    Observer(ObserverError),

    /// A listener call was made in the wrong state.
    #[error("invalid listener state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    /// Create a kernel error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Create a kernel error with operation context.
    pub fn from_errno_with_context(errno: i32, operation: impl Into<String>) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::KernelWithContext {
            operation: operation.into(),
            errno: -errno,
            message,
        }
    }

    /// Wrap an OS error raised by a socket call.
    pub(crate) fn socket(operation: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Socket { operation, source }
    }

    /// Add context to this error.
    ///
    /// Wraps kernel errors with operation context. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, libc::ENOENT | libc::ENODEV)
            }
            Self::FamilyNotFound { .. } | Self::LinkNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this error comes from a datagram that violates netlink framing.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::InvalidMessage(_)
                | Self::InvalidAttribute(_)
                | Self::Parse(_)
        )
    }

    /// Check if the kernel dropped notifications because the receive queue was full.
    pub fn is_overrun(&self) -> bool {
        match self {
            Self::Io(e) => e.raw_os_error() == Some(libc::ENOBUFS),
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Borrow the observer failure, if this is one.
    pub fn observer_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Observer(e) => Some(&**e),
            _ => None,
        }
    }

    /// Take back the observer failure, if this is one.
    pub fn into_observer_error(self) -> Option<ObserverError> {
        match self {
            Self::Observer(e) => Some(e),
            _ => None,
        }
    }
}
