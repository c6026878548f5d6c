use thiserror::Error;

/// Error types that can occur while registering tokens and NFC bindings.
///
/// Registrars never hand these to callers as `Err` values from their public
/// operations; they are folded into the `Error` / `Rejected` variants of
/// [`TokenOutcome`](crate::TokenOutcome) and
/// [`BindingOutcome`](crate::BindingOutcome). Collaborators (identity
/// verifiers, storage backends, hashers) do return them directly.
///
/// # Error Categories
///
/// - **Authentication Errors**: `InvalidToken`
/// - **Upstream Errors**: `UpstreamUnavailable`, `StudentNotFound`
/// - **System Errors**: `PersistenceError`, `SerializationError`, `HashingError`, `ConfigError`
///
/// # Example
///
/// ```rust
/// use nfc_canvas_auth::RegistryError;
///
/// let err = RegistryError::from_persistence_message("disk full");
/// assert!(err.is_persistence());
/// assert_eq!(err.to_string(), "Persistence error: disk full");
/// ```
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The LMS refused the token.
    ///
    /// Returned by identity verifiers when the token is unknown, expired or
    /// revoked. Not retriable without a new token.
    #[error("Token rejected by identity provider")]
    InvalidToken,

    /// The identity provider could not be reached or answered unexpectedly.
    ///
    /// Covers transport failures, timeouts and non-success status codes
    /// other than an explicit rejection.
    #[error("Identity provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No student with the given login id exists in the course.
    #[error("No student '{login_id}' found in course '{course_id}'")]
    StudentNotFound { login_id: String, course_id: String },

    /// Writing or reading the backing store failed.
    ///
    /// When this surfaces from a registrar, the committed in-memory state is
    /// unchanged and the whole operation can be retried with the same inputs.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The secret hasher failed to produce a digest.
    #[error("Hashing error: {0}")]
    HashingError(String),

    /// The registry was assembled with invalid or missing settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RegistryError {
    /// Wraps a backend-specific error as a persistence failure.
    pub fn from_persistence_error<E: std::fmt::Display>(err: E) -> Self {
        Self::PersistenceError(err.to_string())
    }

    /// Builds a persistence failure from a plain message.
    pub fn from_persistence_message(msg: impl Into<String>) -> Self {
        Self::PersistenceError(msg.into())
    }

    /// True when the identity provider could not be reached or gave no usable answer.
    ///
    /// Definite answers such as `InvalidToken` or `StudentNotFound` are not
    /// upstream failures.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// True when the identity provider definitively refused the token or the student.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::StudentNotFound { .. })
    }

    /// True when the backing store could not be written or read.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::SerializationError(_))
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::from_persistence_error(err)
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
