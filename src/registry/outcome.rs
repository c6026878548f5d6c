use crate::RegistryError;

/// Why a token registration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The LMS said the token is not valid
    InvalidToken,
    /// The LMS could not be asked; treated as a rejection
    UpstreamUnavailable,
    /// The token belongs to a student account
    StudentAccount,
}

/// Result of [`TokenRegistrar::register`](crate::TokenRegistrar::register).
#[derive(Debug)]
pub enum TokenOutcome {
    /// A new token record was stored
    Registered,
    /// The token was already known; its verification time was refreshed
    Updated,
    /// The token was refused and nothing was stored
    Rejected(RejectReason),
    /// The decision was made but could not be persisted or hashed
    Error(RegistryError),
}

impl TokenOutcome {
    /// True for `Registered` and `Updated`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Registered | Self::Updated)
    }

    /// Short tag for logs and response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Updated => "updated",
            Self::Rejected(_) => "rejected",
            Self::Error(_) => "error",
        }
    }
}

/// Result of [`NfcRegistrar::register_binding`](crate::NfcRegistrar::register_binding).
#[derive(Debug)]
pub enum BindingOutcome {
    /// The login id was bound to a card for the first time
    Registered,
    /// The login id's existing binding now points at this card
    Updated,
    /// The card already belongs to another login id; nothing was changed
    Conflict {
        login_id: String,
        full_name: String,
        nfc_id: String,
    },
    /// Identity resolution or persistence failed
    Error(RegistryError),
}

impl BindingOutcome {
    /// True for `Registered` and `Updated`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Registered | Self::Updated)
    }

    /// Short tag for logs and response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Updated => "updated",
            Self::Conflict { .. } => "conflict",
            Self::Error(_) => "error",
        }
    }
}
