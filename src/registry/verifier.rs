//! The external identity provider seam.
//!
//! The registry never talks to the LMS directly. Everything it needs from it
//! goes through [`IdentityVerifier`]: proving a bearer token is live, and
//! resolving a student's login id into their LMS identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// Profile of the account that owns a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The LMS's internal account id
    pub canvas_id: String,
    /// "Last, First" display form, stored alongside the token hash
    pub sortable_name: String,
    /// Primary email, if the LMS exposes one
    pub primary_email: Option<String>,
}

impl Profile {
    /// Whether the account's email classifies it as a student.
    ///
    /// Matching is a case-insensitive substring search for `marker`. An empty
    /// marker never matches.
    pub fn is_student(&self, marker: &str) -> bool {
        let marker = marker.trim();
        if marker.is_empty() {
            return false;
        }
        self.primary_email
            .as_deref()
            .is_some_and(|email| email.to_lowercase().contains(&marker.to_lowercase()))
    }
}

/// A student's identity within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    /// The LMS's internal account id
    pub canvas_id: String,
    /// Full display name
    pub full_name: String,
}

/// Verifies bearer tokens and resolves student identities against the LMS.
///
/// Implementations are responsible for their own timeouts; a call that times
/// out should return [`RegistryError::UpstreamUnavailable`].
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use nfc_canvas_auth::{IdentityVerifier, Profile, RegistryError, StudentIdentity};
///
/// struct StaticVerifier;
///
/// #[async_trait]
/// impl IdentityVerifier for StaticVerifier {
///     async fn verify_token(&self, raw_token: &str) -> Result<Profile, RegistryError> {
///         if raw_token == "teacher-token" {
///             Ok(Profile {
///                 canvas_id: "1".to_string(),
///                 sortable_name: "Teacher, Tina".to_string(),
///                 primary_email: Some("tina@school.example".to_string()),
///             })
///         } else {
///             Err(RegistryError::InvalidToken)
///         }
///     }
///
///     async fn resolve_student(
///         &self,
///         course_id: &str,
///         login_id: &str,
///     ) -> Result<StudentIdentity, RegistryError> {
///         Err(RegistryError::StudentNotFound {
///             login_id: login_id.to_string(),
///             course_id: course_id.to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Checks that `raw_token` is a live LMS token and returns its owner's profile.
    ///
    /// # Returns
    ///
    /// * `Ok(Profile)` - The token is valid
    /// * `Err(RegistryError::InvalidToken)` - The LMS rejected the token
    /// * `Err(RegistryError::UpstreamUnavailable)` - The LMS could not be asked
    async fn verify_token(&self, raw_token: &str) -> Result<Profile, RegistryError>;

    /// Looks up the student with `login_id` in course `course_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(StudentIdentity)` - The student was found
    /// * `Err(RegistryError::StudentNotFound)` - No such student in the course
    /// * `Err(RegistryError::UpstreamUnavailable)` - The LMS could not be asked
    async fn resolve_student(
        &self,
        course_id: &str,
        login_id: &str,
    ) -> Result<StudentIdentity, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: Option<&str>) -> Profile {
        Profile {
            canvas_id: "7".to_string(),
            sortable_name: "Doe, Jane".to_string(),
            primary_email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_student_marker_matches() {
        assert!(profile(Some("jane@student.school.example")).is_student("student"));
        assert!(profile(Some("Jane@STUDENT.school.example")).is_student("student"));
    }

    #[test]
    fn test_teacher_is_not_student() {
        assert!(!profile(Some("teacher@x")).is_student("student"));
        assert!(!profile(None).is_student("student"));
    }

    #[test]
    fn test_empty_marker_never_matches() {
        assert!(!profile(Some("jane@student.school.example")).is_student(""));
        assert!(!profile(Some("jane@student.school.example")).is_student("   "));
    }
}
