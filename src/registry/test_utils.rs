//! Doubles shared by the registrar unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::storage::{MemoryStorage, Snapshot, SnapshotStorage, StorageStats};
use super::{IdentityVerifier, Profile, SecretHasher, StudentIdentity};
use crate::RegistryError;

/// Salted but cheap: `"<salt>:<raw>"`, with a fresh salt per call.
#[derive(Default)]
pub struct CountingHasher {
    salt: AtomicU64,
}

impl SecretHasher for CountingHasher {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn hash(&self, raw: &str) -> Result<String, RegistryError> {
        let salt = self.salt.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{salt}:{raw}"))
    }

    fn verify(&self, digest: &str, raw: &str) -> bool {
        digest.split_once(':').is_some_and(|(_, stored)| stored == raw)
    }
}

/// Deterministic hasher that takes `delay` per call, standing in for Argon2.
pub struct SlowHasher {
    delay: Duration,
}

impl SlowHasher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl SecretHasher for SlowHasher {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn hash(&self, raw: &str) -> Result<String, RegistryError> {
        std::thread::sleep(self.delay);
        Ok(format!("h:{raw}"))
    }

    fn verify(&self, digest: &str, raw: &str) -> bool {
        std::thread::sleep(self.delay);
        digest.strip_prefix("h:") == Some(raw)
    }
}

/// Hasher whose `hash` always fails.
pub struct BrokenHasher;

impl SecretHasher for BrokenHasher {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn hash(&self, _raw: &str) -> Result<String, RegistryError> {
        Err(RegistryError::HashingError("entropy source unavailable".to_string()))
    }

    fn verify(&self, _digest: &str, _raw: &str) -> bool {
        false
    }
}

/// Scripted identity provider.
#[derive(Default)]
pub struct MockVerifier {
    profiles: Mutex<HashMap<String, Profile>>,
    students: Mutex<HashMap<(String, String), StudentIdentity>>,
    offline: AtomicBool,
    pub verify_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, token: &str, name: &str, email: &str) -> Self {
        self.profiles.lock().unwrap().insert(
            token.to_string(),
            Profile {
                canvas_id: format!("id-{token}"),
                sortable_name: name.to_string(),
                primary_email: Some(email.to_string()),
            },
        );
        self
    }

    pub fn with_student(self, course_id: &str, login_id: &str, full_name: &str) -> Self {
        self.students.lock().unwrap().insert(
            (course_id.to_string(), login_id.to_string()),
            StudentIdentity {
                canvas_id: format!("cid-{login_id}"),
                full_name: full_name.to_string(),
            },
        );
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityVerifier for MockVerifier {
    async fn verify_token(&self, raw_token: &str) -> Result<Profile, RegistryError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::UpstreamUnavailable("connection refused".to_string()));
        }
        self.profiles
            .lock()
            .unwrap()
            .get(raw_token)
            .cloned()
            .ok_or(RegistryError::InvalidToken)
    }

    async fn resolve_student(
        &self,
        course_id: &str,
        login_id: &str,
    ) -> Result<StudentIdentity, RegistryError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::UpstreamUnavailable("connection refused".to_string()));
        }
        self.students
            .lock()
            .unwrap()
            .get(&(course_id.to_string(), login_id.to_string()))
            .cloned()
            .ok_or_else(|| RegistryError::StudentNotFound {
                login_id: login_id.to_string(),
                course_id: course_id.to_string(),
            })
    }
}

/// Memory storage that can be told to fail its saves.
pub struct FlakyStorage<T: Snapshot> {
    inner: MemoryStorage<T>,
    failing: AtomicBool,
}

impl<T: Snapshot> FlakyStorage<T> {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn persisted(&self) -> T {
        self.inner.snapshot().await
    }
}

#[async_trait]
impl<T: Snapshot> SnapshotStorage<T> for FlakyStorage<T> {
    async fn load(&self) -> Result<T, RegistryError> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: &T) -> Result<(), RegistryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::from_persistence_message("disk full"));
        }
        self.inner.save(snapshot).await
    }

    async fn get_stats(&self) -> Result<StorageStats, RegistryError> {
        self.inner.get_stats().await
    }
}
