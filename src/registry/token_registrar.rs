use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::hasher::token_fingerprint;
use super::storage::SnapshotStorage;
use super::{
    ConcurrencyGuard, IdentityVerifier, RejectReason, SecretHasher, TokenOutcome, TokenRecord,
    TokenStore,
};
use crate::RegistryError;

/// Registers LMS tokens as caller credentials and authenticates callers.
///
/// A token is accepted only after the LMS confirms it and its owner is not a
/// student. Accepted tokens are stored as salted digests; registering a known
/// token again only refreshes its verification time.
///
/// Every `register` runs entirely inside the [`ConcurrencyGuard`] scope,
/// including the call to the identity provider. This serializes registrations
/// behind LMS latency, which is acceptable at the request rates this service
/// sees and keeps the duplicate check trivially race-free.
pub struct TokenRegistrar {
    tokens: Arc<RwLock<TokenStore>>,
    storage: Arc<dyn SnapshotStorage<TokenStore>>,
    verifier: Arc<dyn IdentityVerifier>,
    hasher: Arc<dyn SecretHasher>,
    guard: ConcurrencyGuard,
    student_marker: String,
}

impl TokenRegistrar {
    /// Creates a registrar over an already loaded token store.
    pub fn new(
        tokens: TokenStore,
        storage: Arc<dyn SnapshotStorage<TokenStore>>,
        verifier: Arc<dyn IdentityVerifier>,
        hasher: Arc<dyn SecretHasher>,
        guard: ConcurrencyGuard,
    ) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
            storage,
            verifier,
            hasher,
            guard,
            student_marker: "student".to_string(),
        }
    }

    /// Loads the token store from `storage` and creates a registrar over it.
    pub async fn load(
        storage: Arc<dyn SnapshotStorage<TokenStore>>,
        verifier: Arc<dyn IdentityVerifier>,
        hasher: Arc<dyn SecretHasher>,
        guard: ConcurrencyGuard,
    ) -> Result<Self, RegistryError> {
        let tokens = storage.load().await?;
        tracing::debug!("Loaded {} registered token(s)", tokens.len());
        Ok(Self::new(tokens, storage, verifier, hasher, guard))
    }

    /// Sets the email marker that classifies an account as a student.
    ///
    /// Defaults to `"student"`.
    pub fn with_student_marker(mut self, marker: impl Into<String>) -> Self {
        self.student_marker = marker.into();
        self
    }

    /// Runs `f` against the hasher on the blocking thread pool.
    ///
    /// Argon2 verification costs tens of milliseconds per digest, so digest
    /// scans and hashing never run on a runtime worker.
    async fn run_hashing<R, F>(&self, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&dyn SecretHasher) -> R + Send + 'static,
        R: Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || f(hasher.as_ref()))
            .await
            .map_err(|e| RegistryError::HashingError(format!("Hashing task failed: {e}")))
    }

    /// Registers `raw_token`, or refreshes it if it is already known.
    ///
    /// 1. Asks the identity provider to verify the token
    /// 2. Refuses tokens owned by student accounts
    /// 3. Scans stored digests for a match
    /// 4. Refreshes the match, or hashes and appends a new record
    /// 5. Persists the new snapshot, then commits it in memory
    ///
    /// A persistence failure returns [`TokenOutcome::Error`] and leaves the
    /// committed store untouched, so retrying reaches the same decision.
    pub async fn register(&self, raw_token: &str) -> TokenOutcome {
        let fingerprint = token_fingerprint(raw_token);
        let _scope = self.guard.enter().await;

        let profile = match self.verifier.verify_token(raw_token).await {
            Ok(profile) => profile,
            Err(RegistryError::InvalidToken) => {
                tracing::warn!("Token {} rejected by identity provider", fingerprint);
                return TokenOutcome::Rejected(RejectReason::InvalidToken);
            }
            Err(e) => {
                tracing::warn!("Could not verify token {}: {}", fingerprint, e);
                return TokenOutcome::Rejected(RejectReason::UpstreamUnavailable);
            }
        };

        if profile.is_student(&self.student_marker) {
            tracing::warn!(
                "Token {} belongs to student account {}, refusing",
                fingerprint,
                profile.canvas_id
            );
            return TokenOutcome::Rejected(RejectReason::StudentAccount);
        }

        let staged = self.tokens.read().await.clone();
        let raw = raw_token.to_string();
        let scanned = self
            .run_hashing(move |hasher| {
                let scan = match staged.find_match(hasher, &raw) {
                    Some(index) => Ok(Scan::Known(index)),
                    None => hasher.hash(&raw).map(Scan::New),
                };
                (staged, scan)
            })
            .await;

        let (mut staged, scan) = match scanned {
            Ok((staged, Ok(scan))) => (staged, scan),
            Ok((_, Err(e))) | Err(e) => {
                tracing::warn!("Failed to hash token {}: {}", fingerprint, e);
                return TokenOutcome::Error(e);
            }
        };

        let now = Utc::now();
        let outcome = match scan {
            Scan::Known(index) => {
                staged.touch(index, now);
                TokenOutcome::Updated
            }
            Scan::New(hash) => {
                staged.push(TokenRecord {
                    hash,
                    display_name: profile.sortable_name.clone(),
                    last_verified: now,
                });
                TokenOutcome::Registered
            }
        };

        if let Err(e) = self.storage.save(&staged).await {
            tracing::warn!("Failed to persist token store: {}", e);
            return TokenOutcome::Error(e);
        }
        *self.tokens.write().await = staged;

        tracing::info!(
            "Token {} for {} {} ({})",
            fingerprint,
            profile.sortable_name,
            outcome.as_str(),
            self.hasher.name()
        );
        outcome
    }

    /// Whether `raw_token` belongs to a registered caller.
    ///
    /// Reads the committed store only; never calls the identity provider.
    pub async fn check(&self, raw_token: &str) -> bool {
        if raw_token.is_empty() {
            return false;
        }
        // Scan a copy so writers are not held up by the digest checks
        let tokens = self.tokens.read().await.clone();
        let raw = raw_token.to_string();
        match self
            .run_hashing(move |hasher| tokens.contains(hasher, &raw))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Token check failed: {}", e);
                false
            }
        }
    }

    /// Copy of the committed token store.
    pub async fn snapshot(&self) -> TokenStore {
        self.tokens.read().await.clone()
    }

    /// The scope this registrar serializes its writes under.
    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    /// Writes the committed store to storage.
    ///
    /// Callers must hold the guard scope.
    pub(crate) async fn persist_committed(&self) -> Result<(), RegistryError> {
        let tokens = self.tokens.read().await;
        self.storage.save(&tokens).await
    }
}

/// Result of scanning the store for a token being registered.
enum Scan {
    /// Index of the record the token already verifies against
    Known(usize),
    /// Fresh digest for a token not yet stored
    New(String),
}

/// Extracts the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` with any casing of the scheme and surrounding
/// whitespace. Returns `None` for other schemes or an empty token.
///
/// ```rust
/// use nfc_canvas_auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
/// assert_eq!(bearer_token("Basic dXNlcg=="), None);
/// ```
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_utils::{
        BrokenHasher, CountingHasher, FlakyStorage, MockVerifier, SlowHasher,
    };
    use crate::storage::MemoryStorage;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    const SLOW_VERIFY: Duration = Duration::from_millis(20);

    /// Registrar over `count` stored tokens whose digests each take `SLOW_VERIFY` to check.
    fn slow_registrar(count: usize) -> TokenRegistrar {
        let mut tokens = TokenStore::new();
        for i in 0..count {
            tokens.push(TokenRecord {
                hash: format!("h:stored-{i}"),
                display_name: format!("Teacher {i}"),
                last_verified: Utc::now(),
            });
        }
        TokenRegistrar::new(
            tokens,
            Arc::new(MemoryStorage::<TokenStore>::new()),
            Arc::new(teacher_verifier()),
            Arc::new(SlowHasher::new(SLOW_VERIFY)),
            ConcurrencyGuard::new(),
        )
    }

    /// Awaits `fut` next to a 1 ms ticker and returns its output, its
    /// duration and the longest gap between ticks.
    async fn with_ticker<F: Future>(fut: F) -> (F::Output, Duration, Duration) {
        let done = Arc::new(AtomicBool::new(false));
        let ticker = {
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut max_gap = Duration::ZERO;
                let mut last = Instant::now();
                while !done.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    let now = Instant::now();
                    max_gap = max_gap.max(now - last);
                    last = now;
                }
                max_gap
            })
        };
        tokio::task::yield_now().await;

        let started = Instant::now();
        let output = fut.await;
        let took = started.elapsed();
        done.store(true, Ordering::SeqCst);
        (output, took, ticker.await.unwrap())
    }

    fn teacher_verifier() -> MockVerifier {
        MockVerifier::new()
            .with_profile("abc", "Teacher, Tina", "teacher@x")
            .with_profile("def", "Teacher, Tom", "tom@school.example")
            .with_profile("stu", "Pupil, Pat", "pat@student.school.example")
    }

    fn registrar(
        verifier: Arc<MockVerifier>,
        storage: Arc<dyn SnapshotStorage<TokenStore>>,
    ) -> TokenRegistrar {
        TokenRegistrar::new(
            TokenStore::new(),
            storage,
            verifier,
            Arc::new(CountingHasher::default()),
            ConcurrencyGuard::new(),
        )
    }

    #[tokio::test]
    async fn test_register_then_update() {
        let storage = Arc::new(MemoryStorage::<TokenStore>::new());
        let registrar = registrar(Arc::new(teacher_verifier()), storage.clone());

        assert!(matches!(registrar.register("abc").await, TokenOutcome::Registered));
        let first = registrar.snapshot().await.get(0).unwrap().last_verified;

        assert!(matches!(registrar.register("abc").await, TokenOutcome::Updated));
        let store = registrar.snapshot().await;
        assert_eq!(store.len(), 1);
        assert!(store.get(0).unwrap().last_verified >= first);
        assert_eq!(store.get(0).unwrap().display_name, "Teacher, Tina");

        assert!(registrar.check("abc").await);
        assert!(!registrar.check("xyz").await);
        assert_eq!(storage.save_count(), 2);
        assert_eq!(storage.snapshot().await, store);
    }

    #[tokio::test]
    async fn test_hash_is_stored_not_token() {
        let registrar = registrar(
            Arc::new(teacher_verifier()),
            Arc::new(MemoryStorage::<TokenStore>::new()),
        );
        registrar.register("abc").await;

        let store = registrar.snapshot().await;
        assert_ne!(store.get(0).unwrap().hash, "abc");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let storage = Arc::new(MemoryStorage::<TokenStore>::new());
        let registrar = registrar(Arc::new(teacher_verifier()), storage.clone());

        assert!(matches!(
            registrar.register("unknown").await,
            TokenOutcome::Rejected(RejectReason::InvalidToken)
        ));
        assert!(registrar.snapshot().await.is_empty());
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_rejected() {
        let verifier = Arc::new(teacher_verifier());
        let registrar = registrar(verifier.clone(), Arc::new(MemoryStorage::<TokenStore>::new()));

        verifier.set_offline(true);
        assert!(matches!(
            registrar.register("abc").await,
            TokenOutcome::Rejected(RejectReason::UpstreamUnavailable)
        ));
        assert!(!registrar.check("abc").await);

        // The guard was released on the early return
        verifier.set_offline(false);
        assert!(matches!(registrar.register("abc").await, TokenOutcome::Registered));
    }

    #[tokio::test]
    async fn test_student_token_rejected() {
        let registrar = registrar(
            Arc::new(teacher_verifier()),
            Arc::new(MemoryStorage::<TokenStore>::new()),
        );

        assert!(matches!(
            registrar.register("stu").await,
            TokenOutcome::Rejected(RejectReason::StudentAccount)
        ));
        assert!(!registrar.check("stu").await);
    }

    #[tokio::test]
    async fn test_student_rejected_even_if_already_stored() {
        // A record for the token exists (e.g. the account changed role since)
        let hasher = Arc::new(CountingHasher::default());
        let mut tokens = TokenStore::new();
        tokens.push(TokenRecord {
            hash: hasher.hash("stu").unwrap(),
            display_name: "Pupil, Pat".to_string(),
            last_verified: Utc::now(),
        });
        let before = tokens.clone();

        let registrar = TokenRegistrar::new(
            tokens,
            Arc::new(MemoryStorage::<TokenStore>::new()),
            Arc::new(teacher_verifier()),
            hasher,
            ConcurrencyGuard::new(),
        );

        assert!(matches!(
            registrar.register("stu").await,
            TokenOutcome::Rejected(RejectReason::StudentAccount)
        ));
        assert_eq!(registrar.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_custom_student_marker() {
        let verifier = MockVerifier::new().with_profile("t", "Kid, Kim", "kim@elev.school.example");
        let registrar = registrar(Arc::new(verifier), Arc::new(MemoryStorage::<TokenStore>::new()))
            .with_student_marker("elev");

        assert!(matches!(
            registrar.register("t").await,
            TokenOutcome::Rejected(RejectReason::StudentAccount)
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_distinct_and_retriable() {
        let storage = Arc::new(FlakyStorage::<TokenStore>::new());
        let registrar = registrar(Arc::new(teacher_verifier()), storage.clone());

        storage.set_failing(true);
        let outcome = registrar.register("abc").await;
        assert!(matches!(outcome, TokenOutcome::Error(ref e) if e.is_persistence()));
        assert!(!registrar.check("abc").await);
        assert!(storage.persisted().await.is_empty());

        // Same inputs reach the same decision once storage recovers
        storage.set_failing(false);
        assert!(matches!(registrar.register("abc").await, TokenOutcome::Registered));
        assert!(registrar.check("abc").await);
        assert_eq!(storage.persisted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_hashing_failure() {
        let registrar = TokenRegistrar::new(
            TokenStore::new(),
            Arc::new(MemoryStorage::<TokenStore>::new()),
            Arc::new(teacher_verifier()),
            Arc::new(BrokenHasher),
            ConcurrencyGuard::new(),
        );

        assert!(matches!(
            registrar.register("abc").await,
            TokenOutcome::Error(RegistryError::HashingError(_))
        ));
        assert!(registrar.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_does_not_call_upstream() {
        let verifier = Arc::new(teacher_verifier());
        let registrar = registrar(verifier.clone(), Arc::new(MemoryStorage::<TokenStore>::new()));

        registrar.register("abc").await;
        let calls = verifier.verify_calls.load(Ordering::SeqCst);

        assert!(registrar.check("abc").await);
        assert!(!registrar.check("").await);
        assert_eq!(verifier.verify_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_concurrent_registration_of_same_token() {
        let storage = Arc::new(MemoryStorage::<TokenStore>::new());
        let registrar = Arc::new(registrar(Arc::new(teacher_verifier()), storage.clone()));

        let mut handles = vec![];
        for _ in 0..8 {
            let registrar = Arc::clone(&registrar);
            handles.push(tokio::spawn(async move { registrar.register("def").await }));
        }

        let mut registered = 0;
        for handle in handles {
            match handle.await.unwrap() {
                TokenOutcome::Registered => registered += 1,
                TokenOutcome::Updated => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(registered, 1);
        assert_eq!(registrar.snapshot().await.len(), 1);
        assert_eq!(storage.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_from_storage() -> Result<(), RegistryError> {
        let hasher = Arc::new(CountingHasher::default());
        let mut seeded = TokenStore::new();
        seeded.push(TokenRecord {
            hash: hasher.hash("abc")?,
            display_name: "Teacher, Tina".to_string(),
            last_verified: Utc::now(),
        });

        let registrar = TokenRegistrar::load(
            Arc::new(MemoryStorage::<TokenStore>::with_snapshot(seeded)),
            Arc::new(teacher_verifier()),
            hasher,
            ConcurrencyGuard::new(),
        )
        .await?;

        assert!(registrar.check("abc").await);
        assert!(matches!(registrar.register("abc").await, TokenOutcome::Updated));
        Ok(())
    }

    #[tokio::test]
    async fn test_check_keeps_runtime_responsive() {
        let registrar = slow_registrar(5);

        let (found, took, max_gap) = with_ticker(registrar.check("not-registered")).await;

        assert!(!found);
        assert!(took >= SLOW_VERIFY * 5);
        assert!(
            max_gap < took / 2,
            "runtime stalled for {max_gap:?} during a {took:?} check"
        );
    }

    #[tokio::test]
    async fn test_register_keeps_runtime_responsive() {
        let registrar = slow_registrar(5);

        let (outcome, took, max_gap) = with_ticker(registrar.register("abc")).await;

        assert!(matches!(outcome, TokenOutcome::Registered));
        // Five failed verifies plus one hash
        assert!(took >= SLOW_VERIFY * 6);
        assert!(
            max_gap < took / 2,
            "runtime stalled for {max_gap:?} during a {took:?} registration"
        );
        assert!(registrar.check("abc").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_check_does_not_hold_store_lock_while_scanning() {
        let registrar = Arc::new(slow_registrar(5));

        let checking = {
            let registrar = Arc::clone(&registrar);
            tokio::spawn(async move { registrar.check("not-registered").await })
        };
        tokio::time::sleep(SLOW_VERIFY).await;

        // Mid-scan, a writer can still take the store
        assert!(registrar.tokens.try_write().is_ok());
        assert!(!checking.await.unwrap());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc  "), Some("abc"));
        assert_eq!(bearer_token("  BEARER abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Token abc"), None);
        assert_eq!(bearer_token(""), None);
    }
}
