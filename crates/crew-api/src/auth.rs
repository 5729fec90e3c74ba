//! Credential handling: argon2 password hashing and JWT bearer tokens.
//!
//! Tokens are HS256 with `sub` (principal id), `role` ("worker" or "admin"),
//! and `exp` claims. The identity provider re-reads the principal from the
//! record store on every request, so a promotion takes effect on the next
//! call without re-login.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crew_core::{
    AdminRepository, Error, IdentityProvider, Principal, Result, WorkerRepository,
};

const ROLE_WORKER: &str = "worker";
const ROLE_ADMIN: &str = "admin";

/// JWT payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id.
    pub sub: Uuid,
    /// "worker" or "admin".
    pub role: String,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash. A malformed stored hash is an
/// internal error, a mismatch is plain `false`.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Internal(format!("malformed password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Issues and validates bearer tokens against the record store.
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    workers: Arc<dyn WorkerRepository>,
    admins: Arc<dyn AdminRepository>,
}

impl JwtIdentityProvider {
    pub fn new(
        secret: &str,
        token_ttl: Duration,
        workers: Arc<dyn WorkerRepository>,
        admins: Arc<dyn AdminRepository>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
            workers,
            admins,
        }
    }

    /// Read the signing secret from `JWT_SECRET` and the token lifetime from
    /// `TOKEN_TTL_HOURS` (default 24).
    pub fn from_env(
        workers: Arc<dyn WorkerRepository>,
        admins: Arc<dyn AdminRepository>,
    ) -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| Error::Config("JWT_SECRET is not set".into()))?;
        let ttl_hours: i64 = std::env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);
        Ok(Self::new(
            &secret,
            Duration::hours(ttl_hours),
            workers,
            admins,
        ))
    }

    /// Issue a signed token for an authenticated principal.
    pub fn issue(&self, principal: &Principal) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id(),
            role: principal.role().to_string(),
            exp: (now + self.token_ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthenticated(format!("invalid token: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.decode_claims(token)?;
        debug!(
            subsystem = "auth",
            op = "authenticate",
            principal_id = %claims.sub,
            role = %claims.role,
            "Token accepted, resolving principal"
        );

        match claims.role.as_str() {
            ROLE_WORKER => {
                let worker = self.workers.get(claims.sub).await?.ok_or_else(|| {
                    Error::Unauthenticated("token subject no longer exists".into())
                })?;
                Ok(Principal::Worker(worker))
            }
            ROLE_ADMIN => {
                let admin = self.admins.get(claims.sub).await?.ok_or_else(|| {
                    Error::Unauthenticated("token subject no longer exists".into())
                })?;
                Ok(Principal::Admin(admin))
            }
            other => Err(Error::Unauthenticated(format!(
                "unknown role claim '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_assign::InMemoryStore;
    use crew_core::{Level, RegisterAdminRequest, RegisterWorkerRequest};

    fn provider(store: Arc<InMemoryStore>) -> JwtIdentityProvider {
        JwtIdentityProvider::new(
            "test-secret",
            Duration::hours(1),
            store.clone(),
            store,
        )
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("hunter2").unwrap();
        let b = hash_password("hunter2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_is_internal_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string").unwrap_err(),
            Error::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_token_round_trip_worker() {
        let store = Arc::new(InMemoryStore::new());
        let worker = WorkerRepository::insert(
            &*store,
            &RegisterWorkerRequest {
                name: "Ana".into(),
                surname: "Ilievska".into(),
                department: "eng".into(),
                level: Level::Medior,
                email: "ana@example.com".into(),
                password: "hunter2".into(),
            },
            "hashed",
        )
        .await
        .unwrap();

        let provider = provider(store);
        let token = provider.issue(&Principal::Worker(worker.clone())).unwrap();
        let principal = provider.authenticate(&token).await.unwrap();
        match principal {
            Principal::Worker(w) => assert_eq!(w.id, worker.id),
            Principal::Admin(_) => panic!("expected worker principal"),
        }
    }

    #[tokio::test]
    async fn test_token_round_trip_admin() {
        let store = Arc::new(InMemoryStore::new());
        let admin = AdminRepository::insert(
            &*store,
            &RegisterAdminRequest {
                name: "Marko".into(),
                surname: "Stojanov".into(),
                email: "marko@example.com".into(),
                password: "hunter2".into(),
            },
            "hashed",
        )
        .await
        .unwrap();

        let provider = provider(store);
        let token = provider.issue(&Principal::Admin(admin.clone())).unwrap();
        let principal = provider.authenticate(&token).await.unwrap();
        assert_eq!(principal.role(), "admin");
        assert_eq!(principal.id(), admin.id);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let provider = provider(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            provider.authenticate("not.a.jwt").await.unwrap_err(),
            Error::Unauthenticated(_)
        ));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let worker = WorkerRepository::insert(
            &*store,
            &RegisterWorkerRequest {
                name: "Ana".into(),
                surname: "Ilievska".into(),
                department: "eng".into(),
                level: Level::Junior,
                email: "ana2@example.com".into(),
                password: "hunter2".into(),
            },
            "hashed",
        )
        .await
        .unwrap();

        let other = JwtIdentityProvider::new(
            "different-secret",
            Duration::hours(1),
            store.clone(),
            store.clone(),
        );
        let token = other.issue(&Principal::Worker(worker)).unwrap();

        let provider = provider(store);
        assert!(matches!(
            provider.authenticate(&token).await.unwrap_err(),
            Error::Unauthenticated(_)
        ));
    }

    #[tokio::test]
    async fn test_deleted_subject_is_unauthenticated() {
        let store = Arc::new(InMemoryStore::new());
        let provider = provider(store.clone());

        // A token whose subject never existed in this store.
        let ghost = crew_core::Worker {
            id: crew_core::new_v7(),
            name: "Ghost".into(),
            surname: "Worker".into(),
            department: "eng".into(),
            level: Level::Junior,
            email: "ghost@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let token = provider.issue(&Principal::Worker(ghost)).unwrap();
        assert!(matches!(
            provider.authenticate(&token).await.unwrap_err(),
            Error::Unauthenticated(_)
        ));
    }
}
