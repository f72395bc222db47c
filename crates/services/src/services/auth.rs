use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use db::{ConnectionTrait, DbErr, models::user::User};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::assets::session_secret_path;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid session")]
    InvalidSession,
    #[error("Setup already completed")]
    SetupAlreadyCompleted,
    #[error("Failed to hash password")]
    PasswordHash,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The authenticated identity threaded through every operation. Extracted
/// from the session token once per request; handlers never consult ambient
/// session state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Caller {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user: Caller,
    exp: i64,
}

/// Signs and verifies session tokens and hashes passwords. The signing
/// secret is generated once and persisted next to the database.
#[derive(Clone)]
pub struct AuthService {
    secret: Vec<u8>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(session_ttl_hours: i64) -> Result<Self, AuthError> {
        let secret = Self::load_or_create_secret()?;
        Ok(Self {
            secret,
            session_ttl: Duration::hours(session_ttl_hours),
        })
    }

    pub fn with_secret(secret: Vec<u8>, session_ttl_hours: i64) -> Self {
        Self {
            secret,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    fn load_or_create_secret() -> Result<Vec<u8>, std::io::Error> {
        let path = session_secret_path();
        match std::fs::read(&path) {
            Ok(secret) if !secret.is_empty() => Ok(secret),
            Ok(_) | Err(_) => {
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                std::fs::write(&path, &secret)?;
                tracing::info!("Generated new session signing secret");
                Ok(secret)
            }
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    pub fn verify_password(&self, password_hash: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Issues a fresh token for the caller; also used to re-sign (refresh)
    /// the cookie on every authenticated request.
    pub fn issue_token(&self, caller: &Caller) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires = Utc::now() + self.session_ttl;
        let claims = SessionClaims {
            user: caller.clone(),
            exp: expires.timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|_| AuthError::InvalidSession)?;
        Ok((token, expires))
    }

    /// Expiry is validated by the decoder; there is no revocation list.
    pub fn verify_token(&self, token: &str) -> Result<Caller, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidSession)?;
        Ok(data.claims.user)
    }

    /// Exact username match first, then the case-insensitive fallback; a
    /// missing user and a wrong password are indistinguishable to the caller.
    pub async fn login<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
        password: &str,
    ) -> Result<Caller, AuthError> {
        let Some(model) = User::find_model_by_username(db, username).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !self.verify_password(&model.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Caller {
            id: model.uuid,
            username: model.username,
            is_admin: model.is_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::with_secret(b"test-secret".to_vec(), 24)
    }

    #[test]
    fn password_hashing_round_trips() {
        let auth = service();
        let hash = auth.hash_password("hunter2").unwrap();
        assert!(auth.verify_password(&hash, "hunter2"));
        assert!(!auth.verify_password(&hash, "hunter3"));
        assert!(!auth.verify_password("not-a-hash", "hunter2"));
    }

    #[test]
    fn tokens_round_trip_and_carry_identity() {
        let auth = service();
        let caller = Caller {
            id: Uuid::new_v4(),
            username: "sam".to_string(),
            is_admin: true,
        };
        let (token, expires) = auth.issue_token(&caller).unwrap();
        assert!(expires > Utc::now());

        let verified = auth.verify_token(&token).unwrap();
        assert_eq!(verified.id, caller.id);
        assert_eq!(verified.username, "sam");
        assert!(verified.is_admin);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = AuthService::with_secret(b"test-secret".to_vec(), -2);
        let caller = Caller {
            id: Uuid::new_v4(),
            username: "sam".to_string(),
            is_admin: false,
        };
        let (token, _) = auth.issue_token(&caller).unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let auth = service();
        let other = AuthService::with_secret(b"other-secret".to_vec(), 24);
        let caller = Caller {
            id: Uuid::new_v4(),
            username: "sam".to_string(),
            is_admin: false,
        };
        let (token, _) = other.issue_token(&caller).unwrap();
        assert!(auth.verify_token(&token).is_err());
    }
}
