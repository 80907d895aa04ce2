//! services/api/src/adapters/identity.rs
//!
//! Implementations of the `IdentityService` port. The remote adapter talks
//! to the hosted identity provider's REST API and normalizes its error
//! codes into the `auth/...` identifiers the error formatter understands.
//! The local adapter keeps argon2-hashed credentials in process memory and
//! reports the same identifiers, so the rest of the service cannot tell
//! the two apart.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use samvaad_core::ports::{AuthUser, IdentityService, PortError, PortResult};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

//=========================================================================================
// Remote Identity Provider
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderAccount {
    local_id: String,
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Deserialize)]
struct ProviderFailure {
    error: ProviderFailureBody,
}

#[derive(Deserialize)]
struct ProviderFailureBody {
    message: String,
}

/// An adapter for the hosted identity provider's account REST API.
pub struct RemoteIdentity {
    http: reqwest::Client,
    base: String,
    api_key: String,
}

impl RemoteIdentity {
    pub fn new(base: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1/accounts:{action}?key={}", self.base, self.api_key)
    }

    async fn post_account(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> PortResult<ProviderAccount> {
        let response = self
            .http
            .post(self.endpoint(action))
            .json(&body)
            .send()
            .await
            .map_err(|_| PortError::Auth("auth/network-request-failed".to_string()))?;
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| PortError::Unexpected(format!("bad identity response: {e}")));
        }
        let code = match response.json::<ProviderFailure>().await {
            Ok(failure) => provider_identifier(&failure.error.message),
            Err(e) => {
                error!("Unreadable identity provider failure: {e}");
                "auth/internal-error".to_string()
            }
        };
        Err(PortError::Auth(code))
    }
}

/// Translates the provider's SCREAMING_SNAKE codes into the `auth/...`
/// identifiers used throughout the client-facing error text.
fn provider_identifier(code: &str) -> String {
    let code = code
        .split_whitespace()
        .next()
        .unwrap_or(code);
    let slug = match code {
        "EMAIL_EXISTS" => "email-already-in-use",
        "INVALID_EMAIL" => "invalid-email",
        "EMAIL_NOT_FOUND" => "user-not-found",
        "INVALID_PASSWORD" => "wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "invalid-credential",
        "MISSING_PASSWORD" => "missing-password",
        "WEAK_PASSWORD" => "weak-password",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too-many-requests",
        other => return format!("auth/{}", other.to_lowercase().replace('_', "-")),
    };
    format!("auth/{slug}")
}

#[async_trait]
impl IdentityService for RemoteIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        let account = self
            .post_account(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(account.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        let account = self
            .post_account(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(account.into())
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        self.post_account(
            "sendOobCode",
            json!({ "requestType": "PASSWORD_RESET", "email": email }),
        )
        .await
        .map(|_| ())
    }

    async fn delete_account(&self, uid: &str) -> PortResult<()> {
        let response = self
            .http
            .post(self.endpoint("delete"))
            .json(&json!({ "localId": uid }))
            .send()
            .await
            .map_err(|_| PortError::Auth("auth/network-request-failed".to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(PortError::Unexpected(format!(
                "identity provider returned {} on account deletion",
                response.status()
            )))
        }
    }
}

impl From<ProviderAccount> for AuthUser {
    fn from(account: ProviderAccount) -> Self {
        AuthUser {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
        }
    }
}

//=========================================================================================
// Local (Development) Identity Store
//=========================================================================================

struct LocalAccount {
    uid: String,
    email: String,
    hashed_password: String,
}

/// A development stand-in keeping argon2-hashed credentials in memory.
#[derive(Default)]
pub struct LocalIdentity {
    accounts: Mutex<HashMap<String, LocalAccount>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_password(password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PortError::Unexpected(format!("failed to hash password: {e}")))
    }

    fn validate_new(email: &str, password: &str) -> PortResult<()> {
        if !email.contains('@') {
            return Err(PortError::Auth("auth/invalid-email".to_string()));
        }
        if password.is_empty() {
            return Err(PortError::Auth("auth/missing-password".to_string()));
        }
        if password.len() < 6 {
            return Err(PortError::Auth("auth/weak-password".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityService for LocalIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        Self::validate_new(email, password)?;
        let key = email.to_lowercase();
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&key) {
            return Err(PortError::Auth("auth/email-already-in-use".to_string()));
        }
        let account = LocalAccount {
            uid: Uuid::new_v4().to_string(),
            email: email.to_string(),
            hashed_password: Self::hash_password(password)?,
        };
        let user = AuthUser {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: None,
            photo_url: None,
        };
        accounts.insert(key, account);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        if password.is_empty() {
            return Err(PortError::Auth("auth/missing-password".to_string()));
        }
        let accounts = self.accounts.lock().await;
        let account = accounts
            .get(&email.to_lowercase())
            .ok_or_else(|| PortError::Auth("auth/user-not-found".to_string()))?;

        let parsed = PasswordHash::new(&account.hashed_password)
            .map_err(|e| PortError::Unexpected(format!("failed to parse password hash: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| PortError::Auth("auth/wrong-password".to_string()))?;

        Ok(AuthUser {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: None,
            photo_url: None,
        })
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        let accounts = self.accounts.lock().await;
        if !accounts.contains_key(&email.to_lowercase()) {
            return Err(PortError::Auth("auth/user-not-found".to_string()));
        }
        // There is no outbound mail in development mode.
        info!("Password reset requested for {email}");
        Ok(())
    }

    async fn delete_account(&self, uid: &str) -> PortResult<()> {
        let mut accounts = self.accounts.lock().await;
        let before = accounts.len();
        accounts.retain(|_, a| a.uid != uid);
        if accounts.len() == before {
            return Err(PortError::NotFound(format!("account {uid}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in_roundtrip() {
        let identity = LocalIdentity::new();
        let created = identity.sign_up("ana@example.com", "secret1").await.unwrap();
        let logged_in = identity.sign_in("Ana@Example.com", "secret1").await.unwrap();
        assert_eq!(created.uid, logged_in.uid);
    }

    #[tokio::test]
    async fn failures_carry_formatter_identifiers() {
        let identity = LocalIdentity::new();
        identity.sign_up("ana@example.com", "secret1").await.unwrap();

        let dup = identity.sign_up("ana@example.com", "secret1").await;
        assert!(matches!(dup, Err(PortError::Auth(code)) if code == "auth/email-already-in-use"));

        let wrong = identity.sign_in("ana@example.com", "nope99").await;
        assert!(matches!(wrong, Err(PortError::Auth(code)) if code == "auth/wrong-password"));

        let missing = identity.sign_in("bob@example.com", "secret1").await;
        assert!(matches!(missing, Err(PortError::Auth(code)) if code == "auth/user-not-found"));

        let weak = identity.sign_up("bob@example.com", "abc").await;
        assert!(matches!(weak, Err(PortError::Auth(code)) if code == "auth/weak-password"));
    }

    #[test]
    fn provider_codes_normalize_to_formatter_identifiers() {
        assert_eq!(provider_identifier("EMAIL_EXISTS"), "auth/email-already-in-use");
        assert_eq!(
            provider_identifier("TOO_MANY_ATTEMPTS_TRY_LATER : retry later"),
            "auth/too-many-requests"
        );
        assert_eq!(provider_identifier("SOMETHING_ELSE"), "auth/something-else");
    }
}
