use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::Error;
use crate::schema::{User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden(
                "You don't have permission to perform this action".to_owned(),
            ));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

/// Signs and verifies session tokens with the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, Error> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret)
            .map_err(|e| Error::Fatal(format!("Invalid session secret: {e}")))?;

        Ok(Self { key, lifetime })
    }

    pub fn generate(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            self.lifetime,
        );

        self.sign(claims)
    }

    pub fn sign(&self, claims: JwtSessionData) -> Result<String, Error> {
        claims
            .sign_with_key(&self.key)
            .map_err(|e| Error::Fatal(format!("Failed to sign session: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| Error::Unauthorized("Invalid session; Invalid token".to_owned()))?;

        let now = Local::now().timestamp();
        if (session.exp - now).is_negative() {
            return Err(Error::Unauthorized(
                "Invalid session; Token expired".to_owned(),
            ));
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> SessionKeys {
        SessionKeys::new(secret.as_bytes(), Duration::hours(1)).unwrap()
    }

    #[test]
    fn tokens_round_trip() {
        let keys = keys("test-secret");
        let token = keys
            .sign(JwtSessionData::new(5, "cook".into(), UserRole::User, Duration::hours(1)))
            .unwrap();

        let session: SessionData = keys.verify(&token).unwrap().into();
        assert_eq!(session.user_id, 5);
        assert_eq!(session.username, "cook");
        assert!(!session.is_admin);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = keys("test-secret");
        let token = keys
            .sign(JwtSessionData::new(5, "cook".into(), UserRole::User, Duration::hours(-1)))
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let token = keys("one")
            .sign(JwtSessionData::new(1, "a".into(), UserRole::Admin, Duration::hours(1)))
            .unwrap();

        assert!(matches!(keys("two").verify(&token), Err(Error::Unauthorized(_))));
        assert!(matches!(keys("one").verify("garbage"), Err(Error::Unauthorized(_))));
    }
}
