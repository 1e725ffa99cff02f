use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity-provider claims this service reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Validated identity extracted from claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub tenant_id: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

impl Claims {
    /// Object id first, then subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        non_empty(self.oid.as_ref()).or_else(|| non_empty(self.sub.as_ref()))
    }

    pub fn identity(&self) -> Result<Identity> {
        let user_id = self.subject().ok_or(Error::IdentityMissing)?;
        let display_name = non_empty(self.name.as_ref()).ok_or_else(|| {
            Error::Validation("user name was not present in the request token".to_string())
        })?;

        Ok(Identity {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            tenant_id: non_empty(self.tid.as_ref()).map(str::to_string),
        })
    }
}

#[async_trait]
pub trait ClaimsVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Claims>;
}

pub struct Hs256Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        // Tokens without `exp` are rejected.
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl ClaimsVerifier for Hs256Verifier {
    async fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("rejected token: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_subject_prefers_oid() {
        let claims = Claims {
            oid: Some("oid-1".to_string()),
            sub: Some("sub-1".to_string()),
            ..Default::default()
        };
        assert_eq!(claims.subject(), Some("oid-1"));

        let claims = Claims {
            oid: Some(" ".to_string()),
            sub: Some("sub-1".to_string()),
            ..Default::default()
        };
        assert_eq!(claims.subject(), Some("sub-1"));
    }

    #[test]
    fn test_identity_requires_subject_and_name() {
        let missing_subject = Claims {
            name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_subject.identity(),
            Err(Error::IdentityMissing)
        ));

        let missing_name = Claims {
            sub: Some("u1".to_string()),
            ..Default::default()
        };
        assert!(matches!(missing_name.identity(), Err(Error::Validation(_))));

        let ok = Claims {
            sub: Some("u1".to_string()),
            name: Some("Ada".to_string()),
            tid: Some("t1".to_string()),
            ..Default::default()
        };
        let identity = ok.identity().unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.tenant_id.as_deref(), Some("t1"));
    }

    fn expires_in(secs: i64) -> Option<u64> {
        Some((chrono::Utc::now().timestamp() + secs) as u64)
    }

    #[tokio::test]
    async fn test_hs256_round_trip_and_wrong_secret() {
        let claims = Claims {
            sub: Some("u1".to_string()),
            name: Some("Ada".to_string()),
            exp: expires_in(3600),
            ..Default::default()
        };
        let token = sign(&claims, "secret");

        let verifier = Hs256Verifier::new("secret", None);
        let verified = verifier.verify(&token).await.unwrap();
        assert_eq!(verified.sub.as_deref(), Some("u1"));

        let other = Hs256Verifier::new("other-secret", None);
        assert!(other.verify(&token).await.is_none());
        assert!(verifier.verify("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_expiry_is_required_and_enforced() {
        let verifier = Hs256Verifier::new("secret", None);
        let mut claims = Claims {
            sub: Some("u1".to_string()),
            name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert!(verifier.verify(&sign(&claims, "secret")).await.is_none());

        claims.exp = expires_in(-3600);
        assert!(verifier.verify(&sign(&claims, "secret")).await.is_none());

        claims.exp = expires_in(60);
        assert!(verifier.verify(&sign(&claims, "secret")).await.is_some());
    }
}
