use crate::errors::ServiceError;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Caller role carried in the token. Row-level ownership checks are the
/// identity provider's concern; the API only distinguishes admin from user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

/// JWT claims for API access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ))
        }
    }
}

/// Verifies (and, for tooling and tests, issues) HS256 bearer tokens.
pub struct AuthVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_lifetime: Duration,
}

impl AuthVerifier {
    pub fn new(secret: &str, token_lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            token_lifetime,
        }
    }

    /// Issues a signed access token for the given identity.
    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<String, ServiceError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now,
            exp: now + self.token_lifetime.as_secs(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
    }

    /// Verifies a bearer token and returns the caller identity.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

        Ok(AuthenticatedUser {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

fn bearer_token(parts: &axum::http::HeaderMap) -> Option<String> {
    parts
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Middleware gating every /api/v1 route: rejects requests without a valid
/// bearer token before any handler runs.
pub async fn require_auth(
    State(verifier): State<Arc<AuthVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

    let user = verifier.verify(&token)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthenticatedUser>().cloned().ok_or_else(|| {
            ServiceError::Unauthorized("missing authentication context".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> AuthVerifier {
        AuthVerifier::new("test_secret_for_auth_tests", Duration::from_secs(3600))
    }

    #[test]
    fn token_roundtrip() {
        let v = verifier();
        let user_id = Uuid::new_v4();
        let token = v.issue_token(user_id, Role::User).unwrap();
        let user = v.verify(&token).unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = verifier()
            .issue_token(Uuid::new_v4(), Role::Admin)
            .unwrap();
        let other = AuthVerifier::new("a_different_secret_entirely", Duration::from_secs(3600));
        assert!(matches!(
            other.verify(&token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(matches!(
            verifier().verify("not.a.token"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn admin_gate() {
        let admin = AuthenticatedUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let user = AuthenticatedUser {
            id: Uuid::new_v4(),
            role: Role::User,
        };
        assert!(admin.require_admin().is_ok());
        assert!(matches!(
            user.require_admin(),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
