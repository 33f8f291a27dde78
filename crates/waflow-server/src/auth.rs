//! Resolved identity extraction.
//!
//! Credential verification and token issuance live in an upstream auth
//! layer; by the time a request reaches this service that layer has already
//! resolved it to `{user_id, email, role}` and attached the three as
//! headers.  A request without them is unauthenticated and never reaches
//! any core logic.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Option<String> {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|raw| Uuid::parse_str(&raw).ok())
            .ok_or(ApiError::Unauthenticated)?;
        let email = header(USER_EMAIL_HEADER).ok_or(ApiError::Unauthenticated)?;
        let role = header(USER_ROLE_HEADER).unwrap_or_else(|| "user".to_string());

        Ok(AuthIdentity {
            user_id,
            email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<AuthIdentity, ApiError> {
        let (mut parts, _) = req.into_parts();
        AuthIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn valid_headers_resolve() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_EMAIL_HEADER, "t@example.com")
            .header(USER_ROLE_HEADER, "admin")
            .body(())
            .unwrap();

        let identity = extract(req).await.unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.role, "admin");
    }

    #[tokio::test]
    async fn missing_id_is_unauthenticated() {
        let req = Request::builder()
            .header(USER_EMAIL_HEADER, "t@example.com")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(req).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn malformed_id_is_unauthenticated() {
        let req = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .header(USER_EMAIL_HEADER, "t@example.com")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(req).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn role_defaults_to_user() {
        let req = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_EMAIL_HEADER, "t@example.com")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.unwrap().role, "user");
    }
}
