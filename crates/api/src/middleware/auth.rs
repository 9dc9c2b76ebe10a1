//! Bearer token extractors.
//!
//! Handlers receive the verified [`Claims`] as an argument; there is no
//! ambient "current user".

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{Claims, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.username)
/// }
/// ```
pub struct RequireAuth(pub Claims);

/// Why a request carried no usable token.
#[derive(Debug)]
pub enum AuthRejection {
    /// No `Authorization` header.
    Missing,
    /// Header present but not `Bearer <token>`.
    Malformed,
    /// Token expired or failed verification.
    Invalid(TokenError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Missing => "Authorization header required",
            Self::Malformed => "Invalid authorization header format",
            Self::Invalid(TokenError::Expired) => "Token has expired",
            Self::Invalid(_) => "Invalid or expired token",
        };
        AppError::Unauthorized(message.to_owned()).into_response()
    }
}

/// Read `Authorization: Bearer <token>` and verify the token.
fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, AuthRejection> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::Missing)?
        .to_str()
        .map_err(|_| AuthRejection::Malformed)?;

    let token = match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            token.trim()
        }
        _ => return Err(AuthRejection::Malformed),
    };

    state.tokens().verify(token).map_err(AuthRejection::Invalid)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        set_sentry_user(&claims.user_id, &claims.username);
        Ok(Self(claims))
    }
}

/// Extractor that optionally verifies a bearer token.
///
/// Unlike `RequireAuth`, this does not reject the request; a missing or
/// unverifiable token yields `None`.
pub struct OptionalAuth(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(claims_from_parts(parts, state).ok()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use secrecy::SecretString;

    use stockroom_core::{UserId, UserRole};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::User;
    use crate::services::auth::{Passwords, TokenIssuer};
    use crate::state::Stores;

    fn state() -> AppState {
        let tokens = TokenIssuer::new(
            &SecretString::from("Hv3Lm9Qp2Wx7Tz5Rb8Nc1Kd6Fg4Js0Ya".to_owned()),
            Duration::from_secs(60),
        )
        .unwrap();
        AppState::new(
            Stores::in_memory(MemoryStore::new()),
            tokens,
            Passwords::with_cost(1024, 1).unwrap(),
            false,
        )
    }

    fn token_for(state: &AppState, role: UserRole) -> String {
        let user = User {
            id: UserId::new(3),
            username: "dana".to_owned(),
            email: "dana@example.com".parse().unwrap(),
            phone: "5550100123".to_owned(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.tokens().issue(&user).unwrap()
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/users/profile");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let state = state();
        let token = token_for(&state, UserRole::Admin);
        let mut parts = parts(Some(&format!("Bearer {token}")));

        let RequireAuth(claims) = RequireAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(claims.user_id, UserId::new(3));
        assert!(claims.is_admin());
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let state = state();
        let token = token_for(&state, UserRole::User);
        let mut parts = parts(Some(&format!("bearer {token}")));

        assert!(RequireAuth::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejections_are_unauthorized() {
        let state = state();
        for header in [None, Some("Basic abc"), Some("Bearer"), Some("Bearer not.a.jwt")] {
            let mut parts = parts(header);
            let Err(rejection) = RequireAuth::from_request_parts(&mut parts, &state).await else {
                panic!("{header:?} should be rejected");
            };
            assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_optional_auth_never_rejects() {
        let state = state();
        let mut anonymous = parts(None);
        let OptionalAuth(none) = OptionalAuth::from_request_parts(&mut anonymous, &state)
            .await
            .unwrap();
        assert!(none.is_none());

        let token = token_for(&state, UserRole::User);
        let mut signed = parts(Some(&format!("Bearer {token}")));
        let OptionalAuth(some) = OptionalAuth::from_request_parts(&mut signed, &state)
            .await
            .unwrap();
        assert_eq!(some.unwrap().username, "dana");
    }
}
