use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::{ApiError, AuthError};
use crate::{AppState, identity};

/// The authenticated principal, resolved from the bearer credential and
/// attached as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Verify the bearer credential and reconcile it to a local user. Runs in
/// front of every /api route.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(rejection) => rejection,
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, Response> {
    let token = bearer_token(headers)
        .map_err(IntoResponse::into_response)?
        .to_string();

    let claims = state
        .verifier
        .verify(&token)
        .await
        .map_err(IntoResponse::into_response)?;

    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || identity::reconcile_user(&db.db, &claims))
        .await
        .map_err(|e| crate::error::join_err(e).into_response())?
        .map_err(|e| ApiError::Internal(e).into_response())?;

    let id = user
        .id
        .parse()
        .map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {e}", user.id))
                .into_response()
        })?;

    Ok(CurrentUser {
        id,
        username: user.username,
    })
}

/// Pull the token out of `Authorization: Bearer <token>`, distinguishing
/// the absent, multi-token, and undecodable cases.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::NotProvided)?;
    let raw = raw.to_str().map_err(|_| AuthError::Undecodable)?;

    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.first() {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {}
        _ => return Err(AuthError::NotProvided),
    }

    match parts.len() {
        1 => Err(AuthError::NoCredentials),
        2 => Ok(parts[1]),
        _ => Err(AuthError::MultiToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: Option<&[u8]>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = auth {
            map.insert(
                header::AUTHORIZATION,
                HeaderValue::from_bytes(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn missing_header_is_not_provided() {
        assert_eq!(bearer_token(&headers(None)).unwrap_err(), AuthError::NotProvided);
    }

    #[test]
    fn wrong_scheme_is_not_provided() {
        let h = headers(Some(b"Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&h).unwrap_err(), AuthError::NotProvided);
    }

    #[test]
    fn bare_keyword_has_no_credentials() {
        let h = headers(Some(b"Bearer"));
        assert_eq!(bearer_token(&h).unwrap_err(), AuthError::NoCredentials);
    }

    #[test]
    fn token_with_spaces_is_multi_token() {
        let h = headers(Some(b"Bearer abc def"));
        assert_eq!(bearer_token(&h).unwrap_err(), AuthError::MultiToken);
    }

    #[test]
    fn non_ascii_header_is_undecodable() {
        let h = headers(Some(b"Bearer t\xc3\xb8ken"));
        assert_eq!(bearer_token(&h).unwrap_err(), AuthError::Undecodable);
    }

    #[test]
    fn well_formed_header_yields_the_token() {
        let h = headers(Some(b"bearer abc123"));
        assert_eq!(bearer_token(&h).unwrap(), "abc123");
    }
}
