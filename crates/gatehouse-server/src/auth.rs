//! HTTP Basic authentication against the staff-user directory.
//!
//! Packaged as an axum middleware: a verified request carries the resolved
//! staff identity as a [`CurrentUser`] extension, which the API handlers
//! extract. Password hashes are argon2 PHC strings stored per user.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use gatehouse_api::CurrentUser;
use gatehouse_core::store::UserDirectory;

/// State for the auth middleware — just a handle to the user directory.
pub struct AuthState<D> {
  pub users: Arc<D>,
}

impl<D> Clone for AuthState<D> {
  fn clone(&self) -> Self { Self { users: Arc::clone(&self.users) } }
}

/// Axum middleware: verify Basic credentials, then forward the request with
/// a [`CurrentUser`] extension attached.
pub async fn require_basic_auth<D>(
  State(state): State<AuthState<D>>,
  mut request: Request,
  next: Next,
) -> Response
where
  D: UserDirectory + 'static,
{
  match verify_basic(request.headers(), &state).await {
    Ok(username) => {
      request.extensions_mut().insert(CurrentUser(username));
      next.run(request).await
    }
    Err(response) => response,
  }
}

fn unauthorized() -> Response {
  let mut response =
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
  response.headers_mut().insert(
    header::WWW_AUTHENTICATE,
    HeaderValue::from_static("Basic realm=\"gatehouse\""),
  );
  response
}

/// Verify credentials from headers; returns the authenticated username.
async fn verify_basic<D>(
  headers: &HeaderMap,
  state: &AuthState<D>,
) -> Result<String, Response>
where
  D: UserDirectory,
{
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or_else(unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| unauthorized())?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| unauthorized())?;
  let (username, password) =
    creds.split_once(':').ok_or_else(unauthorized)?;

  let user = match state.users.find_user(username).await {
    Ok(Some(user)) => user,
    // Unknown user and lookup failure both read as 401; no oracle.
    Ok(None) => return Err(unauthorized()),
    Err(err) => {
      tracing::error!(error = %err, "user lookup failed during auth");
      return Err(unauthorized());
    }
  };

  let parsed_hash =
    PasswordHash::new(&user.password_hash).map_err(|_| unauthorized())?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| unauthorized())?;

  Ok(username.to_owned())
}

#[cfg(test)]
mod tests {
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{Router, http::Request, middleware, routing::get};
  use chrono::Utc;
  use gatehouse_core::visitor::StaffUser;
  use gatehouse_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  async fn echo_user(user: CurrentUser) -> String { user.0 }

  async fn make_app(password: &str) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    store
      .add_user(&StaffUser {
        username:      "clerk".into(),
        password_hash: hash,
        created_at:    Utc::now(),
      })
      .await
      .unwrap();

    let state = AuthState { users: Arc::new(store) };
    Router::new()
      .route("/whoami", get(echo_user))
      .layer(middleware::from_fn_with_state(
        state,
        require_basic_auth::<SqliteStore>,
      ))
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn request(app: Router, auth: Option<String>) -> Response {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(value) = auth {
      builder = builder.header(header::AUTHORIZATION, value);
    }
    app
      .oneshot(builder.body(axum::body::Body::empty()).unwrap())
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn correct_credentials_resolve_the_username() {
    let app = make_app("secret").await;
    let response = request(app, Some(basic("clerk", "secret"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    assert_eq!(&bytes[..], b"clerk");
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let app = make_app("secret").await;
    let response = request(app, Some(basic("clerk", "nope"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_user_is_rejected() {
    let app = make_app("secret").await;
    let response = request(app, Some(basic("ghost", "secret"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn missing_header_gets_a_challenge() {
    let app = make_app("secret").await;
    let response = request(app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
      .headers()
      .get(header::WWW_AUTHENTICATE)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(challenge.starts_with("Basic"));
  }

  #[tokio::test]
  async fn malformed_header_is_rejected() {
    let app = make_app("secret").await;
    let response =
      request(app, Some("Basic !!!not-base64!!!".to_owned())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }
}
