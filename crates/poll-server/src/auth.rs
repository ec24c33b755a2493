//! HTTP Basic admin authentication.
//!
//! [`authorize`] runs in front of every route and attaches an
//! [`Authorization`] to the request: admin when valid credentials are
//! presented, anonymous otherwise. Deciding which operations need an admin is
//! left to the survey facade.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use poll_core::moderation::Authorization;
use rand_core::OsRng;

use crate::error::{Error, Result};

/// Credentials accepted as the survey administrator.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Produce the argon2 PHC string to put in `admin_password_hash`.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// Verify Basic credentials in `headers`, returning the username on success.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<String> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(username.to_owned())
}

/// Middleware attaching the caller's [`Authorization`] to the request.
pub async fn authorize(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Response {
  let authorization = if req.headers().contains_key(header::AUTHORIZATION) {
    match verify_auth(req.headers(), &auth) {
      Ok(username) => Authorization::admin(username),
      Err(_) => {
        tracing::warn!(uri = %req.uri(), "rejected admin credentials");
        Authorization::anonymous()
      }
    }
  } else {
    Authorization::anonymous()
  };

  req.extensions_mut().insert(authorization);
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn config(password: &str) -> AuthConfig {
    AuthConfig {
      username:      "admin".to_string(),
      password_hash: hash_password(password).unwrap(),
    }
  }

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let encoded = B64.encode(format!("{user}:{pass}"));
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
    );
    headers
  }

  #[test]
  fn correct_credentials() {
    let cfg = config("secret");
    assert_eq!(verify_auth(&basic("admin", "secret"), &cfg).unwrap(), "admin");
  }

  #[test]
  fn wrong_password() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&basic("admin", "wrong"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn wrong_username() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&basic("root", "secret"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn invalid_base64() {
    let cfg = config("secret");
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_static("Basic !!!not-base64!!!"),
    );
    assert!(matches!(verify_auth(&headers, &cfg), Err(Error::Unauthorized)));
  }
}
