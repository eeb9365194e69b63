use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

const AUDIENCE: &str = "authenticated";

/// The claims of a backend issued access token that the directory relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
	pub user_id: Uuid,
	pub email: Option<String>,
	pub issued_at: i64,
	pub not_before: Option<i64>,
	pub expires_at: i64,
}

impl AccessClaims {
	fn to_claims(&self) -> Claims {
		let mut private = BTreeMap::new();
		if let Some(email) = &self.email {
			private.insert("email".to_owned(), Value::String(email.clone()));
		}
		private.insert("role".to_owned(), Value::String(AUDIENCE.to_owned()));

		Claims {
			registered: RegisteredClaims {
				issuer: None,
				subject: Some(self.user_id.to_string()),
				audience: Some(AUDIENCE.to_owned()),
				expiration: Some(self.expires_at as u64),
				not_before: self.not_before.map(|x| x as u64),
				issued_at: Some(self.issued_at as u64),
				json_web_token_id: None,
			},
			private,
		}
	}

	fn from_claims(claims: &Claims) -> Option<Self> {
		Some(Self {
			user_id: claims.registered.subject.as_ref().and_then(|x| Uuid::parse_str(x).ok())?,
			email: claims.private.get("email").and_then(Value::as_str).map(str::to_owned),
			issued_at: claims.registered.issued_at? as i64,
			not_before: claims.registered.not_before.map(|x| x as i64),
			expires_at: claims.registered.expiration? as i64,
		})
	}

	pub fn sign(&self, secret: &str) -> Option<String> {
		let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
		self.to_claims().sign_with_key(&key).ok()
	}

	/// Checks the signature and the time claims. `iat` must not lie in the
	/// future, `nbf` must have passed and `exp` must not have.
	pub fn verify(secret: &str, token: &str) -> Option<Self> {
		let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
		let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;

		let claims = token.claims();
		let now = Utc::now();

		let iat = Utc.timestamp_opt(claims.registered.issued_at? as i64, 0).single()?;
		if iat > now {
			return None;
		}

		let nbf = claims
			.registered
			.not_before
			.and_then(|x| Utc.timestamp_opt(x as i64, 0).single());
		if let Some(nbf) = nbf {
			if nbf > now {
				return None;
			}
		}

		let exp = Utc.timestamp_opt(claims.registered.expiration? as i64, 0).single()?;
		if exp < now {
			return None;
		}

		Self::from_claims(claims)
	}
}
