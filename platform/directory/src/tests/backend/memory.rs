use bytes::Bytes;
use hyper::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::backend::memory::{hash_password, slugify, verify_password, MemoryBackend};
use crate::backend::{AuthBackend, BackendError, DataBackend, Query, StorageBackend, Table};
use crate::database::{ProfileChanges, Stage, Startup, Update, UpdateChanges};

fn backend() -> MemoryBackend {
	MemoryBackend::new("http://localhost:4000/")
		.with_auto_confirm(true)
		.with_bucket("startup-logos")
}

async fn founder(backend: &MemoryBackend, email: &str, name: &str) -> (Uuid, String) {
	let outcome = backend
		.sign_up(email, "hunter22", name, None)
		.await
		.expect("failed to sign up");
	let session = outcome.session.expect("auto confirm should return a session");
	(outcome.user.id, session.access_token)
}

fn changes(content: &str, published: bool) -> UpdateChanges {
	UpdateChanges {
		title: None,
		content_md: content.to_owned(),
		is_published: published,
	}
}

#[test]
fn test_slugify() {
	assert_eq!(slugify("Acme Robotics!"), "acme-robotics");
	assert_eq!(slugify("  --Hello   World--  "), "hello-world");
	assert_eq!(slugify("?"), "startup");
	assert_eq!(slugify(&"a".repeat(80)).len(), 60);
}

#[tokio::test]
async fn test_sign_up_creates_startup() {
	let backend = backend();
	let (id, token) = founder(&backend, "Founder@Example.com", "Acme Robotics").await;

	let startup = Startup::by_id(&backend, &token, id)
		.await
		.expect("failed to fetch startup")
		.expect("startup should exist");
	assert_eq!(startup.name, "Acme Robotics");
	assert_eq!(startup.slug, "acme-robotics");
	assert_eq!(startup.stage, Stage::Idea);
	assert!(startup.is_public);

	let (other, other_token) = founder(&backend, "other@example.com", "Acme Robotics").await;
	let other = Startup::by_id(&backend, &other_token, other)
		.await
		.expect("failed to fetch startup")
		.expect("startup should exist");
	assert_eq!(other.slug, "acme-robotics-2");

	let err = backend
		.sign_up("founder@example.com", "hunter22", "Again", None)
		.await
		.expect_err("duplicate sign up should fail");
	assert!(matches!(err, BackendError::Rejected { status, .. } if status == StatusCode::UNPROCESSABLE_ENTITY));
}

#[tokio::test]
async fn test_confirmation_required() {
	let backend = MemoryBackend::new("http://localhost:4000");
	let outcome = backend
		.sign_up("founder@example.com", "hunter22", "Acme", None)
		.await
		.expect("failed to sign up");
	assert!(outcome.session.is_none());

	let err = backend
		.sign_in("founder@example.com", "hunter22")
		.await
		.expect_err("unconfirmed sign in should fail");
	assert_eq!(err.backend_message(), Some("Email not confirmed"));

	assert!(backend.confirm_email("FOUNDER@example.com"));
	backend
		.sign_in("founder@example.com", "hunter22")
		.await
		.expect("confirmed sign in should work");

	let err = backend
		.sign_in("founder@example.com", "wrong-password")
		.await
		.expect_err("bad password should fail");
	assert_eq!(err.backend_message(), Some("Invalid login credentials"));
}

#[tokio::test]
async fn test_refresh_and_sign_out() {
	let backend = backend();
	let outcome = backend
		.sign_up("founder@example.com", "hunter22", "Acme", None)
		.await
		.expect("failed to sign up");
	let session = outcome.session.expect("session");

	let refreshed = backend.refresh(&session.refresh_token).await.expect("failed to refresh");
	assert_ne!(refreshed.access_token, session.access_token);

	// refresh tokens are single use
	assert!(backend.refresh(&session.refresh_token).await.is_err());

	backend.sign_out(&refreshed.access_token).await.expect("failed to sign out");
	let err = backend.get_user(&refreshed.access_token).await.expect_err("token should be revoked");
	assert!(matches!(err, BackendError::Unauthorized(_)));
}

#[test]
fn test_password_hashing() {
	let hash = hash_password("hunter22").expect("failed to hash password");
	assert!(hash.starts_with("$argon2"));
	assert!(verify_password(&hash, "hunter22"));
	assert!(!verify_password(&hash, "hunter23"));
	assert!(!verify_password("not a phc string", "hunter22"));

	// salted, so the same password never hashes the same twice
	assert_ne!(hash, hash_password("hunter22").expect("failed to hash password"));
}

#[tokio::test]
async fn test_expired_tokens_are_pruned() {
	let backend = backend().with_token_ttl(0);
	let outcome = backend
		.sign_up("founder@example.com", "hunter22", "Acme", None)
		.await
		.expect("failed to sign up");
	let expired = outcome.session.expect("session").access_token;
	assert_eq!(backend.access_token_count(), 1);

	let session = backend.sign_in("founder@example.com", "hunter22").await.expect("failed to sign in");
	assert_eq!(backend.access_token_count(), 1);
	assert!(backend.get_user(&expired).await.is_err());
	assert!(backend.get_user(&session.access_token).await.is_err());

	let backend = backend.with_token_ttl(3600);
	let session = backend.sign_in("founder@example.com", "hunter22").await.expect("failed to sign in");
	assert_eq!(backend.access_token_count(), 1);
	assert!(backend.get_user(&session.access_token).await.is_ok());
}

#[tokio::test]
async fn test_visibility_rules() {
	let backend = backend();
	let (id, token) = founder(&backend, "founder@example.com", "Acme").await;
	let (_, stranger) = founder(&backend, "stranger@example.com", "Stranger").await;

	let draft = Update::create(&backend, &token, id, &changes(&"d".repeat(60), false))
		.await
		.expect("failed to create draft");
	let published = Update::create(&backend, &token, id, &changes(&"p".repeat(60), true))
		.await
		.expect("failed to create update");

	let feed = Update::published_feed(&backend, 20).await.expect("failed to fetch feed");
	assert_eq!(feed.len(), 1);
	assert_eq!(feed[0].update.id, published.id);
	assert_eq!(feed[0].startup.id, id);

	assert!(Update::by_id(&backend, None, draft.id).await.expect("query").is_none());
	assert!(Update::by_id(&backend, Some(&stranger), draft.id).await.expect("query").is_none());
	assert!(Update::by_id(&backend, Some(&token), draft.id).await.expect("query").is_some());

	let owned = Update::for_owner(&backend, &token, id, None).await.expect("failed to list");
	assert_eq!(owned.iter().map(|u| u.id).collect::<Vec<_>>(), vec![published.id, draft.id]);

	// hiding the startup hides its updates from everyone else
	let profile = ProfileChanges {
		name: "Acme".to_owned(),
		slug: "acme".to_owned(),
		is_public: Some(false),
		..Default::default()
	};
	Startup::save_profile(&backend, &token, id, &profile)
		.await
		.expect("failed to save profile");

	assert!(Update::published_feed(&backend, 20).await.expect("feed").is_empty());
	assert!(Startup::public_by_slug(&backend, "acme").await.expect("query").is_none());
}

#[tokio::test]
async fn test_owner_only_writes() {
	let backend = backend();
	let (id, token) = founder(&backend, "founder@example.com", "Acme").await;
	let (stranger_id, stranger) = founder(&backend, "stranger@example.com", "Stranger").await;

	let err = Update::create(&backend, &stranger, id, &changes(&"x".repeat(60), true))
		.await
		.expect_err("writing for another startup should fail");
	assert!(matches!(err, BackendError::Unauthorized(_)));

	let update = Update::create(&backend, &token, id, &changes(&"x".repeat(60), true))
		.await
		.expect("failed to create");

	let edited = Update::edit(&backend, &stranger, stranger_id, update.id, &changes(&"y".repeat(60), true))
		.await
		.expect("query");
	assert!(edited.is_none());
	assert!(!Update::delete(&backend, &stranger, stranger_id, update.id).await.expect("query"));
	assert!(Update::delete(&backend, &token, id, update.id).await.expect("query"));
}

#[tokio::test]
async fn test_slug_conflict() {
	let backend = backend();
	let (_, _) = founder(&backend, "first@example.com", "Taken Name").await;
	let (id, token) = founder(&backend, "second@example.com", "Second").await;

	let profile = ProfileChanges {
		name: "Second".to_owned(),
		slug: "taken-name".to_owned(),
		..Default::default()
	};
	let err = Startup::save_profile(&backend, &token, id, &profile)
		.await
		.expect_err("slug should conflict");
	assert!(matches!(err, BackendError::Conflict(_)));

	// keeping your own slug is fine
	let profile = ProfileChanges {
		slug: "second".to_owned(),
		..profile
	};
	let saved = Startup::save_profile(&backend, &token, id, &profile)
		.await
		.expect("failed to save");
	assert_eq!(saved.slug, "second");
}

#[tokio::test]
async fn test_storage() {
	let backend = backend();
	let (_, token) = founder(&backend, "founder@example.com", "Acme").await;

	let url = backend
		.upload(&token, "startup-logos", "a/logo.png", Bytes::from_static(b"png"), "image/png", 3600)
		.await
		.expect("failed to upload");
	assert_eq!(url, "http://localhost:4000/storage/v1/object/public/startup-logos/a/logo.png");
	assert_eq!(backend.object_path("startup-logos", &url).as_deref(), Some("a/logo.png"));
	assert_eq!(backend.object_path("startup-logos", "blob:http://x/1"), None);

	let stored = backend.object("startup-logos", "a/logo.png").expect("object should exist");
	assert_eq!(stored.cache_control, "max-age=3600");

	let err = backend
		.upload(&token, "startup-logos", "a/logo.png", Bytes::new(), "image/png", 3600)
		.await
		.expect_err("objects are not overwritten");
	assert!(matches!(err, BackendError::Conflict(_)));

	let err = backend
		.upload(&token, "missing", "a/logo.png", Bytes::new(), "image/png", 3600)
		.await
		.expect_err("bucket should be missing");
	assert!(matches!(err, BackendError::BucketNotFound(_)));

	backend
		.remove(&token, "startup-logos", &["a/logo.png".to_owned()])
		.await
		.expect("failed to remove");
	assert!(backend.object("startup-logos", "a/logo.png").is_none());
}

#[tokio::test]
async fn test_select_requires_valid_token() {
	let backend = backend();
	let err = backend
		.select(Some("bogus"), &Query::new(Table::Startups))
		.await
		.expect_err("bogus token should be rejected");
	assert!(matches!(err, BackendError::Unauthorized(_)));

	let err = backend
		.insert("bogus", Table::Updates, json!({}))
		.await
		.expect_err("bogus token should be rejected");
	assert!(matches!(err, BackendError::Unauthorized(_)));
}
