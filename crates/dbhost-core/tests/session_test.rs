#![allow(clippy::unwrap_used)]
// Session manager tests: login state machine, account selection, logout.

use std::collections::VecDeque;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dbhost_api::{Account, Error as ApiError};
use dbhost_config::{CredentialError, CredentialStore, PersistedCredential, StoredConfig};
use dbhost_core::{CoreError, Prompter, Revocation, SessionManager};

// ── Helpers ─────────────────────────────────────────────────────────

/// Replays canned answers; runs out by cancelling.
#[derive(Default)]
struct ScriptedPrompter {
    codes: VecDeque<String>,
    choice: Option<String>,
    codes_asked: usize,
    offered: Vec<String>,
}

impl ScriptedPrompter {
    fn with_codes(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn email(&mut self) -> Result<String, CoreError> {
        Ok("a@x.com".into())
    }

    fn password(&mut self) -> Result<SecretString, CoreError> {
        Ok(SecretString::from("pw".to_string()))
    }

    fn second_factor(&mut self) -> Result<String, CoreError> {
        self.codes_asked += 1;
        self.codes.pop_front().ok_or(CoreError::Cancelled)
    }

    fn choose_account(&mut self, accounts: &[Account]) -> Result<String, CoreError> {
        self.offered = accounts.iter().map(|a| a.slug.clone()).collect();
        self.choice.clone().ok_or(CoreError::Cancelled)
    }
}

/// Fails the test if any prompt is shown.
struct NoPrompts;

impl Prompter for NoPrompts {
    fn email(&mut self) -> Result<String, CoreError> {
        panic!("unexpected email prompt")
    }
    fn password(&mut self) -> Result<SecretString, CoreError> {
        panic!("unexpected password prompt")
    }
    fn second_factor(&mut self) -> Result<String, CoreError> {
        panic!("unexpected second-factor prompt")
    }
    fn choose_account(&mut self, _accounts: &[Account]) -> Result<String, CoreError> {
        panic!("unexpected account prompt")
    }
}

struct Fixture {
    _dir: TempDir,
    config_path: PathBuf,
    store: CredentialStore,
    manager: SessionManager,
}

fn fixture(base_url: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let store = CredentialStore::new(dir.path());
    let manager = SessionManager::with_client(
        reqwest::Client::new(),
        Url::parse(base_url).unwrap(),
        store.clone(),
        config_path.clone(),
    );
    Fixture {
        _dir: dir,
        config_path,
        store,
        manager,
    }
}

fn saved_account(fx: &Fixture) -> Option<String> {
    dbhost_config::load_config_from(&fx.config_path)
        .unwrap()
        .account
}

fn store_credential(fx: &Fixture, token: &str) {
    fx.store
        .save(&PersistedCredential {
            email: "a@x.com".into(),
            oauth_token: SecretString::from(token.to_string()),
        })
        .unwrap();
}

async fn mount_second_factor_login(server: &MockServer, code: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({
            "email": "a@x.com",
            "password": "pw",
            "second_factor_token": code,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok1" })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "Error": "2fa token required" })),
        )
        .mount(server)
        .await;
}

async fn mount_accounts(server: &MockServer, slugs: &[&str]) {
    let accounts: Vec<_> = slugs.iter().map(|slug| json!({ "slug": slug })).collect();
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accounts))
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_with_second_factor() {
    let server = MockServer::start().await;
    mount_second_factor_login(&server, "123456").await;
    mount_accounts(&server, &["acme"]).await;

    let fx = fixture(&server.uri());
    let mut prompter = ScriptedPrompter::with_codes(&["123456"]);

    let session = fx.manager.login(&mut prompter).await.unwrap();

    assert_eq!(session.token().expose_secret(), "tok1");
    assert_eq!(session.account(), Some("acme"));
    assert_eq!(prompter.codes_asked, 1);

    let stored = fx.store.load().unwrap();
    assert_eq!(stored.email, "a@x.com");
    assert_eq!(stored.oauth_token.expose_secret(), "tok1");
    assert_eq!(saved_account(&fx).as_deref(), Some("acme"));

    // Only the selection is written; defaults stay out of the file.
    let saved = std::fs::read_to_string(&fx.config_path).unwrap();
    assert_eq!(saved.trim(), "account = \"acme\"");
}

#[tokio::test]
async fn test_rejected_codes_reprompt_until_cancelled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "Error": "2fa token required" })),
        )
        .expect(4)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri());
    let mut prompter = ScriptedPrompter::with_codes(&["111111", "222222", "333333"]);

    let err = fx.manager.login(&mut prompter).await.unwrap_err();

    assert!(err.is_cancelled(), "expected cancellation, got: {err:?}");
    assert_eq!(prompter.codes_asked, 4);
    assert!(!fx.store.exists());
}

#[tokio::test]
async fn test_bad_password_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "Error": "invalid email or password" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri());
    let mut prompter = ScriptedPrompter::with_codes(&["123456"]);

    let err = fx.manager.login(&mut prompter).await.unwrap_err();

    assert!(matches!(err, CoreError::Api(ApiError::Authentication { .. })));
    assert_eq!(prompter.codes_asked, 0);
    assert!(!fx.store.exists());
}

#[tokio::test]
async fn test_login_surfaces_deprecation_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-User-Agent-Deprecated", "true")
                .insert_header("X-User-Agent-Deprecation-Message", "upgrade before June")
                .set_body_json(json!({ "token": "tok1" })),
        )
        .mount(&server)
        .await;
    mount_accounts(&server, &["acme"]).await;

    let fx = fixture(&server.uri());
    fx.manager.login(&mut ScriptedPrompter::default()).await.unwrap();

    assert_eq!(
        fx.manager.take_deprecation_notice().as_deref(),
        Some("upgrade before June")
    );
}

// ── Account selection ───────────────────────────────────────────────

#[tokio::test]
async fn test_several_accounts_go_to_the_prompter() {
    let server = MockServer::start().await;
    mount_second_factor_login(&server, "123456").await;
    mount_accounts(&server, &["acme", "globex"]).await;

    let fx = fixture(&server.uri());
    let mut prompter = ScriptedPrompter::with_codes(&["123456"]);
    prompter.choice = Some("globex".into());

    let session = fx.manager.login(&mut prompter).await.unwrap();

    assert_eq!(prompter.offered, vec!["acme".to_string(), "globex".to_string()]);
    assert_eq!(session.account(), Some("globex"));
    assert_eq!(saved_account(&fx).as_deref(), Some("globex"));
}

#[tokio::test]
async fn test_unknown_choice_is_rejected() {
    let server = MockServer::start().await;
    mount_accounts(&server, &["acme", "globex"]).await;

    let fx = fixture(&server.uri());
    store_credential(&fx, "tok1");
    let mut prompter = ScriptedPrompter {
        choice: Some("initech".into()),
        ..ScriptedPrompter::default()
    };

    let session = fx.manager.load_session().unwrap();
    let err = fx
        .manager
        .select_account(session, &mut prompter)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UnknownAccount { ref slug } if slug == "initech"));
    assert_eq!(saved_account(&fx), None);
}

#[tokio::test]
async fn test_no_accounts() {
    let server = MockServer::start().await;
    mount_accounts(&server, &[]).await;

    let fx = fixture(&server.uri());
    store_credential(&fx, "tok1");

    let session = fx.manager.load_session().unwrap();
    let err = fx
        .manager
        .select_account(session, &mut NoPrompts)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NoAccounts { .. }));
}

// ── Stored sessions ─────────────────────────────────────────────────

#[tokio::test]
async fn test_require_session_uses_stored_credential() {
    let fx = fixture("http://127.0.0.1:9");
    store_credential(&fx, "tok1");
    StoredConfig {
        account: Some("acme".into()),
        ..StoredConfig::default()
    }
    .save(&fx.config_path)
    .unwrap();

    let session = fx.manager.require_session(&mut NoPrompts).await.unwrap();

    assert_eq!(session.token().expose_secret(), "tok1");
    assert_eq!(session.account(), Some("acme"));
}

#[tokio::test]
async fn test_require_session_falls_back_to_login() {
    let server = MockServer::start().await;
    mount_second_factor_login(&server, "654321").await;
    mount_accounts(&server, &["acme"]).await;

    let fx = fixture(&server.uri());
    std::fs::write(fx.store.path(), b"garbage").unwrap();
    assert!(matches!(fx.store.load(), Err(CredentialError::Parse(_))));

    let mut prompter = ScriptedPrompter::with_codes(&["654321"]);
    let session = fx.manager.require_session(&mut prompter).await.unwrap();

    assert_eq!(session.token().expose_secret(), "tok1");
    assert_eq!(fx.store.load().unwrap().oauth_token.expose_secret(), "tok1");
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_revokes_and_cleans_up() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/authorization"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri());
    store_credential(&fx, "tok1");

    let report = fx.manager.logout().await.unwrap();

    assert!(matches!(report.revocation, Revocation::Revoked));
    assert!(report.credential_removed);
    assert!(matches!(fx.store.load(), Err(CredentialError::NotFound { .. })));
}

#[tokio::test]
async fn test_logout_cleans_up_when_revocation_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fx = fixture(&format!("http://{addr}"));
    store_credential(&fx, "tok1");
    StoredConfig {
        account: Some("acme".into()),
        timeout: Some(7),
        ..StoredConfig::default()
    }
    .save(&fx.config_path)
    .unwrap();

    let report = fx.manager.logout().await.unwrap();

    match report.revocation {
        Revocation::Failed(e) => assert!(e.is_transport(), "got: {e:?}"),
        other => panic!("expected failed revocation, got: {other:?}"),
    }
    assert!(report.credential_removed);
    assert!(matches!(fx.store.load(), Err(CredentialError::NotFound { .. })));

    let config = dbhost_config::load_config_from(&fx.config_path).unwrap();
    assert_eq!(config.account, None);
    assert_eq!(config.timeout, 7);
}

#[tokio::test]
async fn test_logout_without_credentials() {
    let fx = fixture("http://127.0.0.1:9");

    let report = fx.manager.logout().await.unwrap();

    assert!(matches!(report.revocation, Revocation::Skipped));
    assert!(!report.credential_removed);
}

#[tokio::test]
async fn test_logout_revokes_even_when_config_is_unreadable() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/authorization"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri());
    store_credential(&fx, "tok1");
    std::fs::write(&fx.config_path, "account = \"acme\"\ntimeout = \"soon\"\n").unwrap();

    let err = fx.manager.logout().await.unwrap_err();

    assert!(matches!(err, CoreError::Config(_)), "got: {err:?}");
    assert!(matches!(fx.store.load(), Err(CredentialError::NotFound { .. })));
    server.verify().await;
}
