#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use atelier::auth::jwt::{encode_token, Claims};
use atelier::config::{Config, IdentityConfig, S3Config};
use atelier::keys;
use atelier::state::{AppState, SharedState};
use atelier::stores::blob::BlobStore;
use atelier::stores::identity::{IdentityProvider, IdentityUser};
use atelier::stores::queue::{MessageQueue, QueueMessage};
use atelier::stores::record::{RecordItem, RecordStore};
use atelier::stores::StoreError;

const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Backend(format!("injected {what} failure")))
    } else {
        Ok(())
    }
}

// ── In-memory record store ──────────────────────────────────────

#[derive(Default)]
pub struct MemoryRecordStore {
    items: Mutex<BTreeMap<(String, String), Value>>,
    pub fail_query: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_put: AtomicBool,
}

impl MemoryRecordStore {
    pub fn insert(&self, partition_key: &str, sort_key: &str, attributes: Value) {
        self.items
            .lock()
            .unwrap()
            .insert((partition_key.to_string(), sort_key.to_string()), attributes);
    }

    pub fn contains(&self, partition_key: &str, sort_key: &str) -> bool {
        self.items
            .lock()
            .unwrap()
            .contains_key(&(partition_key.to_string(), sort_key.to_string()))
    }

    pub fn partition_len(&self, partition_key: &str) -> usize {
        self.items
            .lock()
            .unwrap()
            .keys()
            .filter(|(pk, _)| pk == partition_key)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(
        &self,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<RecordItem>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&(partition_key.to_string(), sort_key.to_string()))
            .map(|attributes| RecordItem {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.to_string(),
                attributes: attributes.clone(),
            }))
    }

    async fn put(&self, item: &RecordItem) -> Result<(), StoreError> {
        injected(&self.fail_put, "put")?;
        self.insert(&item.partition_key, &item.sort_key, item.attributes.clone());
        Ok(())
    }

    async fn delete(&self, partition_key: &str, sort_key: &str) -> Result<(), StoreError> {
        injected(&self.fail_delete, "delete")?;
        self.items
            .lock()
            .unwrap()
            .remove(&(partition_key.to_string(), sort_key.to_string()));
        Ok(())
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
    ) -> Result<Vec<RecordItem>, StoreError> {
        injected(&self.fail_query, "query")?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|((pk, sk), _)| {
                pk == partition_key && sort_key_prefix.is_none_or(|p| sk.starts_with(p))
            })
            .map(|((pk, sk), attributes)| RecordItem {
                partition_key: pk.clone(),
                sort_key: sk.clone(),
                attributes: attributes.clone(),
            })
            .collect())
    }

    async fn put_if_status(&self, item: &RecordItem, expected: &str) -> Result<bool, StoreError> {
        let mut items = self.items.lock().unwrap();
        let key = (item.partition_key.clone(), item.sort_key.clone());
        let current_matches = items
            .get(&key)
            .and_then(|v| v.get("status"))
            .and_then(|s| s.as_str())
            .is_some_and(|s| s == expected);
        if current_matches {
            items.insert(key, item.attributes.clone());
        }
        Ok(current_matches)
    }
}

// ── In-memory blob store ────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeSet<String>>,
    pub fail_list: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MemoryBlobStore {
    pub fn put(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        injected(&self.fail_list, "list")?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        injected(&self.fail_delete, "delete batch")?;
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        injected(&self.fail_delete, "delete")?;
        // Missing keys are not an error, matching S3 semantics.
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ── In-memory identity provider ─────────────────────────────────

pub struct FakeAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub enabled: bool,
}

#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<Uuid, FakeAccount>>,
    pub fail_disable: AtomicBool,
}

impl MemoryIdentity {
    pub fn add_account(&self, id: Uuid, username: &str, email: &str, password: &str) {
        self.accounts.lock().unwrap().insert(
            id,
            FakeAccount {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                enabled: true,
            },
        );
    }

    pub fn is_enabled(&self, id: Uuid) -> Option<bool> {
        self.accounts.lock().unwrap().get(&id).map(|a| a.enabled)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn get_user(&self, id: Uuid) -> Result<IdentityUser, StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|a| IdentityUser {
                id,
                username: a.username.clone(),
                email: Some(a.email.clone()),
                enabled: a.enabled,
            })
            .ok_or(StoreError::NotFound)
    }

    async fn disable_user(&self, id: Uuid) -> Result<(), StoreError> {
        injected(&self.fail_disable, "disable")?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.enabled = false;
        Ok(())
    }

    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool, StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|a| a.password == password)
            .ok_or(StoreError::NotFound)
    }
}

// ── In-memory message queue ─────────────────────────────────────

/// At-least-once queue: unacked messages are returned by every receive.
#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<QueueMessage>>,
}

impl MemoryQueue {
    pub fn unacked_len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, body: &str, _attributes: &[(String, String)]) -> Result<(), StoreError> {
        self.messages.lock().unwrap().push(QueueMessage {
            body: body.to_string(),
            receipt: Uuid::now_v7().to_string(),
        });
        Ok(())
    }

    async fn receive(&self, max: i32) -> Result<Vec<QueueMessage>, StoreError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .take(max as usize)
            .cloned()
            .collect())
    }

    async fn ack(&self, receipt: &str) -> Result<(), StoreError> {
        self.messages.lock().unwrap().retain(|m| m.receipt != receipt);
        Ok(())
    }
}

// ── In-memory mailer ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Default)]
pub struct MemoryMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl atelier::email::Mailer for MemoryMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("injected smtp failure".to_string());
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text_body.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

// ── Harness ─────────────────────────────────────────────────────

pub struct TestHarness {
    pub state: SharedState,
    pub records: Arc<MemoryRecordStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub identity: Arc<MemoryIdentity>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        log_level: "warn".to_string(),
        cleanup_interval_secs: 60,
        s3: S3Config {
            endpoint: "http://localhost:8333".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            bucket: "atelier-test".to_string(),
        },
        identity: IdentityConfig {
            base_url: "http://localhost:8080".to_string(),
            realm: "atelier-test".to_string(),
            client_id: "atelier-backend".to_string(),
            admin_token: "test-admin-token".to_string(),
        },
        rejection_queue_url: None,
        smtp: None,
    }
}

pub fn harness() -> TestHarness {
    let records = Arc::new(MemoryRecordStore::default());
    let blobs = Arc::new(MemoryBlobStore::default());
    let identity = Arc::new(MemoryIdentity::default());
    let mailer = Arc::new(MemoryMailer::default());

    let state = Arc::new(AppState {
        records: records.clone() as Arc<dyn RecordStore>,
        blobs: blobs.clone() as Arc<dyn BlobStore>,
        identity: identity.clone() as Arc<dyn IdentityProvider>,
        mailer: Some(mailer.clone() as Arc<dyn atelier::email::Mailer>),
        config: test_config(),
    });

    TestHarness {
        state,
        records,
        blobs,
        identity,
        mailer,
    }
}

/// Seed a member: identity account, profile record, one artwork pointer
/// record and its four blob variants. Returns the art id.
pub fn seed_member(h: &TestHarness, member_id: Uuid, email: &str, password: &str) -> Uuid {
    h.identity.add_account(member_id, "artist", email, password);

    let partition = keys::member_partition(member_id);
    h.records.insert(
        &partition,
        keys::PROFILE_SORT_KEY,
        json!({ "email": email, "name": "Artist" }),
    );

    let art_id = Uuid::now_v7();
    h.records
        .insert(&partition, &keys::art_sort_key(art_id), json!({ "title": "Dusk" }));

    for key in keys::art_variant_keys(member_id, art_id) {
        h.blobs.put(&key);
    }

    art_id
}

// ── HTTP test app ───────────────────────────────────────────────

/// A running test server over in-memory collaborators.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub harness: TestHarness,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token_for(&self, member_id: Uuid, email: &str) -> String {
        let claims = Claims::new(member_id, email.to_string(), false);
        encode_token(&claims, TEST_JWT_SECRET).expect("token encode failed")
    }

    pub fn admin_token(&self) -> String {
        let claims = Claims::new(Uuid::now_v7(), "admin@test.com".to_string(), true);
        encode_token(&claims, TEST_JWT_SECRET).expect("token encode failed")
    }

    pub async fn delete_account(&self, token: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url("/api/v1/account"))
            .bearer_auth(token)
            .json(&json!({ "password": password }))
            .send()
            .await
            .expect("delete account request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub async fn spawn_app() -> TestApp {
    let harness = harness();
    let app = atelier::build_app(harness.state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        harness,
    }
}
