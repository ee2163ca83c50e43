//! services/client/src/testutil.rs
//!
//! Shared in-memory fakes and fixtures for the test modules: a credential
//! store, programmable auth/chat APIs, a channel-backed chat transport, and
//! a loopback HTTP server helper.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use telehealth_core::domain::{Credential, Message, NewUser, Profile, Role, Room};
use telehealth_core::ports::{
    AuthApi, AuthError, ChatApi, ChatError, CredentialStore,
};
use tokio::sync::{mpsc, Mutex};

use crate::chat::protocol::{ClientEvent, ServerEvent};
use crate::chat::state::ChatState;
use crate::chat::transport::{ChatConnection, ChatTransport};

//=========================================================================================
// Domain fixtures
//=========================================================================================

pub fn patient_profile(id: i64) -> Profile {
    Profile {
        id,
        email: "a@x.com".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        role: Role::Patient,
        patient_id: Some(1),
        doctor_id: None,
    }
}

pub fn patient_message(id: i64, sender_id: i64, text: &str) -> Message {
    Message {
        id,
        text: text.into(),
        sender_id,
        sender_role: Role::Patient,
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        created_at: Utc::now(),
        read_at: None,
        room_id: Some(42),
    }
}

pub fn doctor_message(id: i64, sender_id: i64, text: &str) -> Message {
    Message {
        sender_role: Role::Doctor,
        first_name: "Greg".into(),
        last_name: "House".into(),
        ..patient_message(id, sender_id, text)
    }
}

//=========================================================================================
// MemoryCredentialStore
//=========================================================================================

/// An in-memory `CredentialStore` with the same slot semantics as the
/// file-backed adapter.
#[derive(Default)]
pub struct MemoryCredentialStore {
    access: StdMutex<Option<String>>,
    refresh: StdMutex<Option<String>>,
    profile: StdMutex<Option<Profile>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.access.lock().unwrap().clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.refresh.lock().unwrap().clone()
    }

    fn profile(&self) -> Option<Profile> {
        self.profile.lock().unwrap().clone()
    }

    fn store(&self, credential: &Credential) {
        *self.access.lock().unwrap() = Some(credential.access_token.clone());
        *self.refresh.lock().unwrap() = Some(credential.refresh_token.clone());
        *self.profile.lock().unwrap() = Some(credential.user.clone());
    }

    fn replace_access_token(&self, access_token: &str) {
        *self.access.lock().unwrap() = Some(access_token.to_string());
    }

    fn clear(&self) {
        *self.access.lock().unwrap() = None;
        *self.refresh.lock().unwrap() = None;
        *self.profile.lock().unwrap() = None;
    }
}

//=========================================================================================
// FakeAuthApi
//=========================================================================================

/// A programmable `AuthApi`. Unconfigured operations fail the way the real
/// server would reject them.
#[derive(Clone, Default)]
pub struct FakeAuthApi {
    inner: Arc<FakeAuthInner>,
}

#[derive(Default)]
struct FakeAuthInner {
    login: StdMutex<Option<Credential>>,
    register: StdMutex<Option<Credential>>,
    refresh: StdMutex<Option<String>>,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    fail_logout: AtomicBool,
}

impl FakeAuthApi {
    pub fn with_login(self, credential: Credential) -> Self {
        *self.inner.login.lock().unwrap() = Some(credential);
        self
    }

    pub fn with_register(self, credential: Credential) -> Self {
        *self.inner.register.lock().unwrap() = Some(credential);
        self
    }

    pub fn with_refresh(self, access_token: &str) -> Self {
        *self.inner.refresh.lock().unwrap() = Some(access_token.to_string());
        self
    }

    pub fn failing_logout(self) -> Self {
        self.inner.fail_logout.store(true, Ordering::SeqCst);
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.inner.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn register(&self, _user: &NewUser, _password: &str) -> Result<Credential, AuthError> {
        self.inner
            .register
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::InvalidCredentials("Registration failed".into()))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<Credential, AuthError> {
        self.inner
            .login
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid email or password".into()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<String, AuthError> {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .refresh
            .lock()
            .unwrap()
            .clone()
            .ok_or(AuthError::RefreshRejected)
    }

    async fn logout(&self, _refresh_token: &str) -> Result<(), AuthError> {
        self.inner.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_logout.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection reset".into()));
        }
        Ok(())
    }
}

//=========================================================================================
// FakeChatApi
//=========================================================================================

/// A programmable `ChatApi` for chat-session tests.
#[derive(Clone, Default)]
pub struct FakeChatApi {
    inner: Arc<FakeChatInner>,
}

#[derive(Default)]
struct FakeChatInner {
    room: StdMutex<Option<Room>>,
    messages: StdMutex<Vec<Message>>,
    unread: AtomicUsize,
    unread_calls: AtomicUsize,
}

impl FakeChatApi {
    pub fn with_room(self, room: Room) -> Self {
        *self.inner.room.lock().unwrap() = Some(room);
        self
    }

    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        *self.inner.messages.lock().unwrap() = messages;
        self
    }

    pub fn with_unread(self, count: u32) -> Self {
        self.inner.unread.store(count as usize, Ordering::SeqCst);
        self
    }

    pub fn unread_calls(&self) -> usize {
        self.inner.unread_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn room(&self) -> Result<Room, ChatError> {
        self.inner
            .room
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChatError::RoomResolutionFailed("Failed to load chat room".into()))
    }

    async fn messages(&self, _room_id: i64) -> Result<Vec<Message>, ChatError> {
        Ok(self.inner.messages.lock().unwrap().clone())
    }

    async fn unread_count(&self) -> Result<u32, ChatError> {
        self.inner.unread_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.unread.load(Ordering::SeqCst) as u32)
    }
}

//=========================================================================================
// FakeTransport
//=========================================================================================

/// A channel-backed `ChatTransport`. Tests push server events through the
/// returned sender and inspect everything the session emitted.
pub struct FakeTransport {
    sent: Arc<StdMutex<Vec<ClientEvent>>>,
    connects: AtomicUsize,
    fail_connect: bool,
    server_events: StdMutex<Option<mpsc::UnboundedReceiver<Result<ServerEvent, ChatError>>>>,
}

impl FakeTransport {
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedSender<Result<ServerEvent, ChatError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            sent: Arc::new(StdMutex::new(Vec::new())),
            connects: AtomicUsize::new(0),
            fail_connect: false,
            server_events: StdMutex::new(Some(rx)),
        });
        (transport, tx)
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Arc::new(StdMutex::new(Vec::new())),
            connects: AtomicUsize::new(0),
            fail_connect: true,
            server_events: StdMutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn connect(&self, _token: &str) -> Result<Box<dyn ChatConnection>, ChatError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(ChatError::ConnectionFailed("connection refused".into()));
        }
        let rx = self
            .server_events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChatError::ConnectionFailed("already connected".into()))?;
        Ok(Box::new(FakeConnection {
            sent: self.sent.clone(),
            server_events: rx,
        }))
    }
}

struct FakeConnection {
    sent: Arc<StdMutex<Vec<ClientEvent>>>,
    server_events: mpsc::UnboundedReceiver<Result<ServerEvent, ChatError>>,
}

#[async_trait]
impl ChatConnection for FakeConnection {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent, ChatError>> {
        self.server_events.recv().await
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Serves an axum router on a loopback port and returns its base URL.
pub async fn spawn_fixture(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("fixture local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Polls the shared chat state until the predicate holds.
pub async fn wait_for_state(
    state: &Arc<Mutex<ChatState>>,
    predicate: impl Fn(&ChatState) -> bool,
) {
    for _ in 0..500 {
        if predicate(&*state.lock().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("chat state never reached the expected condition");
}
