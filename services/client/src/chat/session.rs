//! services/client/src/chat/session.rs
//!
//! This is the main entry point and control loop for a chat session.
//! It drives the connection through its phases and processes room traffic,
//! typing signals, presence, read receipts, and the unread-count poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use telehealth_core::domain::Message;
use telehealth_core::ports::{ChatApi, ChatError};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::SessionManager;
use crate::chat::protocol::{ClientEvent, ServerEvent};
use crate::chat::state::{ChatState, SessionPhase};
use crate::chat::transport::{ChatConnection, ChatTransport};

/// How long after the last edit the typing indicator is withdrawn.
const TYPING_IDLE: Duration = Duration::from_millis(1000);
/// Reconciliation interval for the unread count, independent of traffic.
const UNREAD_POLL_INTERVAL: Duration = Duration::from_secs(30);

//=========================================================================================
// Commands and Notices
//=========================================================================================

/// UI-originated commands processed by the session loop.
#[derive(Debug)]
pub enum ChatCommand {
    /// The user edited the draft. Drives the typing indicator.
    InputChanged(String),
    /// The user submitted the current draft.
    Send,
}

/// Side effects the UI layer reacts to.
#[derive(Debug)]
pub enum ChatNotice {
    MessageReceived(Message),
    ScrollToLatest,
    Error(String),
}

//=========================================================================================
// ChatHandle
//=========================================================================================

/// The UI-facing handle for one spawned chat session.
pub struct ChatHandle {
    commands: mpsc::UnboundedSender<ChatCommand>,
    pub state: Arc<Mutex<ChatState>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ChatHandle {
    pub fn input_changed(&self, draft: impl Into<String>) {
        let _ = self.commands.send(ChatCommand::InputChanged(draft.into()));
    }

    pub fn send_message(&self) {
        let _ = self.commands.send(ChatCommand::Send);
    }

    /// Tears the session down: disconnects the transport and cancels the
    /// typing timer and unread poll along with the control loop.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Waits for the control loop to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

//=========================================================================================
// ChatSession
//=========================================================================================

/// One result of a `select!` round in the control loop. Extracted so the
/// handlers below can borrow the connection and timers freely.
enum Step {
    Cancelled,
    AuthStateChanged(bool),
    Event(Option<Result<ServerEvent, ChatError>>),
    Command(Option<ChatCommand>),
    PollUnread,
    TypingIdle,
}

pub struct ChatSession {
    session: Arc<SessionManager>,
    api: Arc<dyn ChatApi>,
    state: Arc<Mutex<ChatState>>,
    notices: mpsc::UnboundedSender<ChatNotice>,
}

impl ChatSession {
    /// Spawns the session control loop and returns its handle. The session
    /// consults the session manager once for its connection credential; if
    /// none is present it never attempts to connect.
    pub fn spawn(
        session: Arc<SessionManager>,
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn ChatTransport>,
        notices: mpsc::UnboundedSender<ChatNotice>,
    ) -> ChatHandle {
        let cancel = CancellationToken::new();
        let mut initial = ChatState::new();
        initial.cancellation_token = cancel.clone();
        let state = Arc::new(Mutex::new(initial));

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let worker = ChatSession {
            session,
            api,
            state: state.clone(),
            notices,
        };
        let task = tokio::spawn(worker.run(transport, commands_rx, cancel.clone()));

        ChatHandle {
            commands: commands_tx,
            state,
            cancel,
            task,
        }
    }

    async fn run(
        self,
        transport: Arc<dyn ChatTransport>,
        mut commands: mpsc::UnboundedReceiver<ChatCommand>,
        cancel: CancellationToken,
    ) {
        // --- 1. Credential check ---
        let Some(token) = self.session.current_access_token() else {
            info!("No access token available; chat session will not connect.");
            return;
        };
        self.set_phase(SessionPhase::Connecting).await;

        // --- 2. Connect, resolving the room in parallel ---
        let (connected, resolved_room) = tokio::join!(transport.connect(&token), self.api.room());

        let mut conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                error!("Chat connection failed: {e}");
                self.surface(e.to_string()).await;
                self.set_phase(SessionPhase::Closed).await;
                return;
            }
        };

        // --- 3. Wait for the server to acknowledge the presented token ---
        match conn.recv().await {
            Some(Ok(ServerEvent::Authenticated)) => {
                debug!("Chat connection authenticated.");
                self.set_phase(SessionPhase::Authenticated).await;
            }
            Some(Ok(ServerEvent::Error { message })) => {
                // The credential was rejected at the handshake. This is the
                // one chat failure that cascades into a logout.
                warn!("Chat authentication rejected: {message}");
                self.surface(message).await;
                self.session.logout().await;
                self.set_phase(SessionPhase::Closed).await;
                return;
            }
            other => {
                error!("Connection ended before authentication: {other:?}");
                self.surface("Chat connection failed".to_string()).await;
                self.set_phase(SessionPhase::Closed).await;
                return;
            }
        }

        // --- 4. Request the room join ---
        match resolved_room {
            Ok(room) => {
                let room_id = room.id;
                self.state.lock().await.room = Some(room);
                if let Err(e) = conn.send(&ClientEvent::JoinRoom { room_id }).await {
                    error!("Failed to request room join: {e}");
                    self.surface(e.to_string()).await;
                }
            }
            Err(e) => {
                // The session stays authenticated but never joins; the
                // failure is shown inline.
                warn!("Room resolution failed: {e}");
                self.surface(e.to_string()).await;
            }
        }

        // --- 5. Main event loop ---
        let mut auth_state = self.session.subscribe();
        let mut unread_poll = tokio::time::interval(UNREAD_POLL_INTERVAL);
        unread_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut typing_deadline: Option<Instant> = None;

        loop {
            let step = {
                let typing_idle = typing_sleep(typing_deadline);
                tokio::select! {
                    _ = cancel.cancelled() => Step::Cancelled,
                    changed = auth_state.changed() => Step::AuthStateChanged(changed.is_ok()),
                    event = conn.recv() => Step::Event(event),
                    command = commands.recv() => Step::Command(command),
                    _ = unread_poll.tick() => Step::PollUnread,
                    _ = typing_idle => Step::TypingIdle,
                }
            };

            match step {
                Step::Cancelled => {
                    info!("Chat session cancelled.");
                    break;
                }
                Step::AuthStateChanged(alive) => {
                    if !alive || !*auth_state.borrow_and_update() {
                        info!("Authentication revoked; closing chat session.");
                        break;
                    }
                }
                Step::Event(Some(Ok(event))) => self.handle_server_event(event, &mut conn).await,
                Step::Event(Some(Err(e))) => {
                    error!("Chat transport error: {e}");
                    self.surface(e.to_string()).await;
                    break;
                }
                Step::Event(None) => {
                    info!("Chat connection closed by the server.");
                    break;
                }
                Step::Command(Some(command)) => {
                    self.handle_command(command, &mut conn, &mut typing_deadline)
                        .await
                }
                Step::Command(None) => {
                    debug!("Chat handle dropped; closing session.");
                    break;
                }
                Step::PollUnread => self.refresh_unread_count().await,
                Step::TypingIdle => {
                    typing_deadline = None;
                    self.stop_typing(&mut conn).await;
                }
            }
        }

        // The transport disconnects when `conn` drops; the typing timer and
        // unread poll live inside the loop and are gone with it.
        self.set_phase(SessionPhase::Closed).await;
    }

    //-------------------------------------------------------------------------------------
    // Server events
    //-------------------------------------------------------------------------------------

    async fn handle_server_event(&self, event: ServerEvent, conn: &mut Box<dyn ChatConnection>) {
        let phase = self.state.lock().await.phase;
        match event {
            ServerEvent::JoinedRoom => {
                if phase == SessionPhase::Authenticated {
                    info!("Joined room.");
                    self.set_phase(SessionPhase::RoomJoined).await;
                    self.enter_room(conn).await;
                } else {
                    debug!("Ignoring joined_room in phase {phase:?}.");
                }
            }
            ServerEvent::NewMessage { message } => {
                if phase != SessionPhase::Active {
                    // Pre-join events are dropped; the history load at join
                    // time re-reads the authoritative message list.
                    debug!("Dropping new_message received in phase {phase:?}.");
                    return;
                }
                let _ = self.notices.send(ChatNotice::MessageReceived(message.clone()));
                self.state.lock().await.messages.push(message);
                let _ = self.notices.send(ChatNotice::ScrollToLatest);
                // The unread count comes from the server, not local math.
                self.refresh_unread_count().await;
            }
            ServerEvent::UserTyping { user_id, is_typing } => {
                if phase != SessionPhase::Active {
                    debug!("Dropping user_typing received in phase {phase:?}.");
                } else if !self.is_self(user_id) {
                    self.state.lock().await.other_user_typing = is_typing;
                }
            }
            ServerEvent::UserOnline { user_id, is_online } => {
                if phase != SessionPhase::Active {
                    debug!("Dropping user_online received in phase {phase:?}.");
                } else if !self.is_self(user_id) {
                    self.state.lock().await.other_user_online = is_online;
                }
            }
            ServerEvent::MessagesRead => {
                if phase != SessionPhase::Active {
                    debug!("Dropping messages_read received in phase {phase:?}.");
                    return;
                }
                // Stamp only the current user's own messages, client-side
                // timestamp, and only once.
                let Some(user) = self.session.current_user() else {
                    return;
                };
                let now = Utc::now();
                let mut state = self.state.lock().await;
                for message in &mut state.messages {
                    if message.sender_id == user.id && message.read_at.is_none() {
                        message.read_at = Some(now);
                    }
                }
            }
            ServerEvent::Error { message } => {
                // Surfaced inline; the connection state is left alone.
                warn!("Chat server error: {message}");
                self.surface(message).await;
            }
            ServerEvent::Authenticated => {
                debug!("Ignoring duplicate authenticated event.");
            }
        }
    }

    /// Completes the join: history load, mark-read, and the switch to
    /// `Active`. A failed backfill is surfaced but does not block live
    /// traffic.
    async fn enter_room(&self, conn: &mut Box<dyn ChatConnection>) {
        let room_id = match self.state.lock().await.room.as_ref() {
            Some(room) => room.id,
            None => {
                // joined_room without a resolved room is a server bug.
                warn!("joined_room received without a resolved room.");
                return;
            }
        };

        match self.api.messages(room_id).await {
            Ok(history) => {
                self.state.lock().await.messages = history;
                let _ = self.notices.send(ChatNotice::ScrollToLatest);
                if let Err(e) = conn.send(&ClientEvent::MarkRead { room_id }).await {
                    warn!("Failed to mark room {room_id} as read: {e}");
                }
            }
            Err(e) => {
                warn!("Failed to load message history: {e}");
                self.surface(e.to_string()).await;
            }
        }
        self.set_phase(SessionPhase::Active).await;
    }

    //-------------------------------------------------------------------------------------
    // Commands
    //-------------------------------------------------------------------------------------

    async fn handle_command(
        &self,
        command: ChatCommand,
        conn: &mut Box<dyn ChatConnection>,
        typing_deadline: &mut Option<Instant>,
    ) {
        match command {
            ChatCommand::InputChanged(draft) => {
                let (joined, room_id, already_typing) = {
                    let mut state = self.state.lock().await;
                    state.input = draft;
                    (
                        matches!(state.phase, SessionPhase::RoomJoined | SessionPhase::Active),
                        state.room.as_ref().map(|r| r.id),
                        state.is_typing,
                    )
                };
                let Some(room_id) = room_id else { return };
                if !joined {
                    return;
                }
                if !already_typing {
                    self.state.lock().await.is_typing = true;
                    if let Err(e) = conn.send(&ClientEvent::TypingStart { room_id }).await {
                        warn!("Failed to send typing_start: {e}");
                    }
                }
                // Every edit re-arms the idle timer; only the first emits.
                *typing_deadline = Some(Instant::now() + TYPING_IDLE);
            }
            ChatCommand::Send => {
                let (joined, room_id, text) = {
                    let state = self.state.lock().await;
                    (
                        matches!(state.phase, SessionPhase::RoomJoined | SessionPhase::Active),
                        state.room.as_ref().map(|r| r.id),
                        state.input.trim().to_string(),
                    )
                };
                let Some(room_id) = room_id else { return };
                if !joined || text.is_empty() {
                    return;
                }
                if let Err(e) = conn
                    .send(&ClientEvent::SendMessage {
                        room_id,
                        message: text,
                    })
                    .await
                {
                    warn!("Failed to send message: {e}");
                    self.surface(e.to_string()).await;
                    return;
                }
                self.state.lock().await.input.clear();
                // Sending implicitly withdraws an in-flight typing
                // indicator; never a duplicate stop.
                *typing_deadline = None;
                self.stop_typing(conn).await;
            }
        }
    }

    /// Emits `typing_stop` if (and only if) a start is outstanding.
    async fn stop_typing(&self, conn: &mut Box<dyn ChatConnection>) {
        let room_id = {
            let mut state = self.state.lock().await;
            if !state.is_typing {
                return;
            }
            state.is_typing = false;
            match state.room.as_ref() {
                Some(room) => room.id,
                None => return,
            }
        };
        if let Err(e) = conn.send(&ClientEvent::TypingStop { room_id }).await {
            warn!("Failed to send typing_stop: {e}");
        }
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    async fn refresh_unread_count(&self) {
        match self.api.unread_count().await {
            Ok(count) => self.state.lock().await.unread_count = count,
            Err(e) => debug!("Failed to refresh unread count: {e}"),
        }
    }

    fn is_self(&self, user_id: i64) -> bool {
        self.session
            .current_user()
            .map(|user| user.id == user_id)
            .unwrap_or(false)
    }

    async fn surface(&self, message: String) {
        self.state.lock().await.error_message = Some(message.clone());
        let _ = self.notices.send(ChatNotice::Error(message));
    }

    async fn set_phase(&self, phase: SessionPhase) {
        let mut state = self.state.lock().await;
        debug!("Chat session phase: {:?} -> {:?}", state.phase, phase);
        state.phase = phase;
    }
}

/// Pends forever when no typing indicator is armed.
async fn typing_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

//=========================================================================================
// Tests
//=========================================================================================
