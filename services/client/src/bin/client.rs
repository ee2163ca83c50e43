//! services/client/src/bin/client.rs

use std::sync::Arc;

use client_lib::{
    adapters::{FileCredentialStore, HttpAuthApi, HttpChatApi, WsTransport},
    auth::SessionManager,
    chat::{ChatNotice, ChatSession},
    config::Config,
    error::ClientError,
    pipeline::RequestPipeline,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting client...");

    // --- 2. Open the Credential Store & Restore the Session ---
    let store = Arc::new(FileCredentialStore::open(&config.state_dir)?);
    let auth_api = Arc::new(HttpAuthApi::new(config.api_base_url.clone()));
    let session = Arc::new(SessionManager::new(auth_api, store));

    if session.is_authenticated() {
        info!("Restored a persisted session.");
    } else {
        let (Some(email), Some(password)) = (&config.email, &config.password) else {
            return Err(ClientError::Internal(
                "No persisted session. Set TELEHEALTH_EMAIL and TELEHEALTH_PASSWORD to log in."
                    .to_string(),
            ));
        };
        session.login(email, password).await?;
        info!("Logged in as {email}.");
    }

    // --- 3. Initialize the Chat Adapters ---
    let pipeline = Arc::new(RequestPipeline::new(
        session.clone(),
        config.api_base_url.clone(),
    ));
    let chat_api = Arc::new(HttpChatApi::new(pipeline));
    let transport = Arc::new(WsTransport::new(config.socket_url.clone()));

    // --- 4. Spawn the Chat Session ---
    let (notices_tx, mut notices_rx) = mpsc::unbounded_channel();
    let handle = ChatSession::spawn(session, chat_api, transport, notices_tx);

    // --- 5. Bridge the Terminal to the Session ---
    println!("Connected. Type a message and press enter to send; Ctrl-C to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            notice = notices_rx.recv() => match notice {
                Some(ChatNotice::MessageReceived(message)) => {
                    println!("{} {}: {}", message.first_name, message.last_name, message.text);
                }
                Some(ChatNotice::Error(message)) => {
                    eprintln!("error: {message}");
                }
                Some(ChatNotice::ScrollToLatest) => {}
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    handle.input_changed(line);
                    handle.send_message();
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // --- 6. Tear Down ---
    info!("Shutting down.");
    handle.close();
    handle.join().await;
    Ok(())
}
