//! `Chirp` — optimistic chat delivery engine demo.
//!
//! Runs a scripted session against the in-process engine: optimistic
//! sends, a simulated transport failure with retry, typing indicators,
//! and toast notifications with undo. Configuration via CLI flags,
//! environment variables, or config file
//! (`~/.config/chirp/config.toml`).
//!
//! ```bash
//! cargo run --bin chirp
//! cargo run --bin chirp -- --transport-latency-ms 50 --log-level chirp=debug
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use chirp::chat::{ChatEvent, ChatService};
use chirp::config::{CliArgs, EngineConfig};
use chirp::identity::{IdentityProvider, LocalIdentity};
use chirp::notify::{EnqueueOptions, NotificationQueue};
use chirp::timer::TimerRegistry;
use chirp::transport::mock::MockTransport;
use chirp_core::message::{ConversationId, MessageStatus, SenderId, Timestamp};
use chirp_core::notification::NotificationKind;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match EngineConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            EngineConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("chirp demo starting");

    let registry = TimerRegistry::new();
    let transport = Arc::new(MockTransport::new(config.transport.latency));
    let identity = LocalIdentity::new("u1", "Alice");
    let service = ChatService::new(
        Arc::clone(&transport),
        identity.clone(),
        Arc::clone(&registry),
        config.chat.clone(),
    );
    let notifications = NotificationQueue::new(Arc::clone(&registry), config.notify.tick_interval);

    run_session(&service, &transport, &notifications, &identity, &config).await;

    registry.cancel_all();
    tracing::info!("chirp demo exiting");
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, which carries the demo
/// transcript). Returns a [`WorkerGuard`] that must be held until shutdown
/// to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("chirp.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// The scripted demo session.
async fn run_session(
    service: &Arc<ChatService<MockTransport, LocalIdentity>>,
    transport: &Arc<MockTransport>,
    notifications: &NotificationQueue,
    identity: &LocalIdentity,
    config: &EngineConfig,
) {
    let conversation = ConversationId::new("general");
    let (_sub, mut events) = service.subscribe(&conversation);
    let settle = config.transport.latency + Duration::from_millis(100);

    println!("-- chirp demo: {} in #{conversation}", identity.display_name());

    // Optimistic send: the message is visible as pending immediately.
    if let Ok(msg) = service.send(&conversation, "Hello, <b>world</b>!") {
        println!("sent    #{} {:?} (pending)", msg.sequence, msg.body);
    }
    service.on_typing_start(&conversation);
    println!("typing  {}", service.is_typing(&conversation));

    tokio::time::sleep(settle).await;

    // A send that fails in transport, surfaced as Failed, then retried.
    transport.fail_next(1);
    let failed = service.send(&conversation, "This one bounces");
    tokio::time::sleep(settle).await;

    if let Ok(failed) = failed
        && service.message_status(&conversation, &failed.id) == Some(MessageStatus::Failed)
    {
        notifications.enqueue(
            NotificationKind::Error,
            "Message could not be delivered",
            EnqueueOptions::default(),
        );
        if let Some(retried) = service.retry(&conversation, &failed.id) {
            println!("retry   #{} {:?} (new attempt)", retried.sequence, retried.body);
        }
        tokio::time::sleep(settle).await;
    }

    // Someone else answers.
    let _ = service.receive_inbound(&conversation, SenderId::new("u2"), "Hi Alice!");

    // A success toast with an undo hook.
    let undo_id = notifications.enqueue(
        NotificationKind::Success,
        "Draft saved",
        EnqueueOptions::with_undo(Box::new(|| {
            println!("undo    draft restored");
        })),
    );
    notifications.undo(&undo_id);

    // Drain what the subscriber saw.
    while let Ok(event) = events.try_recv() {
        match event {
            ChatEvent::MessageAdded { message } => {
                println!(
                    "event   added #{} [{}] {} — {:?}",
                    message.sequence,
                    format_time(message.created_at),
                    message.sender_id,
                    message.body
                );
            }
            ChatEvent::StatusChanged { message_id, status } => {
                println!("event   status {message_id} -> {status}");
            }
            ChatEvent::TypingChanged { is_typing } => {
                println!("event   typing={is_typing}");
            }
        }
    }

    // Final transcript.
    println!("-- transcript --");
    for message in service.get_messages(&conversation) {
        println!(
            "#{} [{}] {}: {} ({})",
            message.sequence,
            format_time(message.created_at),
            message.sender_id,
            message.body,
            message.status
        );
    }
    println!("-- active toasts: {} --", notifications.list().len());
}

/// Formats a timestamp as local wall-clock time.
fn format_time(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(i64::try_from(ts.as_millis()).unwrap_or_default())
        .map_or_else(|| ts.to_string(), |dt| dt.format("%H:%M:%S").to_string())
}
