use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;

use pairchat::channels::{ChannelManager, CliChannel, TelegramChannel};
use pairchat::config::BotConfig;
use pairchat::engine::Engine;
use pairchat::ops::ops_routes;
use pairchat::types::OutgoingMessage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging comes up before config parsing so config warnings land.
    let log_dir = std::env::var("PAIRCHAT_LOG_DIR").ok().map(PathBuf::from);
    let _guard = init_tracing(log_dir.as_deref());

    let config = BotConfig::from_env();

    eprintln!("💬 pairchat v{}", env!("CARGO_PKG_VERSION"));

    let engine = Arc::new(Engine::new(config.onboarding_policy));

    // ── Ops listener ─────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = ops_routes(Arc::clone(&engine));
        eprintln!("   Ops: http://0.0.0.0:{port}/healthz");
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
                .await
                .expect("Failed to bind ops port");
            tracing::info!(port, "Ops server started");
            axum::serve(listener, app).await.ok();
        });
    }

    // ── Channels ─────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    let mut active_channels = vec!["cli"];

    // Always add CLI
    channels.add(Arc::new(CliChannel::new()));

    // Conditionally add Telegram if the bot token is set
    if let Some(token) = config.telegram_token.clone() {
        channels.add(Arc::new(TelegramChannel::new(token)));
        active_channels.push("telegram");
    }

    eprintln!("   Channels: {}\n", active_channels.join(", "));

    // ── Event loop ───────────────────────────────────────────────────
    let mut events = channels.start_all().await;

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }

            maybe_event = events.next() => {
                let Some(event) = maybe_event else {
                    tracing::info!("All channels closed");
                    break;
                };

                channels.note_route(&event).await;
                let replies = engine.handle_event(&event).await;

                for message in replies {
                    if let Err(e) = channels.deliver(&message).await {
                        tracing::warn!(recipient = %message.recipient, error = %e, "delivery failed");

                        // A relayed message that bounced gets a
                        // best-effort heads-up to the sender.
                        if message.recipient != event.user_id {
                            let notice = OutgoingMessage::text(
                                event.user_id,
                                "⚠️ Your message couldn't be delivered.",
                            );
                            if let Err(e) = channels.deliver(&notice).await {
                                tracing::debug!(error = %e, "bounce notice failed too");
                            }
                        }
                    }
                }
            }
        }
    }

    channels.shutdown_all().await;
    Ok(())
}

/// Set up tracing: stderr by default, a daily-rotating file when a log
/// directory is configured. The returned guard must stay alive for the
/// file writer to flush.
fn init_tracing(
    log_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pairchat.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
            None
        }
    }
}
