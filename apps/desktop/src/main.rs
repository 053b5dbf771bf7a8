use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{transport::WsChannel, ClientConfig, ClientEvent, RoomClient};
use shared::domain::{RoomId, SessionPhase, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: String,
    #[arg(long)]
    room: String,
    #[arg(long)]
    user: String,
    /// SQLite database holding the cached access token.
    #[arg(long, default_value = "sqlite://chat-client.db")]
    state_db: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let channel = WsChannel::connect(&args.server_url).await?;
    let tokens = Arc::new(storage::Storage::new(&args.state_db).await?);
    let client = RoomClient::new(
        channel,
        tokens,
        RoomId::new(args.room),
        UserId::new(args.user),
        ClientConfig::default(),
    );

    let mut events = client.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ClientEvent::MessageAccepted(message) => {
                    println!("[{}] {}: {}", message.timestamp, message.sender, message.text);
                }
                ClientEvent::TypingStatusChanged(Some(status)) => println!("{status}"),
                ClientEvent::TypingStatusChanged(None) => {}
                ClientEvent::PhaseChanged(phase) => println!("session: {phase:?}"),
                ClientEvent::HistoryCleared => println!("(history cleared)"),
                ClientEvent::RedirectUnauthorized => {
                    println!("access to this room was denied");
                    break;
                }
                ClientEvent::Notice(notice) => println!("! {notice}"),
                ClientEvent::Error(err) => eprintln!("error: {err}"),
            }
        }
    });

    client.start().await?;
    if client.phase().await == SessionPhase::Unauthenticated {
        client.request_access().await?;
    }

    // Plain lines send a message; /clear and /quit do what they say.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/clear" => client.clear_history().await?,
            text => {
                if let Err(err) = client.send(text, None).await {
                    warn!(%err, "send failed");
                }
            }
        }
    }

    client.leave().await;
    Ok(())
}
