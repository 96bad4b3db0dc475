//! Async client runtime.
//!
//! Connects a [`Player`] to a Cotune server over WebSocket and drives it
//! from three sources: server frames, a fixed engine tick, and user
//! commands. Leaving the loop, for any reason, leaves any listen-along
//! session first.

use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use cotune_core::config::SyncConfig;
use cotune_core::error::ErrorKind;
use cotune_core::message::{ClientMessage, ServerMessage, serializer};
use cotune_core::types::{Identity, Track};
use cotune_core::{AppError, AppResult};

use crate::engine::PlaybackEngine;
use crate::player::{Notice, Player, Reaction};

/// Everything but the RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Client connection settings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server base URL, e.g. `ws://127.0.0.1:8080`.
    pub server_url: String,
    pub identity: Identity,
    pub sync: SyncConfig,
    /// How often the engine is advanced.
    pub tick_interval: Duration,
}

impl ClientOptions {
    pub fn new(server_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            server_url: server_url.into(),
            identity,
            sync: SyncConfig::default(),
            tick_interval: Duration::from_millis(250),
        }
    }

    /// Upgrade URL carrying the handshake identity.
    pub fn handshake_url(&self) -> String {
        format!(
            "{}/ws?user_id={}",
            self.server_url.trim_end_matches('/'),
            utf8_percent_encode(self.identity.as_str(), QUERY_VALUE)
        )
    }
}

/// User intents fed into the runtime.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    PlayAlbum { songs: Vec<Track>, start_index: usize },
    SetCurrentSong(Track),
    TogglePlay,
    Next,
    Previous,
    ListenAlong(Identity),
    StopListening,
    SendMessage { to: Identity, content: String },
    Quit,
}

/// A player bound to a server connection.
pub struct CotuneClient<E: PlaybackEngine> {
    options: ClientOptions,
    player: Player<E>,
    notices: mpsc::Sender<Notice>,
}

impl<E: PlaybackEngine> CotuneClient<E> {
    pub fn new(options: ClientOptions, engine: E, notices: mpsc::Sender<Notice>) -> Self {
        let player = Player::new(options.identity.clone(), engine, &options.sync);
        Self {
            options,
            player,
            notices,
        }
    }

    pub fn player(&self) -> &Player<E> {
        &self.player
    }

    /// Connects and runs until the server closes, the command channel
    /// closes, or [`ClientCommand::Quit`] arrives.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ClientCommand>) -> AppResult<()> {
        let url = self.options.handshake_url();
        let (socket, _) = connect_async(url.as_str()).await.map_err(|e| {
            AppError::with_source(ErrorKind::Transport, format!("Failed to connect to {url}"), e)
        })?;
        let (mut sink, mut stream) = socket.split();
        info!(user_id = %self.options.identity, url = %url, "Connected to Cotune server");

        send_frame(&mut sink, &self.player.announce()).await?;

        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            let reaction = tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serializer::deserialize_outbound(text.as_str()) {
                            Ok(message) => {
                                log_presence(&message);
                                self.player.handle_server(message)
                            }
                            Err(e) => {
                                warn!(error = %e, "Unreadable server frame");
                                continue;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break Ok(());
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        break Err(AppError::with_source(
                            ErrorKind::Transport,
                            "WebSocket receive failed",
                            e,
                        ));
                    }
                },
                _ = ticker.tick() => self.player.tick(),
                command = commands.recv() => match command {
                    Some(ClientCommand::Quit) | None => break Ok(()),
                    Some(command) => match self.apply(command) {
                        Ok(reaction) => reaction,
                        Err(e) => {
                            warn!(error = %e, "Command rejected");
                            continue;
                        }
                    },
                },
            };

            if let Err(e) = self.deliver(&mut sink, reaction).await {
                break Err(e);
            }
        };

        let farewell = self.player.stop_listening_along();
        if let Err(e) = self.deliver(&mut sink, farewell).await {
            debug!(error = %e, "Could not leave listen-along before closing");
        }
        let _ = sink.close().await;
        info!(user_id = %self.options.identity, "Disconnected from Cotune server");

        result
    }

    fn apply(&mut self, command: ClientCommand) -> AppResult<Reaction> {
        let reaction = match command {
            ClientCommand::PlayAlbum { songs, start_index } => {
                self.player.play_album(songs, start_index)
            }
            ClientCommand::SetCurrentSong(song) => self.player.set_current_song(song),
            ClientCommand::TogglePlay => self.player.toggle_play(),
            ClientCommand::Next => self.player.play_next(),
            ClientCommand::Previous => self.player.play_previous(),
            ClientCommand::ListenAlong(host) => self.player.start_listening_along(host)?,
            ClientCommand::StopListening => self.player.stop_listening_along(),
            ClientCommand::SendMessage { to, content } => Reaction {
                outbound: vec![ClientMessage::SendMessage {
                    receiver_id: to,
                    content,
                }],
                notices: Vec::new(),
            },
            ClientCommand::Quit => Reaction::default(),
        };
        Ok(reaction)
    }

    async fn deliver(&self, sink: &mut WsSink, reaction: Reaction) -> AppResult<()> {
        for message in &reaction.outbound {
            send_frame(sink, message).await?;
        }
        for notice in reaction.notices {
            // A dropped notice receiver only means nobody is watching.
            let _ = self.notices.send(notice).await;
        }
        Ok(())
    }
}

async fn send_frame(sink: &mut WsSink, message: &ClientMessage) -> AppResult<()> {
    let text = serializer::serialize_inbound(message)?;
    sink.send(Message::Text(text.into())).await.map_err(|e| {
        AppError::with_source(ErrorKind::Transport, "WebSocket send failed", e)
    })
}

fn log_presence(message: &ServerMessage) {
    match message {
        ServerMessage::UsersOnline { users } => info!(count = users.len(), "Online users"),
        ServerMessage::UserConnected { user_id } => info!(user_id = %user_id, "User online"),
        ServerMessage::UserDisconnected { user_id } => info!(user_id = %user_id, "User offline"),
        ServerMessage::ActivityUpdated { user_id, activity } => {
            debug!(user_id = %user_id, activity = %activity, "Activity")
        }
        _ => {}
    }
}
