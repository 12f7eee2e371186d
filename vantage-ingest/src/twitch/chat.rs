//! Anonymous Twitch IRC chat feed
//!
//! Connects to `irc.chat.twitch.tv` with an anonymous (justinfan) nick,
//! requests the membership capability, and translates JOIN/PART/PRIVMSG
//! into normalized [`TwitchEvent`]s on the dispatcher channel. Reading
//! chat needs no OAuth, so the feed works before any token is configured.

use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vantage_common::events::{ChatterIdentity, TwitchEvent};
use vantage_common::Result;

const IRC_ADDR: &str = "irc.chat.twitch.tv:6667";
const RECONNECT_DELAY: Duration = Duration::from_secs(10);

pub struct ChatFeed {
    channel: String,
    nick: String,
    events: mpsc::Sender<TwitchEvent>,
}

impl ChatFeed {
    pub fn new(channel_login: &str, events: mpsc::Sender<TwitchEvent>) -> Self {
        Self {
            channel: channel_login.to_lowercase(),
            // Anonymous read-only nick; the suffix only needs to be unlikely
            // to collide with another connection from the same host
            nick: format!("justinfan{}", std::process::id()),
            events,
        }
    }

    /// Run the feed with automatic reconnect until the event channel closes
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.run_connection().await {
                    Ok(()) => {
                        info!("chat feed closed, reconnecting");
                    }
                    Err(e) => {
                        warn!(error = %e, "chat feed connection failed, reconnecting");
                    }
                }
                if self.events.is_closed() {
                    return;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    async fn run_connection(&self) -> Result<()> {
        let stream = TcpStream::connect(IRC_ADDR).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half
            .write_all(
                format!(
                    "CAP REQ :twitch.tv/membership\r\nNICK {}\r\nJOIN #{}\r\n",
                    self.nick, self.channel
                )
                .as_bytes(),
            )
            .await?;
        info!(channel = %self.channel, "chat feed connected");

        while let Some(line) = lines.next_line().await? {
            if let Some(payload) = line.strip_prefix("PING") {
                write_half
                    .write_all(format!("PONG{payload}\r\n").as_bytes())
                    .await?;
                continue;
            }

            let Some(event) = self.parse_line(&line) else {
                continue;
            };
            if self.events.send(event).await.is_err() {
                // Dispatcher is gone; shut the feed down
                return Ok(());
            }
        }

        Ok(())
    }

    /// Translate one IRC line into an event; `None` for anything that is
    /// not a JOIN/PART/PRIVMSG for our channel (or is our own nick).
    fn parse_line(&self, line: &str) -> Option<TwitchEvent> {
        let rest = line.strip_prefix(':')?;
        let (prefix, rest) = rest.split_once(' ')?;
        let login = prefix.split('!').next()?;
        if login == self.nick {
            return None;
        }

        let (command, params) = match rest.split_once(' ') {
            Some((c, p)) => (c, p),
            None => (rest, ""),
        };

        let user = ChatterIdentity::from_login(login);
        match command {
            "JOIN" => Some(TwitchEvent::ChatJoin { user }),
            "PART" => Some(TwitchEvent::ChatPart { user }),
            "PRIVMSG" => {
                let (_target, text) = params.split_once(" :")?;
                Some(TwitchEvent::ChatMessage {
                    user,
                    text: text.to_string(),
                    sent_at: Utc::now(),
                })
            }
            _ => {
                debug!(command, "ignoring irc command");
                None
            }
        }
    }
}
