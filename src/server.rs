//! WebSocket server pushing KWin state and accepting window commands
//!
//! Every connection gets its own [`Session`]: a push loop polls the state
//! on a fixed interval and sends it when it changed, while a receive loop
//! runs client commands one at a time. Both loops share the outgoing half
//! of the socket; the session ends when either loop does.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::commands::{Dispatcher, ServerMessage, parse_command_message};

/// Accept connections forever
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>, interval: Duration) -> anyhow::Result<()> {
    tracing::info!("WebSocket server listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            tracing::info!("Client connected: {}", peer);
            if let Err(e) = run_connection(stream, dispatcher, interval).await {
                tracing::debug!("Session with {} ended: {}", peer, e);
            }
            tracing::info!("Client disconnected: {}", peer);
        });
    }
}

async fn run_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>, interval: Duration) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (sink, stream) = ws.split();
    Session::new(dispatcher, sink).run(stream, interval).await
}

/// One connected client
pub struct Session<S> {
    dispatcher: Arc<Dispatcher>,
    sink: Mutex<S>,
}

impl<S> Session<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(dispatcher: Arc<Dispatcher>, sink: S) -> Self {
        Self {
            dispatcher,
            sink: Mutex::new(sink),
        }
    }

    /// Run both loops until one of them ends
    pub async fn run<R>(&self, stream: R, interval: Duration) -> anyhow::Result<()>
    where
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        tokio::select! {
            result = self.push_loop(interval) => result,
            result = self.receive_loop(stream) => result,
        }
    }

    async fn send(&self, text: String) -> anyhow::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text))
            .await
            .map_err(|e| anyhow::anyhow!("send failed: {}", e))
    }

    /// Send state whenever it differs from what this session last sent
    ///
    /// Returns only when a send fails.
    pub async fn push_loop(&self, interval: Duration) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_sent = None;

        loop {
            ticker.tick().await;
            self.poll(&mut last_sent).await?;
        }
    }

    /// One push-loop iteration; `Ok(true)` when a state frame went out
    ///
    /// Acquisition failures are logged and leave `last_sent` untouched so
    /// the next poll tries again.
    pub async fn poll(&self, last_sent: &mut Option<String>) -> anyhow::Result<bool> {
        let snapshot = match self.dispatcher.provider().acquire().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("State acquisition failed: {}", e);
                return Ok(false);
            }
        };

        let key = snapshot.change_key()?;
        if last_sent.as_deref() == Some(key.as_str()) {
            return Ok(false);
        }

        self.send(ServerMessage::State(&snapshot).to_json()?).await?;
        tracing::debug!("State pushed ({} monitors)", snapshot.monitors.len());
        *last_sent = Some(key);
        Ok(true)
    }

    /// Send the current state unconditionally
    pub async fn push_state(&self) -> anyhow::Result<()> {
        match self.dispatcher.provider().acquire().await {
            Ok(snapshot) => self.send(ServerMessage::State(&snapshot).to_json()?).await,
            Err(e) => {
                tracing::warn!("State acquisition failed: {}", e);
                Ok(())
            }
        }
    }

    /// Read frames until the peer goes away, running commands in order
    pub async fn receive_loop<R>(&self, mut stream: R) -> anyhow::Result<()>
    where
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        while let Some(frame) = stream.next().await {
            match frame? {
                Message::Text(text) => self.handle_text(text.as_str()).await?,
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Handle one inbound text frame
    ///
    /// Only failures to write to the peer are returned.
    pub async fn handle_text(&self, text: &str) -> anyhow::Result<()> {
        tracing::debug!("ws recv: {}", text);
        let Some(request) = parse_command_message(text) else {
            return Ok(());
        };

        let reply = match self.dispatcher.handle(&request).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!("Command {:?} failed: {}", request.name, e);
                return Ok(());
            }
        };

        self.send(ServerMessage::Ack(&reply.ack).to_json()?).await?;
        tracing::debug!("ack sent: {}", reply.ack.command);
        if reply.push_state {
            self.push_state().await?;
        }
        Ok(())
    }
}
