//! Persistent-connection client runtime for the MakerLink broker.
//!
//! Holds one WebSocket to the broker, re-registers identity and re-joins
//! tracked chat rooms on every reconnect, and hands incoming events to typed
//! subscriptions. Delivery is best-effort upstream, so consumers merge
//! events into a [`log::MessageLog`] keyed by message id rather than
//! trusting arrival order.

pub mod backoff;
pub mod log;

pub use makerlink_shared::events::{ChatMessage, ClientEvent, ReactionEntry, ServerEvent};

use backoff::Backoff;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use makerlink_shared::constants::{WS_RECONNECT_BASE_DELAY_MS, WS_RECONNECT_MAX_DELAY_MS};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsError = tokio_tungstenite::tungstenite::Error;

/// Identity replayed through `register` on every (re)connect.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug)]
enum Command {
    Join(String),
    Leave(String),
    Typing(String),
    StopTyping(String),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UserOnline,
    UserOffline,
    UserTyping,
    ReceiveMessage,
    MessageReaction,
    MessageRead,
    Error,
}

impl EventKind {
    fn of(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::UserOnline { .. } => EventKind::UserOnline,
            ServerEvent::UserOffline { .. } => EventKind::UserOffline,
            ServerEvent::UserTyping { .. } => EventKind::UserTyping,
            ServerEvent::ReceiveMessage { .. } => EventKind::ReceiveMessage,
            ServerEvent::MessageReaction { .. } => EventKind::MessageReaction,
            ServerEvent::MessageRead { .. } => EventKind::MessageRead,
            ServerEvent::Error { .. } => EventKind::Error,
        }
    }
}

type Handler = Box<dyn Fn(&ServerEvent) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    next_id: AtomicU64,
    map: RwLock<HashMap<EventKind, HashMap<u64, Handler>>>,
}

impl Handlers {
    fn subscribe(&self, kind: EventKind, handler: Handler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.map.write() {
            map.entry(kind).or_default().insert(id, handler);
        }
        id
    }

    fn unsubscribe(&self, kind: EventKind, id: u64) {
        if let Ok(mut map) = self.map.write() {
            if let Some(handlers) = map.get_mut(&kind) {
                handlers.remove(&id);
                if handlers.is_empty() {
                    map.remove(&kind);
                }
            }
        }
    }

    fn dispatch(&self, event: &ServerEvent) {
        if let Ok(map) = self.map.read() {
            if let Some(handlers) = map.get(&EventKind::of(event)) {
                for handler in handlers.values() {
                    handler(event);
                }
            }
        }
    }
}

/// Handle for one registered event handler. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the handler, so listeners never
/// accumulate behind the caller's back.
pub struct Subscription {
    kind: EventKind,
    id: u64,
    handlers: Arc<Handlers>,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.active {
            self.handlers.unsubscribe(self.kind, self.id);
            self.active = false;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    handlers: Arc<Handlers>,
    joined: Arc<Mutex<HashSet<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl ChatClient {
    /// Connect to the broker gateway (e.g. `ws://host:4001/gateway`) and
    /// keep the connection alive until [`ChatClient::close`].
    pub fn connect(url: impl Into<String>, identity: Identity) -> Self {
        let url = url.into();
        let handlers = Arc::new(Handlers::default());
        let joined = Arc::new(Mutex::new(HashSet::new()));
        let (commands, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_loop(
            url,
            identity,
            rx,
            handlers.clone(),
            joined.clone(),
        ));

        Self {
            commands,
            handlers,
            joined,
            task,
        }
    }

    /// Join a chat room. The room is tracked locally and re-joined after
    /// every reconnect until [`ChatClient::leave_chat`] is called.
    pub fn join_chat(&self, chat_id: &str) {
        if let Ok(mut joined) = self.joined.lock() {
            joined.insert(chat_id.to_string());
        }
        let _ = self.commands.send(Command::Join(chat_id.to_string()));
    }

    pub fn leave_chat(&self, chat_id: &str) {
        if let Ok(mut joined) = self.joined.lock() {
            joined.remove(chat_id);
        }
        let _ = self.commands.send(Command::Leave(chat_id.to_string()));
    }

    pub fn typing(&self, chat_id: &str) {
        let _ = self.commands.send(Command::Typing(chat_id.to_string()));
    }

    pub fn stop_typing(&self, chat_id: &str) {
        let _ = self.commands.send(Command::StopTyping(chat_id.to_string()));
    }

    /// Chats currently tracked for re-join on reconnect.
    pub fn joined_chats(&self) -> HashSet<String> {
        self.joined
            .lock()
            .map(|j| j.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ServerEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.handlers.subscribe(kind, Box::new(handler));
        Subscription {
            kind,
            id,
            handlers: self.handlers.clone(),
            active: true,
        }
    }

    pub fn on_message(
        &self,
        handler: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(EventKind::ReceiveMessage, move |event| {
            if let ServerEvent::ReceiveMessage { message } = event {
                handler(message);
            }
        })
    }

    /// Close the connection and stop the reconnect loop.
    pub async fn close(self) {
        let _ = self.commands.send(Command::Close);
        let _ = self.task.await;
    }
}

enum SessionEnd {
    Closed,
    Dropped,
}

async fn run_loop(
    url: String,
    identity: Identity,
    mut commands: mpsc::UnboundedReceiver<Command>,
    handlers: Arc<Handlers>,
    joined: Arc<Mutex<HashSet<String>>>,
) {
    let mut backoff = Backoff::new(
        Duration::from_millis(WS_RECONNECT_BASE_DELAY_MS),
        Duration::from_millis(WS_RECONNECT_MAX_DELAY_MS),
    );

    loop {
        match connect_async(&url).await {
            Ok((ws, _)) => {
                backoff.reset();
                tracing::debug!("gateway connected");
                match run_session(ws, &identity, &mut commands, &handlers, &joined).await {
                    SessionEnd::Closed => return,
                    SessionEnd::Dropped => {
                        tracing::debug!("gateway connection dropped, reconnecting");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("gateway connect failed: {}", e);
            }
        }

        if wait_close(&mut commands, backoff.next_delay()).await {
            return;
        }
    }
}

async fn run_session(
    ws: WsStream,
    identity: &Identity,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    handlers: &Handlers,
    joined: &Mutex<HashSet<String>>,
) -> SessionEnd {
    let (mut tx, mut rx) = ws.split();

    // Identity first, then explicit room re-join: presence and room
    // membership are both broker memory and gone after any disconnect.
    let register = ClientEvent::Register {
        user_id: identity.user_id.clone(),
        name: identity.name.clone(),
        role: identity.role.clone(),
    };
    if send_event(&mut tx, &register).await.is_err() {
        return SessionEnd::Dropped;
    }

    let rooms: Vec<String> = joined
        .lock()
        .map(|j| j.iter().cloned().collect())
        .unwrap_or_default();
    for chat_id in rooms {
        if send_event(&mut tx, &ClientEvent::JoinChat { chat_id }).await.is_err() {
            return SessionEnd::Dropped;
        }
    }

    loop {
        tokio::select! {
            incoming = rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(text.as_str()) {
                        Ok(event) => handlers.dispatch(&event),
                        Err(_) => tracing::debug!("ignoring unknown gateway frame"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("gateway read error: {}", e);
                    return SessionEnd::Dropped;
                }
            },
            cmd = commands.recv() => match cmd {
                Some(Command::Close) | None => {
                    let _ = tx.send(Message::Close(None)).await;
                    return SessionEnd::Closed;
                }
                Some(cmd) => {
                    if forward_command(&mut tx, identity, cmd).await.is_err() {
                        return SessionEnd::Dropped;
                    }
                }
            }
        }
    }
}

async fn forward_command(
    tx: &mut WsSink,
    identity: &Identity,
    cmd: Command,
) -> Result<(), WsError> {
    let event = match cmd {
        Command::Join(chat_id) => ClientEvent::JoinChat { chat_id },
        Command::Leave(chat_id) => ClientEvent::LeaveChat { chat_id },
        Command::Typing(chat_id) => ClientEvent::Typing {
            chat_id,
            user_id: identity.user_id.clone(),
            user_name: identity.name.clone(),
        },
        Command::StopTyping(chat_id) => ClientEvent::StopTyping {
            chat_id,
            user_id: identity.user_id.clone(),
            user_name: identity.name.clone(),
        },
        Command::Close => return Ok(()),
    };
    send_event(tx, &event).await
}

async fn send_event(tx: &mut WsSink, event: &ClientEvent) -> Result<(), WsError> {
    let json = serde_json::to_string(event).unwrap_or_default();
    tx.send(Message::Text(json.into())).await
}

/// Wait out the reconnect delay, returning true if the client was closed
/// in the meantime. Join/leave commands arriving here are dropped: the
/// tracked joined set is replayed in full at the next session start.
async fn wait_close(commands: &mut mpsc::UnboundedReceiver<Command>, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            cmd = commands.recv() => match cmd {
                Some(Command::Close) | None => return true,
                Some(_) => {}
            }
        }
    }
}
