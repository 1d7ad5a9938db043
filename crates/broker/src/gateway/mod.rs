mod broadcast;

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};

pub type ClientId = u64;

/// A registered connection. A user may hold several of these at once (two
/// tabs are two clients); presence is counted, never assumed unique.
pub struct ConnectedClient {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub tx: mpsc::UnboundedSender<String>,
    pub joined_chats: HashSet<String>,
}

/// Process-local room and presence tables. Exclusively owned by the broker;
/// nothing here survives a restart, and nothing here is the source of truth
/// for chat state.
pub struct GatewayState {
    next_id: RwLock<u64>,
    pub clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    pub chat_subs: RwLock<HashMap<String, HashSet<ClientId>>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
            chat_subs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: String,
        name: String,
        role: String,
        tx: mpsc::UnboundedSender<String>,
    ) {
        let mut clients = self.clients.write().await;
        match clients.get_mut(&client_id) {
            // Re-register refreshes identity only; joined_chats must stay
            // mirrored in chat_subs or disconnect cleanup leaves stale ids.
            Some(client) => {
                client.user_id = user_id;
                client.name = name;
                client.role = role;
                client.tx = tx;
            }
            None => {
                clients.insert(
                    client_id,
                    ConnectedClient {
                        user_id,
                        name,
                        role,
                        tx,
                        joined_chats: HashSet::new(),
                    },
                );
            }
        }
    }

    /// Remove a connection. Returns the client and whether it was the last
    /// connection for that user (drives the user-offline broadcast).
    pub async fn unregister(&self, client_id: ClientId) -> Option<(ConnectedClient, bool)> {
        let client = self.clients.write().await.remove(&client_id)?;

        let mut subs = self.chat_subs.write().await;
        for chat_id in &client.joined_chats {
            if let Some(set) = subs.get_mut(chat_id) {
                set.remove(&client_id);
                if set.is_empty() {
                    subs.remove(chat_id);
                }
            }
        }
        drop(subs);

        let was_last = self.connection_count(&client.user_id).await == 0;
        Some((client, was_last))
    }

    pub async fn join_chat(&self, client_id: ClientId, chat_id: &str) {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.get_mut(&client_id) else {
            // join before register; nothing to bind the room to
            return;
        };
        client.joined_chats.insert(chat_id.to_string());
        drop(clients);

        self.chat_subs
            .write()
            .await
            .entry(chat_id.to_string())
            .or_default()
            .insert(client_id);
    }

    pub async fn leave_chat(&self, client_id: ClientId, chat_id: &str) {
        let mut subs = self.chat_subs.write().await;
        if let Some(set) = subs.get_mut(chat_id) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(chat_id);
            }
        }
        drop(subs);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.joined_chats.remove(chat_id);
        }
    }

    pub async fn connection_count(&self, user_id: &str) -> usize {
        let clients = self.clients.read().await;
        clients.values().filter(|c| c.user_id == user_id).count()
    }

    pub async fn chat_client_count(&self, chat_id: &str) -> usize {
        let subs = self.chat_subs.read().await;
        subs.get(chat_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Currently online users, one entry per user id.
    pub async fn online_users(&self) -> Vec<(String, String)> {
        let clients = self.clients.read().await;
        let mut seen = HashSet::new();
        let mut users = Vec::new();
        for client in clients.values() {
            if seen.insert(client.user_id.clone()) {
                users.push((client.user_id.clone(), client.name.clone()));
            }
        }
        users
    }
}
