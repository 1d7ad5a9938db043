use super::{ClientId, GatewayState};
use makerlink_shared::events::ServerEvent;

impl GatewayState {
    pub async fn broadcast_chat(
        &self,
        chat_id: &str,
        event: &ServerEvent,
        exclude: Option<ClientId>,
    ) -> usize {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return 0,
        };
        self.broadcast_chat_raw(chat_id, &msg, exclude).await
    }

    /// Fan a pre-serialized frame out to a room. Used by the /emit relay so
    /// bridge payloads pass through untouched. Returns the receiver count.
    pub async fn broadcast_chat_raw(
        &self,
        chat_id: &str,
        msg: &str,
        exclude: Option<ClientId>,
    ) -> usize {
        let subs = self.chat_subs.read().await;
        let clients = self.clients.read().await;

        let mut delivered = 0;
        if let Some(subscriber_ids) = subs.get(chat_id) {
            for &cid in subscriber_ids {
                if Some(cid) == exclude {
                    continue;
                }
                if let Some(client) = clients.get(&cid) {
                    let _ = client.tx.send(msg.to_string());
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub async fn broadcast_all(&self, event: &ServerEvent, exclude: Option<ClientId>) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let clients = self.clients.read().await;
        for (&cid, client) in clients.iter() {
            if Some(cid) == exclude {
                continue;
            }
            let _ = client.tx.send(msg.clone());
        }
    }

    pub async fn send_to(&self, client_id: ClientId, event: &ServerEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let clients = self.clients.read().await;
        if let Some(client) = clients.get(&client_id) {
            let _ = client.tx.send(msg);
        }
    }
}
