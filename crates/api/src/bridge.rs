use std::time::Duration;

use makerlink_shared::events::{EmitRequest, EmitResponse};

/// The single hop from the stateless request tier into the long-lived
/// broker. Delivery is best-effort: the caller's HTTP response never waits
/// on it, and any failure only costs peers instant delivery (the message is
/// already durable and shows up on their next fetch).
pub struct DeliveryBridge {
    client: reqwest::Client,
    emit_url: String,
}

impl DeliveryBridge {
    pub fn new(broker_url: &str, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to build bridge HTTP client");
        Self {
            client,
            emit_url: format!("{}/emit", broker_url.trim_end_matches('/')),
        }
    }

    /// Fire-and-forget emit. Spawned, time-boxed by the client timeout,
    /// never retried.
    pub fn emit(&self, chat_id: &str, event: &str, payload: serde_json::Value) {
        let client = self.client.clone();
        let url = self.emit_url.clone();
        let request = EmitRequest {
            chat_id: chat_id.to_string(),
            event: event.to_string(),
            payload,
        };

        tokio::spawn(async move {
            match client.post(&url).json(&request).send().await {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(body) = resp.json::<EmitResponse>().await {
                        tracing::debug!(
                            event = %request.event,
                            chat = %request.chat_id,
                            clients = body.client_count,
                            "relayed through broker"
                        );
                    }
                }
                Ok(resp) => {
                    tracing::warn!(
                        event = %request.event,
                        status = %resp.status(),
                        "broker rejected emit"
                    );
                }
                Err(e) => {
                    tracing::warn!(event = %request.event, "broker unreachable: {}", e);
                }
            }
        });
    }
}
