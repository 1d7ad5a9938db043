use serde::{Deserialize, Serialize};

/// A conversation between a requester and exactly one maker (designer or
/// fabricator). The participant set never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub requester_id: Option<String>,
    pub designer_id: Option<String>,
    pub fabricator_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Chat {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.slots().any(|id| id == user_id)
    }

    /// The participant that is not `user_id`, if any.
    pub fn other_participant(&self, user_id: &str) -> Option<String> {
        self.slots().find(|id| *id != user_id).map(str::to_string)
    }

    fn slots(&self) -> impl Iterator<Item = &str> {
        [
            self.requester_id.as_deref(),
            self.designer_id.as_deref(),
            self.fabricator_id.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}
