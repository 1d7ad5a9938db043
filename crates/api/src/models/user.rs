use serde::{Deserialize, Serialize};

/// The resolved current user. Identity management itself lives outside this
/// service; handlers only ever see this extracted view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub role: String,
}
