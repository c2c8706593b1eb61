use serde::{Deserialize, Serialize};

/// Browser push subscription. The endpoint URL is its whole identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
}
