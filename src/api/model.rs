use serde::{Deserialize, Serialize};

/// The `?server_id=` query parameter every DHCP route takes.
#[derive(Deserialize, Debug, Clone, Default, Ord, PartialOrd, Eq, PartialEq)]
pub(super) struct ServerQuery {
    pub server_id: String,
}

#[derive(Serialize, Debug, Clone, Default, Ord, PartialOrd, Eq, PartialEq)]
pub(super) struct MessageResult {
    pub message: String,
}

impl MessageResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
