use serde::{Deserialize, Serialize};

/// Per-call metadata handed to a tool by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    pub requester: String,
    pub request_id: String,
}

impl InvocationContext {
    pub fn new(requester: String) -> Self {
        Self {
            requester,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
