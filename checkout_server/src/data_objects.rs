use std::fmt::Display;

use checkout_engine::order_objects::ReconcileOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of the admin status update call. The status is validated against the known status names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// What the webhook endpoint tells the gateway. Any 2xx stops the gateway from redelivering.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: ReconcileOutcome,
}
