//! Session state owned by the caller and lent to the agent loop per task.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::context::ConversationContext;
use super::ledger::ResourceLedger;

/// Conversation and token ledger for one operator session.
///
/// Resetting a session means replacing it with `Session::new()`.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub context: ConversationContext,
    pub ledger: ResourceLedger,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            context: ConversationContext::new(),
            ledger: ResourceLedger::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
