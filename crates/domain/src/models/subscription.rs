//! Subscription session balance as seen by the booking engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session allowance of a member's active subscription.
///
/// Owned by the billing side; the booking engine only reads it and adjusts
/// `sessions_used`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubscriptionBalance {
    pub subscription_id: Uuid,
    pub member_id: Uuid,
    /// `None` means unlimited sessions.
    pub sessions_total: Option<i32>,
    pub sessions_used: i32,
}

impl SubscriptionBalance {
    /// Returns true if one more session can be consumed.
    pub fn has_available_session(&self) -> bool {
        match self.sessions_total {
            None => true,
            Some(total) => self.sessions_used < total,
        }
    }

    /// Sessions left, `None` when unlimited.
    pub fn sessions_remaining(&self) -> Option<i32> {
        self.sessions_total
            .map(|total| (total - self.sessions_used).max(0))
    }
}
