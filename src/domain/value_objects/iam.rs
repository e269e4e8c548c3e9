use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verified caller identity, passed explicitly into every operation.
/// `is_admin` is the capability flag the use cases check before serving
/// admin-only reads or writes on behalf of other users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// True when the actor may act on `owner_id`'s resources.
    pub fn can_act_for(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}
