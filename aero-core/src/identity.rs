use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated caller, as resolved by the auth layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_superuser: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_superuser: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_superuser: true,
        }
    }

    /// Owners and privileged actors may act on a resource owned by `owner_id`.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_superuser || self.user_id == owner_id
    }
}
