use serde::{Deserialize, Serialize};

use super::idea::{Idea, UserId};

/// The authenticated principal behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub is_admin: bool,
}

impl Viewer {
    pub fn user(id: UserId) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: UserId) -> Self {
        Self { id, is_admin: true }
    }

    /// Authors and staff may edit or delete an idea.
    pub fn can_manage(&self, idea: &Idea) -> bool {
        self.is_admin || idea.user_id == self.id
    }
}
