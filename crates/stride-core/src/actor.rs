//! The acting user of an operation.

use sqlx::PgPool;
use uuid::Uuid;

use stride_db::models::Role;
use stride_db::queries::users;

use crate::error::{EngineError, EngineResult};

/// Identity and role of whoever invoked an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Look up a user and treat them as the actor.
    pub async fn load(pool: &PgPool, id: Uuid) -> EngineResult<Self> {
        let user = users::get_user(pool, id)
            .await?
            .ok_or_else(|| EngineError::not_found("user", id))?;
        Ok(Self::new(user.id, user.role))
    }

    pub fn is_coach(&self) -> bool {
        self.role == Role::Coach
    }

    /// Fail with `Forbidden` unless the actor is a coach.
    pub fn require_coach(&self, action: &'static str) -> EngineResult<()> {
        if self.is_coach() {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                actor: self.id,
                action,
            })
        }
    }
}
