pub mod authorization;
pub mod jwks;
pub mod jwt;
pub mod middleware;

use serde::Serialize;
use uuid::Uuid;

use crate::models::users::{self, Roles};

/// The caller of a request as far as the payment core is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Roles,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Roles::Admin
    }
}

impl From<&users::Model> for Principal {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}
