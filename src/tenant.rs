// src/tenant.rs
use std::collections::HashMap;

use crate::error::TenantError;

/// Maps a dashboard user onto the tenant (owner id) whose calls they may see.
#[async_trait::async_trait]
pub trait TenantResolver: Send + Sync {
    async fn owner_id_for_user(&self, user_id: &str) -> Result<String, TenantError>;
}

/// Fixed user -> owner table, usually from `[tenants]` in the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantResolver {
    owners: HashMap<String, String>,
}

impl StaticTenantResolver {
    pub fn new(owners: HashMap<String, String>) -> Self {
        Self { owners }
    }
}

#[async_trait::async_trait]
impl TenantResolver for StaticTenantResolver {
    async fn owner_id_for_user(&self, user_id: &str) -> Result<String, TenantError> {
        self.owners
            .get(user_id)
            .filter(|o| !o.trim().is_empty())
            .cloned()
            .ok_or_else(|| TenantError::Unknown(user_id.to_string()))
    }
}
