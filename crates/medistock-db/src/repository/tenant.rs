//! # Tenant Repository
//!
//! Tenants and their stores. A store must be active and belong to the
//! caller's tenant before any sale is settled against it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use medistock_core::validation::validate_display_name;
use medistock_core::{CoreError, Role, Store, Tenant, TenantContext};

use crate::error::{DbError, InventoryResult};
use crate::repository::generate_id;

#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates a tenant (signup).
    pub async fn create_tenant(&self, name: &str) -> InventoryResult<Tenant> {
        validate_display_name("tenant name", name, 200)?;

        let tenant = Tenant {
            id: generate_id(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&tenant.id)
            .bind(&tenant.name)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await?;

        info!(tenant_id = %tenant.id, "Tenant created");
        Ok(tenant)
    }

    pub async fn get_tenant(&self, tenant_id: &str) -> InventoryResult<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, created_at FROM tenants WHERE id = ?1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Creates a store under an existing tenant.
    pub async fn create_store(&self, tenant_id: &str, name: &str) -> InventoryResult<Store> {
        validate_display_name("store name", name, 200)?;

        if self.get_tenant(tenant_id).await?.is_none() {
            return Err(DbError::not_found("Tenant", tenant_id).into());
        }

        let store = Store {
            id: generate_id(),
            tenant_id: tenant_id.to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stores (id, tenant_id, name, is_active, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
        )
        .bind(&store.id)
        .bind(&store.tenant_id)
        .bind(&store.name)
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;

        info!(tenant_id = %tenant_id, store_id = %store.id, "Store created");
        Ok(store)
    }

    /// Gets a store of the tenant, active or not.
    pub async fn get_store(&self, tenant_id: &str, store_id: &str) -> InventoryResult<Option<Store>> {
        debug!(tenant_id = %tenant_id, store_id = %store_id, "Fetching store");

        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, tenant_id, name, is_active, created_at
            FROM stores
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(store_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    pub async fn list_stores(&self, tenant_id: &str) -> InventoryResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, tenant_id, name, is_active, created_at
            FROM stores
            WHERE tenant_id = ?1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    /// The context's store, provided it is active and part of the tenant.
    pub async fn require_active_store(&self, ctx: &TenantContext) -> InventoryResult<Store> {
        match self.get_store(&ctx.tenant_id, &ctx.store_id).await? {
            Some(store) if store.is_active => Ok(store),
            _ => Err(CoreError::StoreNotFound(ctx.store_id.clone()).into()),
        }
    }

    /// Soft-deletes a store. Owner only.
    pub async fn deactivate_store(&self, ctx: &TenantContext, store_id: &str) -> InventoryResult<()> {
        if ctx.role != Role::Owner {
            return Err(CoreError::Forbidden {
                role: ctx.role.to_string(),
                action: "deactivate store".to_string(),
            }
            .into());
        }

        let result = sqlx::query(
            "UPDATE stores SET is_active = 0 WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1",
        )
        .bind(store_id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StoreNotFound(store_id.to_string()).into());
        }

        info!(store_id = %store_id, "Store deactivated");
        Ok(())
    }
}
