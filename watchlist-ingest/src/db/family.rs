//! Relationship edges (read-only)

use crate::types::RelationshipStore;
use sqlx::SqlitePool;
use watchlist_common::{FamilyEdge, Result};

#[derive(Clone)]
pub struct SqliteRelationshipStore {
    pool: SqlitePool,
}

impl SqliteRelationshipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RelationshipStore for SqliteRelationshipStore {
    async fn edges(&self) -> Result<Vec<FamilyEdge>> {
        let edges = sqlx::query_as::<_, FamilyEdge>(
            "SELECT person_id, relative_id, relationship FROM watchlist_family ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(edges)
    }
}
