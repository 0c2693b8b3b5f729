//! PostgreSQL adapter for the provenance graph.
//!
//! Rows live in two tables, `provenance_nodes` and `provenance_links`.
//! `delete_nodes_and_links` runs in a single transaction so a failure at any
//! statement leaves both tables untouched.

use crate::traits::GraphStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use provenance_types::{Link, LinkDirection, LinkKind, Node, NodeId, NodeKind};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed graph store.
#[derive(Clone)]
pub struct PostgresGraphStore {
    pool: PgPool,
}

impl PostgresGraphStore {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS provenance_nodes (
                id TEXT PRIMARY KEY,
                uuid UUID NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS provenance_links (
                link_id BIGSERIAL PRIMARY KEY,
                source TEXT NOT NULL REFERENCES provenance_nodes (id),
                target TEXT NOT NULL REFERENCES provenance_nodes (id),
                kind TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT ''
            )
            "#,
            "CREATE INDEX IF NOT EXISTS provenance_links_source_idx ON provenance_links (source)",
            "CREATE INDEX IF NOT EXISTS provenance_links_target_idx ON provenance_links (target)",
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn insert_node(&self, node: &Node) -> StoreResult<()> {
        sqlx::query("INSERT INTO provenance_nodes (id, uuid, kind, label) VALUES ($1, $2, $3, $4)")
            .bind(node.id.as_str())
            .bind(node.uuid)
            .bind(node_kind_str(node.kind))
            .bind(node.label.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    pub async fn insert_link(&self, link: &Link) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO provenance_links (source, target, kind, label) VALUES ($1, $2, $3, $4)",
        )
        .bind(link.source.as_str())
        .bind(link.target.as_str())
        .bind(link.kind.as_str())
        .bind(link.label.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for PostgresGraphStore {
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<Node>> {
        let row = sqlx::query("SELECT id, uuid, kind, label FROM provenance_nodes WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(node_row_to_node).transpose()
    }

    async fn get_links(
        &self,
        id: &NodeId,
        direction: LinkDirection,
        kind: Option<LinkKind>,
    ) -> StoreResult<Vec<Link>> {
        let sql = match direction {
            LinkDirection::Outgoing => {
                r#"
                SELECT source, target, kind, label FROM provenance_links
                 WHERE source = $1 AND ($2::TEXT IS NULL OR kind = $2)
                 ORDER BY link_id
                "#
            }
            LinkDirection::Incoming => {
                r#"
                SELECT source, target, kind, label FROM provenance_links
                 WHERE target = $1 AND ($2::TEXT IS NULL OR kind = $2)
                 ORDER BY link_id
                "#
            }
        };
        let rows = sqlx::query(sql)
            .bind(id.as_str())
            .bind(kind.map(|k| k.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(link_row_to_link).collect()
    }

    async fn list_nodes(&self, ids: &BTreeSet<NodeId>) -> StoreResult<Vec<Node>> {
        let ids: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let rows = sqlx::query(
            "SELECT id, uuid, kind, label FROM provenance_nodes WHERE id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(node_row_to_node).collect()
    }

    async fn delete_nodes_and_links(&self, ids: &BTreeSet<NodeId>) -> StoreResult<()> {
        let ids: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let links = sqlx::query(
            "DELETE FROM provenance_links WHERE source = ANY($1) OR target = ANY($1)",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let nodes = sqlx::query("DELETE FROM provenance_nodes WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        debug!(
            removed_nodes = nodes.rows_affected(),
            removed_links = links.rows_affected(),
            "Committed node deletion"
        );
        Ok(())
    }
}

fn node_row_to_node(row: PgRow) -> StoreResult<Node> {
    let id: String = row
        .try_get("id")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let uuid: Uuid = row
        .try_get("uuid")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let kind: String = row
        .try_get("kind")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let label: String = row
        .try_get("label")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Node {
        id: NodeId(id),
        uuid,
        kind: parse_node_kind(&kind)?,
        label,
    })
}

fn link_row_to_link(row: PgRow) -> StoreResult<Link> {
    let source: String = row
        .try_get("source")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let target: String = row
        .try_get("target")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let kind: String = row
        .try_get("kind")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let label: String = row
        .try_get("label")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Link {
        source: NodeId(source),
        target: NodeId(target),
        kind: parse_link_kind(&kind)?,
        label,
    })
}

fn node_kind_str(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Data => "data",
        NodeKind::Calculation => "calculation",
        NodeKind::Workflow => "workflow",
    }
}

fn parse_node_kind(raw: &str) -> StoreResult<NodeKind> {
    match raw {
        "data" => Ok(NodeKind::Data),
        "calculation" => Ok(NodeKind::Calculation),
        "workflow" => Ok(NodeKind::Workflow),
        _ => Err(StoreError::Serialization(format!("unknown node kind `{raw}`"))),
    }
}

fn parse_link_kind(raw: &str) -> StoreResult<LinkKind> {
    LinkKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == raw)
        .ok_or_else(|| StoreError::Serialization(format!("unknown link kind `{raw}`")))
}

fn map_sqlx_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::Conflict(db_err.message().to_string()),
            Some("23503") => return StoreError::NotFound(db_err.message().to_string()),
            _ => {}
        }
    }
    StoreError::Backend(err.to_string())
}
