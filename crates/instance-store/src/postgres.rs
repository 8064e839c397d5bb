use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use common::SagaId;

use crate::{Result, SagaInstance, store::InstanceStore};

/// PostgreSQL-backed instance store.
///
/// Each instance is one row: typed columns for what operators filter on,
/// the full record as a JSONB document that `load` deserializes.
#[derive(Clone)]
pub struct PgInstanceStore {
    pool: PgPool,
}

impl PgInstanceStore {
    /// Creates a new PostgreSQL instance store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_instance(row: PgRow) -> Result<SagaInstance> {
        let state: serde_json::Value = row.try_get("state")?;
        Ok(serde_json::from_value(state)?)
    }
}

#[async_trait]
impl InstanceStore for PgInstanceStore {
    async fn load(&self, id: &SagaId) -> Result<Option<SagaInstance>> {
        let row: Option<PgRow> = sqlx::query("SELECT state FROM saga_instances WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_instance).transpose()
    }

    async fn save(&self, instance: &SagaInstance) -> Result<()> {
        let state = serde_json::to_value(instance)?;

        sqlx::query(
            r#"
            INSERT INTO saga_instances (id, saga_type, status, started_at, ended_at, state)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                ended_at = EXCLUDED.ended_at,
                state = EXCLUDED.state,
                updated_at = now()
            "#,
        )
        .bind(instance.id.as_str())
        .bind(instance.saga_type.as_str())
        .bind(instance.status.as_str())
        .bind(instance.started_at)
        .bind(instance.ended_at)
        .bind(&state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
