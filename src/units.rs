//! Units (barangays): the tenancy partitions.

use anyhow::{Context as _, Result as AnyResult};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::{
    config::UnitSeed,
    db::Db,
    error::Error,
    models::Unit,
    validation::Validator,
    Result,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    pub name: String,
    pub municipality: String,
    pub province: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewUnit {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.min_len("name", self.name.trim(), 2, "Barangay name must be at least 2 characters");
        v.min_len(
            "municipality",
            self.municipality.trim(),
            2,
            "Municipality must be at least 2 characters",
        );
        v.min_len("province", self.province.trim(), 2, "Province must be at least 2 characters");
        v.finish()
    }
}

impl From<UnitSeed> for NewUnit {
    fn from(seed: UnitSeed) -> Self {
        Self {
            name: seed.name,
            municipality: seed.municipality,
            province: seed.province,
            description: seed.description,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Units {
    db: Db,
}

impl Units {
    pub const fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_active(&self) -> AnyResult<Vec<Unit>> {
        sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.db)
            .await
            .context("failed to list units")
    }

    /// Look up an active unit. Deactivated units are treated as absent.
    pub async fn get_active(&self, id: i64) -> AnyResult<Option<Unit>> {
        sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = ? AND is_active = 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("failed to fetch unit")
    }

    pub async fn create(&self, input: NewUnit) -> Result<Unit> {
        input.validate()?;

        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (name, municipality, province, description, is_active, created_at)
                VALUES (?, ?, ?, ?, 1, ?)
                RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.municipality.trim())
        .bind(input.province.trim())
        .bind(input.description.as_deref())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await;

        match unit {
            Ok(unit) => {
                info!(unit = unit.id, "created unit {}", unit.name);
                Ok(unit)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::conflict("Barangay with this name already exists"))
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to create unit").into()),
        }
    }

    /// Deactivate a unit. Returns `false` if no active unit had that id.
    pub async fn deactivate(&self, id: i64) -> AnyResult<bool> {
        let result = sqlx::query("UPDATE units SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("failed to deactivate unit")?;
        Ok(result.rows_affected() == 1)
    }

    /// Create any configured unit whose name is not yet taken.
    pub async fn seed(&self, seeds: &[UnitSeed]) -> AnyResult<()> {
        for seed in seeds {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM units WHERE name = ?")
                .bind(&seed.name)
                .fetch_optional(&self.db)
                .await
                .context("failed to look up unit")?;
            if exists.is_some() {
                continue;
            }

            self.create(NewUnit::from(seed.clone()))
                .await
                .map_err(|e| anyhow::anyhow!("failed to seed unit {}: {e}", seed.name))?;
        }
        Ok(())
    }
}
