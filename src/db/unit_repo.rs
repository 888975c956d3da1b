// src/db/unit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::units::Unit};

#[derive(Clone)]
pub struct UnitRepository {
    pool: PgPool,
}

impl UnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um usuário tem acesso a uma unidade.
    /// Esta é a verificação de autorização mais importante do sistema.
    pub async fn check_user_membership(&self, user_id: Uuid, unidade_id: Uuid) -> Result<bool, AppError> {
        // SELECT EXISTS: apenas 'true' ou 'false'
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_unidades
                WHERE user_id = $1 AND unidade_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(unidade_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_unit<'e, E>(
        &self,
        executor: E,
        name: &str,
        address: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Unit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO unidades (name, address, phone)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(address)
        .bind(phone)
        .fetch_one(executor)
        .await?;

        Ok(unit)
    }

    pub async fn assign_user_to_unit<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        unidade_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_unidades (user_id, unidade_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(unidade_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Unit>, AppError> {
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT u.*
            FROM unidades u
            INNER JOIN user_unidades uu ON uu.unidade_id = u.id
            WHERE uu.user_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }
}
