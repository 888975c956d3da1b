// src/services/unit_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::UnitRepository, models::units::Unit};

#[derive(Clone)]
pub struct UnitService {
    unit_repo: UnitRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl UnitService {
    pub fn new(unit_repo: UnitRepository, pool: PgPool) -> Self {
        Self { unit_repo, pool }
    }

    /// Cria a unidade e, na mesma transação, torna quem criou membro dela.
    pub async fn create_unit_with_owner(
        &self,
        name: &str,
        address: Option<&str>,
        phone: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Unit, AppError> {
        let mut tx = self.pool.begin().await?;

        let unit = self.unit_repo.create_unit(&mut *tx, name, address, phone).await?;
        self.unit_repo.assign_user_to_unit(&mut *tx, owner_id, unit.id).await?;

        tx.commit().await?;

        tracing::info!("🏠 Unidade '{}' ({}) criada por {}", unit.name, unit.id, owner_id);
        Ok(unit)
    }

    pub async fn list_user_units(&self, user_id: Uuid) -> Result<Vec<Unit>, AppError> {
        self.unit_repo.list_for_user(user_id).await
    }

    pub async fn is_member(&self, user_id: Uuid, unidade_id: Uuid) -> Result<bool, AppError> {
        self.unit_repo.check_user_membership(user_id, unidade_id).await
    }
}
