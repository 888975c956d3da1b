// src/db/registry_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::registry::{Client, ClientPayload, Professional, ProfessionalPayload},
};

// Tabela `clientes`. Sempre chamado dentro da transação RLS da unidade.
#[derive(Clone, Default)]
pub struct ClientRepository;

impl ClientRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        input: &ClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clientes (unidade_id, name, phone, email, birth_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.birth_date)
        .bind(&input.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("Telefone '{}' já cadastrado.", input.phone.as_deref().unwrap_or("?"))))
    }

    /// Lista os clientes; `search` filtra por nome, telefone ou e-mail.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pattern = search.map(|q| format!("%{}%", q.trim()));

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT * FROM clientes
            WHERE unidade_id = $1
              AND (
                $2::text IS NULL
                OR name ILIKE $2
                OR phone ILIKE $2
                OR email ILIKE $2
              )
            ORDER BY name ASC
            LIMIT 200
            "#,
        )
        .bind(unidade_id)
        .bind(pattern)
        .fetch_all(executor)
        .await?;

        Ok(clients)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clientes WHERE unidade_id = $1 AND id = $2")
            .bind(unidade_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(client)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        input: &ClientPayload,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(
            r#"
            UPDATE clientes
            SET name = $3, phone = $4, email = $5, birth_date = $6, notes = $7, updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.birth_date)
        .bind(&input.notes)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("Telefone '{}' já cadastrado.", input.phone.as_deref().unwrap_or("?"))))
    }

    pub async fn delete<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM clientes WHERE unidade_id = $1 AND id = $2")
            .bind(unidade_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Tabela `profissionais`.
#[derive(Clone, Default)]
pub struct ProfessionalRepository;

impl ProfessionalRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        input: &ProfessionalPayload,
    ) -> Result<Professional, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Professional>(
            r#"
            INSERT INTO profissionais (
                unidade_id, user_id, name, specialty, phone, email, commission_percent, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.specialty)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.commission_percent)
        .bind(input.active)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || "Usuário já vinculado a outro profissional desta unidade.".to_string()))
    }

    pub async fn list<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<Vec<Professional>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let professionals = sqlx::query_as::<_, Professional>(
            "SELECT * FROM profissionais WHERE unidade_id = $1 ORDER BY name ASC",
        )
        .bind(unidade_id)
        .fetch_all(executor)
        .await?;
        Ok(professionals)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Professional>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let professional = sqlx::query_as::<_, Professional>(
            "SELECT * FROM profissionais WHERE unidade_id = $1 AND id = $2",
        )
        .bind(unidade_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(professional)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        input: &ProfessionalPayload,
    ) -> Result<Option<Professional>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Professional>(
            r#"
            UPDATE profissionais
            SET user_id = $3, name = $4, specialty = $5, phone = $6, email = $7,
                commission_percent = $8, active = $9, updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.specialty)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.commission_percent)
        .bind(input.active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || "Usuário já vinculado a outro profissional desta unidade.".to_string()))
    }

    pub async fn delete<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM profissionais WHERE unidade_id = $1 AND id = $2")
            .bind(unidade_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
