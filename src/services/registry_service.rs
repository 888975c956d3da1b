// src/services/registry_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientRepository, ProfessionalRepository},
    models::registry::{Client, ClientPayload, Professional, ProfessionalPayload},
};

// Cadastros da unidade: clientes e profissionais.
#[derive(Clone)]
pub struct RegistryService {
    clients: ClientRepository,
    professionals: ProfessionalRepository,
}

impl RegistryService {
    pub fn new(clients: ClientRepository, professionals: ProfessionalRepository) -> Self {
        Self { clients, professionals }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_client<'e, E>(&self, executor: E, unidade_id: Uuid, input: &ClientPayload) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.clients.create(executor, unidade_id, input).await
    }

    pub async fn list_clients<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Busca em branco é o mesmo que sem busca
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.clients.list(executor, unidade_id, search).await
    }

    pub async fn get_client<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.clients
            .find_by_id(executor, unidade_id, id)
            .await?
            .ok_or(AppError::NotFound("client"))
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        input: &ClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.clients
            .update(executor, unidade_id, id, input)
            .await?
            .ok_or(AppError::NotFound("client"))
    }

    pub async fn delete_client<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.clients.delete(executor, unidade_id, id).await? {
            return Err(AppError::NotFound("client"));
        }
        Ok(())
    }

    // =========================================================================
    //  PROFISSIONAIS
    // =========================================================================

    pub async fn create_professional<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        input: &ProfessionalPayload,
    ) -> Result<Professional, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.professionals.create(executor, unidade_id, input).await
    }

    pub async fn list_professionals<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<Vec<Professional>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.professionals.list(executor, unidade_id).await
    }

    pub async fn get_professional<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<Professional, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.professionals
            .find_by_id(executor, unidade_id, id)
            .await?
            .ok_or(AppError::NotFound("professional"))
    }

    pub async fn update_professional<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        input: &ProfessionalPayload,
    ) -> Result<Professional, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.professionals
            .update(executor, unidade_id, id, input)
            .await?
            .ok_or(AppError::NotFound("professional"))
    }

    pub async fn delete_professional<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.professionals.delete(executor, unidade_id, id).await? {
            return Err(AppError::NotFound("professional"));
        }
        Ok(())
    }
}
