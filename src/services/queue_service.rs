// src/services/queue_service.rs

use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::QueueRepository,
    models::queue::{QueueEntry, QueueEntryView},
};

/// Quem está pedindo para mexer na fila.
#[derive(Debug, Clone, Copy)]
pub struct QueueCaller {
    pub user_id: Uuid,
    // Informado explicitamente (ex.: recepção atendendo por um barbeiro)
    pub professional_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Attend,
    PassTurn,
}

#[derive(Clone)]
pub struct QueueService {
    repo: QueueRepository,
}

impl QueueService {
    pub fn new(repo: QueueRepository) -> Self {
        Self { repo }
    }

    pub async fn list<'a, A>(&self, conn: A, unidade_id: Uuid) -> Result<Vec<QueueEntryView>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        self.repo.list_active(&mut *conn, unidade_id).await
    }

    /// "Atender": a procedure incrementa os contadores e manda o
    /// profissional para o fim. `None` quando não há linha de fila.
    pub async fn attend_turn<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        caller: QueueCaller,
    ) -> Result<Option<Vec<QueueEntryView>>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        self.advance(conn, unidade_id, caller, Advance::Attend).await
    }

    /// "Passar a vez": vai para o fim sem contar atendimento.
    pub async fn pass_turn<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        caller: QueueCaller,
    ) -> Result<Option<Vec<QueueEntryView>>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        self.advance(conn, unidade_id, caller, Advance::PassTurn).await
    }

    async fn advance<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        caller: QueueCaller,
        action: Advance,
    ) -> Result<Option<Vec<QueueEntryView>>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;

        let Some(entry) = self.resolve_entry(&mut *conn, unidade_id, caller).await? else {
            tracing::info!("Fila: nenhuma entrada para o usuário {} na unidade {}", caller.user_id, unidade_id);
            return Ok(None);
        };

        match action {
            Advance::Attend => self.repo.attend(&mut *conn, entry.id).await?,
            Advance::PassTurn => self.repo.pass_turn(&mut *conn, entry.id).await?,
        };

        tracing::info!("💈 Fila: {:?} do profissional {}", action, entry.professional_id);

        // A ordem devolvida é sempre a que está gravada
        let ordering = self.repo.list_active(&mut *conn, unidade_id).await?;
        Ok(Some(ordering))
    }

    // Profissional explícito > login do profissional > id do profissional == id do usuário
    async fn resolve_entry(
        &self,
        conn: &mut sqlx::PgConnection,
        unidade_id: Uuid,
        caller: QueueCaller,
    ) -> Result<Option<QueueEntry>, AppError> {
        if let Some(professional_id) = caller.professional_id {
            return self.repo.find_by_professional_id(&mut *conn, unidade_id, professional_id).await;
        }

        if let Some(entry) = self.repo.find_by_user_id(&mut *conn, unidade_id, caller.user_id).await? {
            return Ok(Some(entry));
        }

        self.repo.find_by_professional_id(&mut *conn, unidade_id, caller.user_id).await
    }

    /// Entra na fila (no fim). Repetir a chamada não duplica a linha.
    pub async fn join<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        professional_id: Uuid,
    ) -> Result<Vec<QueueEntryView>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;

        if !self.repo.professional_in_unit(&mut *conn, unidade_id, professional_id).await? {
            return Err(AppError::NotFound("professional"));
        }

        self.repo.join(&mut *conn, unidade_id, professional_id).await?;
        self.repo.list_active(&mut *conn, unidade_id).await
    }

    pub async fn set_active<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        professional_id: Uuid,
        active: bool,
    ) -> Result<Vec<QueueEntryView>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let entry = self
            .repo
            .find_by_professional_id(&mut *conn, unidade_id, professional_id)
            .await?
            .ok_or(AppError::NotFound("queue_entry"))?;

        self.repo.set_active(&mut *conn, entry.id, active).await?;
        self.repo.list_active(&mut *conn, unidade_id).await
    }

    pub async fn reset_daily<'a, A>(&self, conn: A, unidade_id: Uuid) -> Result<u64, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let reset = self.repo.reset_daily_counts(&mut *conn, unidade_id).await?;
        tracing::info!("🔄 Fila: contadores diários zerados ({} profissionais)", reset);
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sqlx::{PgConnection, PgPool};

    use crate::common::db_utils::begin_scoped_transaction;

    async fn seed_unit(pool: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO unidades (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_user(pool: &PgPool, email: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_professional(conn: &mut PgConnection, unidade_id: Uuid, name: &str, user_id: Option<Uuid>) -> Uuid {
        sqlx::query_scalar("INSERT INTO profissionais (unidade_id, user_id, name) VALUES ($1, $2, $3) RETURNING id")
            .bind(unidade_id)
            .bind(user_id)
            .bind(name)
            .fetch_one(conn)
            .await
            .unwrap()
    }

    fn service() -> QueueService {
        QueueService::new(QueueRepository::new())
    }

    fn names(queue: &[QueueEntryView]) -> Vec<&str> {
        queue.iter().map(|e| e.professional_name.as_str()).collect()
    }

    fn positions(queue: &[QueueEntryView]) -> Vec<i32> {
        queue.iter().map(|e| e.entry.queue_position).collect()
    }

    fn by_name<'q>(queue: &'q [QueueEntryView], name: &str) -> &'q QueueEntry {
        &queue.iter().find(|e| e.professional_name == name).unwrap().entry
    }

    fn explicit(professional_id: Uuid) -> QueueCaller {
        QueueCaller { user_id: Uuid::new_v4(), professional_id: Some(professional_id) }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn attend_counts_the_service_and_moves_to_the_back(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let svc = service();

        let ana = seed_professional(&mut tx, unidade, "Ana", None).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        let caio = seed_professional(&mut tx, unidade, "Caio", None).await;
        for id in [ana, bia, caio] {
            svc.join(&mut *tx, unidade, id).await.unwrap();
        }

        let queue = svc.attend_turn(&mut *tx, unidade, explicit(ana)).await.unwrap().unwrap();

        assert_eq!(names(&queue), ["Bia", "Caio", "Ana"]);
        assert_eq!(positions(&queue), [0, 1, 2]);

        let ana_entry = by_name(&queue, "Ana");
        assert_eq!(ana_entry.daily_service_count, 1);
        assert_eq!(ana_entry.total_service_count, 1);
        assert!(ana_entry.last_service_at.is_some());
        assert_eq!(by_name(&queue, "Bia").daily_service_count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn pass_turn_keeps_the_counters(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let svc = service();

        let ana = seed_professional(&mut tx, unidade, "Ana", None).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        svc.join(&mut *tx, unidade, ana).await.unwrap();
        svc.join(&mut *tx, unidade, bia).await.unwrap();

        svc.attend_turn(&mut *tx, unidade, explicit(ana)).await.unwrap();
        let queue = svc.pass_turn(&mut *tx, unidade, explicit(bia)).await.unwrap().unwrap();

        assert_eq!(names(&queue), ["Ana", "Bia"]);
        assert_eq!(positions(&queue), [0, 1]);

        let bia_entry = by_name(&queue, "Bia");
        assert_eq!(bia_entry.daily_service_count, 0);
        assert_eq!(bia_entry.total_service_count, 0);
        assert!(bia_entry.last_service_at.is_none());
        assert_eq!(by_name(&queue, "Ana").total_service_count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn positions_stay_contiguous_after_deactivate_and_rejoin(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let svc = service();

        let ana = seed_professional(&mut tx, unidade, "Ana", None).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        let caio = seed_professional(&mut tx, unidade, "Caio", None).await;
        for id in [ana, bia, caio] {
            svc.join(&mut *tx, unidade, id).await.unwrap();
        }

        let queue = svc.set_active(&mut *tx, unidade, bia, false).await.unwrap();
        assert_eq!(names(&queue), ["Ana", "Caio"]);
        assert_eq!(positions(&queue), [0, 1]);

        let queue = svc.pass_turn(&mut *tx, unidade, explicit(ana)).await.unwrap().unwrap();
        assert_eq!(names(&queue), ["Caio", "Ana"]);
        assert_eq!(positions(&queue), [0, 1]);

        // Reativar coloca no fim; entrar de novo não duplica
        svc.set_active(&mut *tx, unidade, bia, true).await.unwrap();
        let queue = svc.join(&mut *tx, unidade, bia).await.unwrap();
        assert_eq!(names(&queue), ["Caio", "Ana", "Bia"]);
        assert_eq!(positions(&queue), [0, 1, 2]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn caller_resolution_prefers_explicit_then_login_then_row_id(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let login = seed_user(&pool, "ana@barbearia.com").await;
        let mut tx = begin_scoped_transaction(&pool, unidade, login).await.unwrap();
        let svc = service();

        let ana = seed_professional(&mut tx, unidade, "Ana", Some(login)).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        let caio = seed_professional(&mut tx, unidade, "Caio", None).await;
        for id in [ana, bia, caio] {
            svc.join(&mut *tx, unidade, id).await.unwrap();
        }

        // Login da Ana
        let queue = svc
            .pass_turn(&mut *tx, unidade, QueueCaller { user_id: login, professional_id: None })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&queue), ["Bia", "Caio", "Ana"]);

        // Sem login vinculado: o id do usuário é o próprio id do profissional
        let queue = svc
            .pass_turn(&mut *tx, unidade, QueueCaller { user_id: bia, professional_id: None })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&queue), ["Caio", "Ana", "Bia"]);

        // Profissional explícito vence o login
        let queue = svc
            .pass_turn(&mut *tx, unidade, QueueCaller { user_id: login, professional_id: Some(caio) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&queue), ["Ana", "Bia", "Caio"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn caller_without_queue_entry_gets_none_and_queue_is_untouched(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let svc = service();

        let ana = seed_professional(&mut tx, unidade, "Ana", None).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        svc.join(&mut *tx, unidade, ana).await.unwrap();
        svc.join(&mut *tx, unidade, bia).await.unwrap();

        let stranger = QueueCaller { user_id: Uuid::new_v4(), professional_id: None };
        assert!(svc.attend_turn(&mut *tx, unidade, stranger).await.unwrap().is_none());
        assert!(svc.pass_turn(&mut *tx, unidade, stranger).await.unwrap().is_none());

        let queue = svc.list(&mut *tx, unidade).await.unwrap();
        assert_eq!(names(&queue), ["Ana", "Bia"]);
        assert!(queue.iter().all(|e| e.entry.total_service_count == 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn join_rejects_professionals_of_other_units(pool: PgPool) {
        let centro = seed_unit(&pool, "Centro").await;
        let bairro = seed_unit(&pool, "Bairro").await;

        let mut tx = begin_scoped_transaction(&pool, bairro, Uuid::new_v4()).await.unwrap();
        let bruno = seed_professional(&mut tx, bairro, "Bruno", None).await;
        tx.commit().await.unwrap();

        let svc = service();
        let mut tx = begin_scoped_transaction(&pool, centro, Uuid::new_v4()).await.unwrap();
        let ana = seed_professional(&mut tx, centro, "Ana", None).await;
        svc.join(&mut *tx, centro, ana).await.unwrap();

        assert!(matches!(
            svc.join(&mut *tx, centro, bruno).await,
            Err(AppError::NotFound("professional"))
        ));
        assert!(matches!(
            svc.join(&mut *tx, centro, Uuid::new_v4()).await,
            Err(AppError::NotFound("professional"))
        ));
        tx.commit().await.unwrap();

        // A procedure também recusa, mesmo chamada direto
        let mut tx = begin_scoped_transaction(&pool, centro, Uuid::new_v4()).await.unwrap();
        assert!(QueueRepository::new().join(&mut *tx, centro, bruno).await.is_err());
        tx.rollback().await.unwrap();

        // A unidade dona continua podendo colocar o profissional na fila
        let mut tx = begin_scoped_transaction(&pool, bairro, Uuid::new_v4()).await.unwrap();
        let queue = svc.join(&mut *tx, bairro, bruno).await.unwrap();
        assert_eq!(names(&queue), ["Bruno"]);
        assert_eq!(positions(&queue), [0]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn attend_waits_for_a_concurrent_deactivation(pool: PgPool) {
        let unidade = seed_unit(&pool, "Centro").await;
        let svc = service();

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let ana = seed_professional(&mut tx, unidade, "Ana", None).await;
        let bia = seed_professional(&mut tx, unidade, "Bia", None).await;
        svc.join(&mut *tx, unidade, ana).await.unwrap();
        svc.join(&mut *tx, unidade, bia).await.unwrap();
        tx.commit().await.unwrap();

        // Desativa a Ana e segura a trava da fila
        let mut deactivation = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        svc.set_active(&mut *deactivation, unidade, ana, false).await.unwrap();

        let attend = tokio::spawn({
            let pool = pool.clone();
            let svc = svc.clone();
            async move {
                let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
                svc.attend_turn(&mut *tx, unidade, explicit(ana)).await
            }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        deactivation.commit().await.unwrap();

        assert!(attend.await.unwrap().is_err());

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let queue = svc.list(&mut *tx, unidade).await.unwrap();
        assert_eq!(names(&queue), ["Bia"]);
        assert_eq!(positions(&queue), [0]);

        let ana_entry = QueueRepository::new()
            .find_by_professional_id(&mut *tx, unidade, ana)
            .await
            .unwrap()
            .unwrap();
        assert!(!ana_entry.is_active);
        assert_eq!(ana_entry.total_service_count, 0);
    }
}
