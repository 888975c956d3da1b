// src/services/appointment_service.rs

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AppointmentRepository,
    models::appointments::{
        Appointment, AppointmentStatus, ConflictCheckResponse, ConflictQuery, CreateAppointmentPayload,
    },
};

/// Converte data + hora locais da barbearia para UTC.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Janela da consulta de conflito. Sem horários, vale o dia inteiro
/// (meia-noite local até a meia-noite seguinte).
pub fn conflict_window(
    date: NaiveDate,
    window: Option<(NaiveTime, NaiveTime)>,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let (start, end) = match window {
        Some((from, to)) => (local_to_utc(date, from, offset), local_to_utc(date, to, offset)),
        None => {
            let next_day = date.checked_add_days(Days::new(1)).ok_or(AppError::InvalidTimeRange)?;
            (
                local_to_utc(date, NaiveTime::MIN, offset),
                local_to_utc(next_day, NaiveTime::MIN, offset),
            )
        }
    };

    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok((start, end)),
        _ => Err(AppError::InvalidTimeRange),
    }
}

/// Aplica a regra final sobre os candidatos do pré-filtro SQL.
pub fn find_conflicts(query: &ConflictQuery, candidates: Vec<Appointment>) -> Vec<Appointment> {
    candidates.into_iter().filter(|a| query.conflicts_with(a)).collect()
}

#[derive(Clone)]
pub struct AppointmentService {
    repo: AppointmentRepository,
}

impl AppointmentService {
    pub fn new(repo: AppointmentRepository) -> Self {
        Self { repo }
    }

    /// Checagem de conflito (consultiva). Lista de recursos vazia desabilita
    /// a consulta: nada vai ao banco e o resultado é vazio.
    pub async fn check_conflicts<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        date: NaiveDate,
        resource_ids: &[Uuid],
        window: Option<(NaiveTime, NaiveTime)>,
        offset: FixedOffset,
    ) -> Result<ConflictCheckResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if resource_ids.is_empty() {
            return Ok(ConflictCheckResponse { enabled: false, date, conflicts: vec![] });
        }

        let (start, end) = conflict_window(date, window, offset)?;
        let query = ConflictQuery::new(resource_ids, start, end).ok_or(AppError::InvalidTimeRange)?;

        let candidates = self.repo.find_overlapping(executor, unidade_id, &query).await?;

        Ok(ConflictCheckResponse { enabled: true, date, conflicts: find_conflicts(&query, candidates) })
    }

    /// Cria o agendamento sem corrida com outra criação: trava cada recurso
    /// (em ordem), refaz a checagem e só então insere.
    pub async fn create<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        payload: &CreateAppointmentPayload,
    ) -> Result<Appointment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let query = ConflictQuery::new(&payload.resource_ids, payload.start_at, payload.end_at)
            .ok_or(AppError::InvalidTimeRange)?;

        let mut tx = conn.begin().await?;

        self.lock_and_check(&mut tx, unidade_id, &query).await?;

        let appointment = self
            .repo
            .create(
                &mut *tx,
                unidade_id,
                payload.client_id,
                &query.resource_ids,
                payload.service_name.trim(),
                query.start,
                query.end,
                payload.notes.as_deref(),
            )
            .await?;

        let reminders = self.repo.schedule_notifications(&mut *tx, appointment.id).await?;

        tx.commit().await?;

        tracing::info!("📅 Agendamento {} criado ({} lembrete(s) enfileirado(s))", appointment.id, reminders);
        Ok(appointment)
    }

    /// Muda o horário mantendo os mesmos recursos.
    pub async fn reschedule<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<Appointment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, unidade_id, id)
            .await?
            .ok_or(AppError::NotFound("appointment"))?;

        let query = ConflictQuery::new(&current.resource_ids, start_at, end_at)
            .ok_or(AppError::InvalidTimeRange)?
            .excluding(id);

        self.lock_and_check(&mut tx, unidade_id, &query).await?;

        let updated = self
            .repo
            .update_times(&mut *tx, unidade_id, id, query.start, query.end)
            .await?
            .ok_or(AppError::NotFound("appointment"))?;

        self.repo.schedule_notifications(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn lock_and_check(
        &self,
        conn: &mut sqlx::PgConnection,
        unidade_id: Uuid,
        query: &ConflictQuery,
    ) -> Result<(), AppError> {
        // `resource_ids` já vem ordenado: mesma ordem de trava em toda transação
        for resource_id in &query.resource_ids {
            self.repo.lock_resource(&mut *conn, *resource_id).await?;
        }

        let candidates = self.repo.find_overlapping(&mut *conn, unidade_id, query).await?;
        let conflicts = find_conflicts(query, candidates);

        if !conflicts.is_empty() {
            return Err(AppError::ScheduleConflict(conflicts.into_iter().map(|a| a.id).collect()));
        }
        Ok(())
    }

    pub async fn list_day<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (from, to) = conflict_window(date, None, offset)?;
        self.repo.list_between(executor, unidade_id, from, to).await
    }

    /// Cancelar descarta os lembretes pendentes na mesma transação.
    pub async fn update_status<'a, A>(
        &self,
        conn: A,
        unidade_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let appointment = self
            .repo
            .update_status(&mut *tx, unidade_id, id, status)
            .await?
            .ok_or(AppError::NotFound("appointment"))?;

        if status == AppointmentStatus::Cancelado {
            self.repo.schedule_notifications(&mut *tx, id).await?;
            tracing::info!("📅 Agendamento {} cancelado, lembretes descartados", id);
        }

        tx.commit().await?;
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    use crate::common::db_utils::begin_scoped_transaction;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn whole_day_window_follows_the_shop_timezone() {
        let (start, end) = conflict_window(date(), None, brt()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 16, 3, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap());
    }

    #[test]
    fn explicit_window_must_not_be_inverted() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        let (start, end) = conflict_window(date(), Some((nine, ten)), brt()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 16, 13, 0, 0).unwrap());

        assert!(matches!(
            conflict_window(date(), Some((ten, nine)), brt()),
            Err(AppError::InvalidTimeRange)
        ));
    }

    #[tokio::test]
    async fn empty_resource_list_never_touches_the_database() {
        // Pool sem servidor: qualquer consulta falharia
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost:1/nada").unwrap();
        let service = AppointmentService::new(AppointmentRepository::new());

        let response = service
            .check_conflicts(&pool, Uuid::new_v4(), date(), &[], None, brt())
            .await
            .unwrap();

        assert!(!response.enabled);
        assert!(response.conflicts.is_empty());
        assert_eq!(response.date, date());
    }

    async fn seed_unit(pool: &sqlx::PgPool) -> Uuid {
        sqlx::query_scalar("INSERT INTO unidades (name) VALUES ('Centro') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn pending_reminders(pool: &sqlx::PgPool, appointment_id: Uuid) -> Vec<DateTime<Utc>> {
        sqlx::query_scalar(
            r#"
            SELECT run_at FROM jobs
            WHERE kind = 'NOTIFICATION' AND status = 'PENDING' AND payload->>'appointmentId' = $1
            ORDER BY run_at
            "#,
        )
        .bind(appointment_id.to_string())
        .fetch_all(pool)
        .await
        .unwrap()
    }

    // Segundos inteiros: o banco guarda microssegundos
    fn in_days(days: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(Utc::now().timestamp() + days * 86_400, 0).unwrap()
    }

    fn payload(resource: Uuid, start_at: DateTime<Utc>) -> CreateAppointmentPayload {
        CreateAppointmentPayload {
            client_id: None,
            resource_ids: vec![resource],
            service_name: "Corte".to_string(),
            start_at,
            end_at: start_at + chrono::Duration::minutes(45),
            notes: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reschedule_replaces_reminders_and_cancel_drops_them(pool: sqlx::PgPool) {
        let unidade = seed_unit(&pool).await;
        let service = AppointmentService::new(AppointmentRepository::new());
        let barber = Uuid::new_v4();

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let created = service
            .create(&mut *tx, unidade, &payload(barber, in_days(3)))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(pending_reminders(&pool, created.id).await.len(), 2);

        let new_start = in_days(5);
        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let moved = service
            .reschedule(&mut *tx, unidade, created.id, new_start, new_start + chrono::Duration::minutes(45))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            pending_reminders(&pool, created.id).await,
            [moved.start_at - chrono::Duration::hours(24), moved.start_at - chrono::Duration::hours(1)]
        );

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let cancelled = service
            .update_status(&mut *tx, unidade, created.id, AppointmentStatus::Cancelado)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(cancelled.status, AppointmentStatus::Cancelado);
        assert!(pending_reminders(&pool, created.id).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn confirming_keeps_the_reminders(pool: sqlx::PgPool) {
        let unidade = seed_unit(&pool).await;
        let service = AppointmentService::new(AppointmentRepository::new());

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let created = service
            .create(&mut *tx, unidade, &payload(Uuid::new_v4(), in_days(2)))
            .await
            .unwrap();
        service
            .update_status(&mut *tx, unidade, created.id, AppointmentStatus::Confirmado)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(pending_reminders(&pool, created.id).await.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overlapping_booking_on_the_same_resource_is_refused(pool: sqlx::PgPool) {
        let unidade = seed_unit(&pool).await;
        let service = AppointmentService::new(AppointmentRepository::new());
        let barber = Uuid::new_v4();
        let start = in_days(1);

        let mut tx = begin_scoped_transaction(&pool, unidade, Uuid::new_v4()).await.unwrap();
        let first = service.create(&mut *tx, unidade, &payload(barber, start)).await.unwrap();

        let clash = service
            .create(&mut *tx, unidade, &payload(barber, start + chrono::Duration::minutes(30)))
            .await;
        assert!(matches!(clash, Err(AppError::ScheduleConflict(ids)) if ids == vec![first.id]));

        // Encostado no fim do anterior não conflita
        service
            .create(&mut *tx, unidade, &payload(barber, start + chrono::Duration::minutes(45)))
            .await
            .unwrap();

        // Cancelado libera o horário
        service
            .update_status(&mut *tx, unidade, first.id, AppointmentStatus::Cancelado)
            .await
            .unwrap();
        service.create(&mut *tx, unidade, &payload(barber, start)).await.unwrap();
    }
}
