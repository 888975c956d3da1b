// src/models/appointments.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE appointment_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Agendado,
    Confirmado,
    Concluido,
    Cancelado,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    #[schema(ignore)]
    pub unidade_id: Uuid,
    pub client_id: Option<Uuid>,

    // Profissionais e salas ocupados pelo agendamento
    pub resource_ids: Vec<Uuid>,

    #[schema(example = "Corte + Barba")]
    pub service_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Consulta de conflito já validada: só existe com ao menos um recurso
/// e com janela `[start, end)` não vazia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
    pub resource_ids: Vec<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exclude_id: Option<Uuid>,
}

impl ConflictQuery {
    /// `None` quando a lista de recursos está vazia: a consulta fica
    /// desabilitada e nada é enviado ao banco.
    pub fn new(resource_ids: &[Uuid], start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if resource_ids.is_empty() || end <= start {
            return None;
        }
        let mut resource_ids = resource_ids.to_vec();
        resource_ids.sort();
        resource_ids.dedup();
        Some(Self { resource_ids, start, end, exclude_id: None })
    }

    pub fn excluding(mut self, appointment_id: Uuid) -> Self {
        self.exclude_id = Some(appointment_id);
        self
    }

    /// Regra final de conflito. O SQL do repositório só pré-filtra por
    /// recurso e janela.
    pub fn conflicts_with(&self, appointment: &Appointment) -> bool {
        appointment.status != AppointmentStatus::Cancelado
            && Some(appointment.id) != self.exclude_id
            && appointment.resource_ids.iter().any(|id| self.resource_ids.binary_search(id).is_ok())
            && overlaps(self.start, self.end, appointment.start_at, appointment.end_at)
    }
}

/// Intervalos semiabertos: encostar (fim == início) não é conflito.
pub fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>) -> bool {
    a_start < b_end && b_start < a_end
}

// Resposta da checagem de conflito
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckResponse {
    // false quando a consulta foi desabilitada (lista de recursos vazia)
    pub enabled: bool,
    #[schema(value_type = String, format = Date, example = "2026-10-16")]
    pub date: NaiveDate,
    pub conflicts: Vec<Appointment>,
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentPayload {
    pub client_id: Option<Uuid>,
    #[validate(length(min = 1, message = "resources_required"))]
    pub resource_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Corte + Barba")]
    pub service_name: String,
    #[schema(example = "2026-10-16T13:00:00Z")]
    pub start_at: DateTime<Utc>,
    #[schema(example = "2026-10-16T13:45:00Z")]
    pub end_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulePayload {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: AppointmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, minute, 0).unwrap()
    }

    fn appointment(resources: Vec<Uuid>, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            unidade_id: Uuid::new_v4(),
            client_id: None,
            resource_ids: resources,
            service_name: "Corte".into(),
            start_at: start,
            end_at: end,
            status: AppointmentStatus::Agendado,
            notes: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn empty_resource_list_disables_the_query() {
        assert!(ConflictQuery::new(&[], at(9, 0), at(10, 0)).is_none());
    }

    #[test]
    fn inverted_window_disables_the_query() {
        assert!(ConflictQuery::new(&[Uuid::new_v4()], at(10, 0), at(9, 0)).is_none());
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        let barber = Uuid::new_v4();
        let query = ConflictQuery::new(&[barber], at(10, 0), at(10, 30)).unwrap();

        assert!(!query.conflicts_with(&appointment(vec![barber], at(9, 30), at(10, 0))));
        assert!(query.conflicts_with(&appointment(vec![barber], at(9, 30), at(10, 1))));
    }

    #[test]
    fn only_shared_resources_conflict() {
        let barber = Uuid::new_v4();
        let room = Uuid::new_v4();
        let query = ConflictQuery::new(&[barber, room], at(14, 0), at(15, 0)).unwrap();

        assert!(query.conflicts_with(&appointment(vec![Uuid::new_v4(), room], at(14, 30), at(15, 30))));
        assert!(!query.conflicts_with(&appointment(vec![Uuid::new_v4()], at(14, 30), at(15, 30))));
    }

    #[test]
    fn cancelled_and_excluded_appointments_never_conflict() {
        let barber = Uuid::new_v4();
        let mut cancelled = appointment(vec![barber], at(9, 0), at(10, 0));
        cancelled.status = AppointmentStatus::Cancelado;
        let same = appointment(vec![barber], at(9, 0), at(10, 0));

        let query = ConflictQuery::new(&[barber], at(9, 0), at(10, 0)).unwrap().excluding(same.id);
        assert!(!query.conflicts_with(&cancelled));
        assert!(!query.conflicts_with(&same));
    }
}
