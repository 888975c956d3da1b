// src/models/queue.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Linha de `barber_queue`. Só é alterada pelas procedures do banco;
/// a aplicação nunca calcula posição.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    #[schema(ignore)]
    pub unidade_id: Uuid,
    pub professional_id: Uuid,
    #[schema(example = 0)]
    pub queue_position: i32,
    #[schema(example = 3)]
    pub daily_service_count: i32,
    #[schema(example = 128)]
    pub total_service_count: i32,
    pub is_active: bool,
    pub last_service_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// Linha da fila com o nome do profissional, para exibição.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub entry: QueueEntry,
    #[schema(example = "Andrey")]
    pub professional_name: String,
}

/// Resultado de "atender" / "passar a vez". `queue` ausente significa que
/// não existe linha de fila para a identidade: não é erro.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueAdvanceResponse {
    pub queue: Option<Vec<QueueEntryView>>,
    #[schema(example = "no_queue_entry")]
    pub message: Option<String>,
}

impl QueueAdvanceResponse {
    pub const NO_QUEUE_ENTRY: &'static str = "no_queue_entry";

    pub fn from_result(queue: Option<Vec<QueueEntryView>>) -> Self {
        let message = match queue {
            Some(_) => None,
            None => Some(Self::NO_QUEUE_ENTRY.to_string()),
        };
        Self { queue, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_queue_row_is_a_message_not_an_error() {
        let response = QueueAdvanceResponse::from_result(None);
        assert!(response.queue.is_none());
        assert_eq!(response.message.as_deref(), Some("no_queue_entry"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["queue"].is_null());
    }

    #[test]
    fn present_ordering_has_no_message() {
        let response = QueueAdvanceResponse::from_result(Some(vec![]));
        assert!(response.message.is_none());
        assert_eq!(response.queue.map(|q| q.len()), Some(0));
    }
}
