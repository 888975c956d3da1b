// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_LANG: &str = "pt";

const PT: &[(&str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos."),
    ("email_already_exists", "Este e-mail já está em uso."),
    ("invalid_credentials", "E-mail ou senha inválidos."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("user_not_found", "Usuário não encontrado."),
    ("unit_access_denied", "Você não tem acesso a esta unidade."),
    ("not_found", "Registro não encontrado."),
    ("unique_violation", "Já existe um registro com esses dados."),
    ("schedule_conflict", "Já existe agendamento neste horário para o profissional ou sala."),
    ("invalid_time_range", "O horário de término deve ser posterior ao de início."),
    ("invalid_payload", "Conteúdo da requisição inválido."),
    ("invalid_reset_token", "Link de recuperação inválido ou expirado."),
    ("unknown_gateway_account", "Conta de pagamento desconhecida."),
    ("gateway_not_configured", "Conta de pagamento não configurada."),
    ("gateway_unauthorized", "Falha de autenticação no gateway de pagamento."),
    ("gateway_error", "Falha ao comunicar com o gateway de pagamento."),
    ("internal_error", "Ocorreu um erro inesperado."),
    ("missing_unit_header", "O cabeçalho X-Unidade-ID é obrigatório."),
    ("invalid_unit_header", "Cabeçalho X-Unidade-ID inválido (não é um UUID)."),
    // códigos de validação de campo
    ("required", "Campo obrigatório."),
    ("invalid_email", "E-mail inválido."),
    ("password_too_short", "A senha deve ter no mínimo 6 caracteres."),
    ("resources_required", "Informe ao menos um profissional ou sala."),
    ("invalid_amount", "O valor deve ser maior que zero."),
];

const EN: &[(&str, &str)] = &[
    ("validation_error", "One or more fields are invalid."),
    ("email_already_exists", "This e-mail is already in use."),
    ("invalid_credentials", "Invalid e-mail or password."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("user_not_found", "User not found."),
    ("unit_access_denied", "You do not have access to this unit."),
    ("not_found", "Record not found."),
    ("unique_violation", "A record with this data already exists."),
    ("schedule_conflict", "There is already an appointment at this time for the professional or room."),
    ("invalid_time_range", "End time must be after start time."),
    ("invalid_payload", "Invalid request body."),
    ("invalid_reset_token", "Invalid or expired recovery link."),
    ("unknown_gateway_account", "Unknown payment account."),
    ("gateway_not_configured", "Payment account is not configured."),
    ("gateway_unauthorized", "Authentication with the payment gateway failed."),
    ("gateway_error", "Failed to reach the payment gateway."),
    ("internal_error", "An unexpected error occurred."),
    ("missing_unit_header", "The X-Unidade-ID header is required."),
    ("invalid_unit_header", "Invalid X-Unidade-ID header (not a UUID)."),
    ("required", "Required field."),
    ("invalid_email", "Invalid e-mail."),
    ("password_too_short", "Password must have at least 6 characters."),
    ("resources_required", "Provide at least one professional or room."),
    ("invalid_amount", "Amount must be greater than zero."),
];

// Catálogo de mensagens por idioma. Clonar é barato (Arc).
#[derive(Clone, Debug)]
pub struct I18nStore {
    messages: Arc<HashMap<&'static str, HashMap<&'static str, &'static str>>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert("pt", PT.iter().copied().collect());
        messages.insert("en", EN.iter().copied().collect());
        Self { messages: Arc::new(messages) }
    }

    /// Traduz `key` para `lang`. Idioma desconhecido cai no português;
    /// chave desconhecida volta como está.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|catalog| catalog.get(key)))
            .map(|message| message.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_portuguese_then_to_the_key() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "not_found"), "Record not found.");
        assert_eq!(store.translate("es", "not_found"), "Registro não encontrado.");
        assert_eq!(store.translate("pt", "no_such_key"), "no_such_key");
    }

    #[test]
    fn every_portuguese_key_has_an_english_translation() {
        let en: HashMap<_, _> = EN.iter().copied().collect();
        for (key, _) in PT {
            assert!(en.contains_key(key), "faltando tradução en para {key}");
        }
    }
}
