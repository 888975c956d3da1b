// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis usadas pelas políticas RLS.
/// `set_config(..., true)` vale só até o fim da transação, por isso a
/// conexão nunca volta para a pool com a unidade de outro usuário.
/// Quem chama precisa dar `commit()`; sem commit o drop faz rollback.
pub(crate) async fn begin_rls_transaction(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<Transaction<'static, Postgres>, AppError> {
    begin_scoped_transaction(&app_state.db_pool, tenant_ctx.0, user.0.id).await
}

/// Mesma coisa, para serviços que abrem mais de uma transação em paralelo.
pub(crate) async fn begin_scoped_transaction(
    pool: &PgPool,
    unidade_id: Uuid,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.unidade_id', $1, true)")
        .bind(unidade_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
