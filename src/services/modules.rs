use crate::context::RequestContext;
use crate::db::operations::modules::{insert_module, select_modules, select_next_incomplete_module};
use crate::db::{rollback, Database};
use crate::models::{ExerciseKind, Module};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("module store failure")]
    Store(#[source] sqlx::Error),
}

fn normalize_title(title: &str) -> Result<&str, ModuleError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ModuleError::Validation("module title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ModuleError::Validation(format!(
            "module title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

pub async fn create_module(
    ctx: &RequestContext,
    db: &Database,
    kind: ExerciseKind,
    title: &str,
) -> Result<i64, ModuleError> {
    let title = normalize_title(title)?;

    let mut tx = db.pool().begin().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), kind = %kind, error = %err, "failed to open module transaction");
        ModuleError::Store(err)
    })?;
    let module_id = match insert_module(&mut *tx, kind, title).await {
        Ok(id) => id,
        Err(err) => {
            rollback(ctx, tx).await;
            tracing::error!(request_id = ctx.request_id(), kind = %kind, error = %err, "failed to create module");
            return Err(ModuleError::Store(err));
        }
    };
    tx.commit().await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), kind = %kind, error = %err, "failed to commit module");
        ModuleError::Store(err)
    })?;

    tracing::info!(request_id = ctx.request_id(), kind = %kind, module_id, "module created");
    Ok(module_id)
}

pub async fn list_modules(
    ctx: &RequestContext,
    db: &Database,
    kind: ExerciseKind,
) -> Result<Vec<Module>, ModuleError> {
    select_modules(db.pool(), kind).await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), kind = %kind, error = %err, "failed to list modules");
        ModuleError::Store(err)
    })
}

/// The first module of `kind` the user has not finished, or `None` when every non-empty
/// module is fully completed.
pub async fn next_incomplete_module(
    ctx: &RequestContext,
    db: &Database,
    user_id: &str,
    kind: ExerciseKind,
) -> Result<Option<Module>, ModuleError> {
    let module = select_next_incomplete_module(db.pool(), user_id, kind)
        .await
        .map_err(|err| {
            tracing::error!(
                request_id = ctx.request_id(),
                user_id,
                kind = %kind,
                error = %err,
                "failed to compute next module"
            );
            ModuleError::Store(err)
        })?;

    tracing::debug!(
        request_id = ctx.request_id(),
        user_id,
        kind = %kind,
        module_id = module.as_ref().map(|m| m.id),
        "next incomplete module"
    );
    Ok(module)
}
