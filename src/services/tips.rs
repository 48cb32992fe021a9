use serde::Deserialize;

use crate::context::RequestContext;
use crate::db::operations::tips::{insert_tip, select_latest_tip, Tip};
use crate::db::Database;

#[derive(Debug, thiserror::Error)]
pub enum TipError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("tip store failure")]
    Store(#[source] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTip {
    pub phonema: String,
    pub text: String,
    #[serde(default)]
    pub media_link: String,
    #[serde(default)]
    pub audio_link: String,
}

pub async fn upload_tip(ctx: &RequestContext, db: &Database, tip: &NewTip) -> Result<i64, TipError> {
    let phonema = tip.phonema.trim();
    let text = tip.text.trim();
    if phonema.is_empty() || text.is_empty() {
        return Err(TipError::Validation("phonema and text are required".to_string()));
    }

    let id = insert_tip(db.pool(), phonema, text, tip.media_link.trim(), tip.audio_link.trim())
        .await
        .map_err(|err| {
            tracing::error!(request_id = ctx.request_id(), phonema, error = %err, "failed to store tip");
            TipError::Store(err)
        })?;

    tracing::info!(request_id = ctx.request_id(), phonema, tip_id = id, "tip uploaded");
    Ok(id)
}

/// Latest tip for the phoneme; `None` when nothing was uploaded for it.
pub async fn get_tip(ctx: &RequestContext, db: &Database, phonema: &str) -> Result<Option<Tip>, TipError> {
    let phonema = phonema.trim();
    if phonema.is_empty() {
        return Err(TipError::Validation("phonema is required".to_string()));
    }
    select_latest_tip(db.pool(), phonema).await.map_err(|err| {
        tracing::error!(request_id = ctx.request_id(), phonema, error = %err, "failed to load tip");
        TipError::Store(err)
    })
}
