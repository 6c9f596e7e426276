use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::auth::Principal;
use crate::auth::session::{SESSION_COOKIE, SessionStore};
use crate::store;

/// Resolves the session cookie into a fresh [`Principal`] for this request.
/// Never rejects; the route extractors decide what an absent principal means.
pub async fn load_principal(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
    let sessions = req.app_data::<Data<SessionStore>>().cloned();
    let pool = req.app_data::<Data<SqlitePool>>().cloned();

    if let (Some(token), Some(sessions), Some(pool)) = (token, sessions, pool) {
        if let Some(principal) = resolve(&token, &sessions, &pool).await {
            req.extensions_mut().insert(principal);
        }
    }

    next.call(req).await
}

async fn resolve(token: &str, sessions: &SessionStore, pool: &SqlitePool) -> Option<Principal> {
    let (session_id, record) = sessions.resolve(token).await?;

    // the row is re-read on every request so role changes and deletions apply at once
    match store::users::find_by_id(pool, record.user_id).await {
        Ok(Some(user)) => Some(Principal::from(user)),
        Ok(None) => {
            info!(user_id = record.user_id, username = %record.username, "Session owner no longer exists");
            sessions.revoke(&session_id).await;
            None
        }
        Err(_) => {
            warn!(user_id = record.user_id, "Could not load session owner");
            None
        }
    }
}
