use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "pw123456")]
    pub password: String,
}

/// Claims carried by the signed session cookie. The session itself lives
/// server-side under `sid`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub uid: i64,
    pub sid: String,
    pub exp: usize,
}
