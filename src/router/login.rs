use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::Identity;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub msg: String,
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Handler to log in.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = state
        .users
        .authenticate(&body.email, &body.password)
        .await
        .inspect_err(|err| tracing::info!(reason = err.kind(), "login refused"))?;

    let token = state.token.create(&Identity::from(&user))?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(Response {
        msg: "Login is successful.".into(),
        token,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in: state.token.expires_in(),
    }))
}
