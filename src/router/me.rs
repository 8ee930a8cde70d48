//! Get caller own account.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::AppState;
use crate::error::Result;
use crate::user::{Identity, User};

#[derive(Debug, Serialize)]
pub struct Response {
    pub user: User,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Response>> {
    let user = state.users.find_by_id(&identity.id).await?;

    Ok(Json(Response { user }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::user::UserId;
    use crate::*;

    #[tokio::test]
    async fn test_me_handler() {
        let app = app(test_state());
        let id = register(&app, "alice", "alice@x.com", "pw1").await;
        let token = login(&app, "alice@x.com", "pw1").await;

        let response = make_request(Some(&token), app, Method::GET, "/me", String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["user"]["id"], id.to_string());
        assert_eq!(body["user"]["email"], "alice@x.com");
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_me_without_token() {
        let app = app(test_state());

        let response = make_request(None, app, Method::GET, "/me", String::default()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_with_tampered_token() {
        let app = app(test_state());
        register(&app, "alice", "alice@x.com", "pw1").await;
        let token = login(&app, "alice@x.com", "pw1").await;

        // Forge the payload while keeping the original signature.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}x", parts[1]);
        parts[1] = &forged;
        let tampered = parts.join(".");

        let response =
            make_request(Some(&tampered), app, Method::GET, "/me", String::default()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_with_unknown_user() {
        let state = test_state();
        let app = app(state.clone());
        let token = state
            .token
            .create(&user::Identity {
                id: UserId::new(),
                name: "ghost".into(),
            })
            .unwrap();

        let response = make_request(Some(&token), app, Method::GET, "/me", String::default()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
