use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::NewUser;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(
        length(min = 1, max = 50, message = "Name must be 1 to 50 characters long."),
        custom(function = "crate::router::validate_name", message = "Name must not be blank.")
    )]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Password must be 1 to 255 characters long."))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub msg: String,
}

/// Handler to register a user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    state
        .users
        .register(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            msg: "Registration is successful.".into(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::*;

    #[tokio::test]
    async fn test_register_handler() {
        let state = test_state();
        let app = app(state);

        let body = json!({ "name": "alice", "email": "alice@x.com", "password": "pw1" });
        let response = make_request(None, app, Method::POST, "/register", body.to_string()).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "Registration is successful.");
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let state = test_state();
        let app = app(state);

        let body = json!({ "name": "alice", "email": "alice@x.com", "password": "pw1" }).to_string();
        let first = make_request(None, app.clone(), Method::POST, "/register", body.clone()).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = make_request(None, app, Method::POST, "/register", body).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_blank_name() {
        let app = app(test_state());

        let body = json!({ "name": "   ", "email": "alice@x.com", "password": "pw1" });
        let response = make_request(None, app, Method::POST, "/register", body.to_string()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "name");
        assert_eq!(body["errors"][0]["message"], "Name must not be blank.");
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        let app = app(test_state());

        let body = json!({ "name": "alice", "email": "not-an-email", "password": "pw1" });
        let response = make_request(None, app, Method::POST, "/register", body.to_string()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "email");
    }
}
