//! Developer directory.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::user::Profile;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub users: Vec<Profile>,
}

pub async fn handler(State(state): State<AppState>) -> Result<Json<Response>> {
    let users = state
        .users
        .directory()
        .await?
        .into_iter()
        .map(Profile::from)
        .collect();

    Ok(Json(Response { users }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::*;

    #[tokio::test]
    async fn test_directory_reflects_follows() {
        let app = app(test_state());
        let alice = register(&app, "alice", "alice@x.com", "pw1").await;
        let bob = register(&app, "bob", "bob@x.com", "pw2").await;
        let token = login(&app, "alice@x.com", "pw1").await;

        let body = json!({ "follower_user_id": alice, "followed_user_id": bob });
        make_request(
            Some(&token),
            app.clone(),
            Method::POST,
            "/addFollower",
            body.to_string(),
        )
        .await;

        let response = make_request(Some(&token), app, Method::GET, "/users", String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let raw = body_json(response).await;
        assert!(raw["users"][0].get("email").is_none());

        let body: Response = serde_json::from_value(raw).unwrap();
        assert_eq!(body.users.len(), 2);
        let bob = body.users.iter().find(|u| u.id == bob).unwrap();
        assert_eq!(bob.followers, vec![alice]);
    }
}
