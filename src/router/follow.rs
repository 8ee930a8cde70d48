//! Follow and unfollow another developer.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::follow::{Edge, Relationship};
use crate::router::Valid;
use crate::user::{Identity, User, UserId};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    pub follower_user_id: UserId,
    pub followed_user_id: UserId,
}

impl From<Body> for Edge {
    fn from(body: Body) -> Self {
        Self {
            follower: body.follower_user_id,
            followed: body.followed_user_id,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub followed_user: User,
    pub follower_user: User,
}

impl From<Relationship> for Response {
    fn from(relationship: Relationship) -> Self {
        Self {
            followed_user: relationship.followed,
            follower_user: relationship.follower,
        }
    }
}

/// `POST /addFollower`.
pub async fn add(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let relationship = state.follows.add_follower(&identity, body.into()).await?;

    Ok(Json(relationship.into()))
}

/// `POST /removeFollower`.
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let relationship = state.follows.remove_follower(&identity, body.into()).await?;

    Ok(Json(relationship.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::*;

    #[tokio::test]
    async fn test_follow_scenario() {
        let app = app(test_state());
        let alice = register(&app, "alice", "alice@x.com", "pw1").await;
        let bob = register(&app, "bob", "bob@x.com", "pw2").await;
        let token = login(&app, "alice@x.com", "pw1").await;
        let body = json!({ "follower_user_id": alice, "followed_user_id": bob }).to_string();

        let response = make_request(
            Some(&token),
            app.clone(),
            Method::POST,
            "/addFollower",
            body.clone(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let added = body_json(response).await;
        assert_eq!(added["followed_user"]["followers"], json!([alice]));
        assert_eq!(added["follower_user"]["followings"], json!([bob]));
        assert!(added["followed_user"].get("password").is_none());

        // Following again changes nothing.
        let response = make_request(
            Some(&token),
            app.clone(),
            Method::POST,
            "/addFollower",
            body.clone(),
        )
        .await;
        assert_eq!(body_json(response).await, added);

        let response =
            make_request(Some(&token), app, Method::POST, "/removeFollower", body).await;
        assert_eq!(response.status(), StatusCode::OK);
        let removed = body_json(response).await;
        assert_eq!(removed["followed_user"]["followers"], json!([]));
        assert_eq!(removed["follower_user"]["followings"], json!([]));
    }

    #[tokio::test]
    async fn test_follow_requires_token() {
        let app = app(test_state());
        let body = json!({
            "follower_user_id": user::UserId::new(),
            "followed_user_id": user::UserId::new(),
        });

        let response =
            make_request(None, app, Method::POST, "/addFollower", body.to_string()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_follow_on_behalf_of_another_user() {
        let app = app(test_state());
        let alice = register(&app, "alice", "alice@x.com", "pw1").await;
        let bob = register(&app, "bob", "bob@x.com", "pw2").await;
        let token = login(&app, "bob@x.com", "pw2").await;

        let body = json!({ "follower_user_id": alice, "followed_user_id": bob });
        let response =
            make_request(Some(&token), app, Method::POST, "/addFollower", body.to_string()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let app = app(test_state());
        let alice = register(&app, "alice", "alice@x.com", "pw1").await;
        let token = login(&app, "alice@x.com", "pw1").await;

        let body = json!({ "follower_user_id": alice, "followed_user_id": user::UserId::new() });
        let response = make_request(
            Some(&token),
            app.clone(),
            Method::POST,
            "/addFollower",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(Some(&token), app, Method::GET, "/me", String::default()).await;
        assert_eq!(body_json(response).await["user"]["followings"], json!([]));
    }

    #[tokio::test]
    async fn test_follow_malformed_id() {
        let app = app(test_state());
        let alice = register(&app, "alice", "alice@x.com", "pw1").await;
        let token = login(&app, "alice@x.com", "pw1").await;

        let body = json!({ "follower_user_id": alice, "followed_user_id": "bob" });
        let response =
            make_request(Some(&token), app, Method::POST, "/addFollower", body.to_string()).await;

        assert!(response.status().is_client_error());
    }
}
