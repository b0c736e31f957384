//! Handler tests for the votes domain
//!
//! Drive the votes router with `oneshot` over the in-memory store:
//! - status codes for like / dislike / revoke / rating
//! - JWT enforcement on the write routes
//! - error bodies and the Retry-After header on cooldown

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_helpers::{JwtAuth, JwtConfig};
use domain_votes::*;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const SECRET: &str = "handler-test-secret-with-at-least-32-chars";

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

struct TestApp {
    auth: JwtAuth,
    app: Router,
}

impl TestApp {
    async fn new(users: &[Uuid]) -> Self {
        let store = InMemoryVoteStore::new();
        for id in users {
            store.register_user(*id).await;
        }
        let auth = JwtAuth::new(&JwtConfig::new(SECRET).unwrap());
        let service = VoteService::new(store, VoteConfig::default());
        let app = handlers::router(service, auth.clone());
        Self { auth, app }
    }

    fn token_for(&self, user_id: Uuid) -> String {
        self.auth
            .create_token(user_id, "voter@example.com", "user")
            .unwrap()
            .token
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn vote(&self, voter: Uuid, target: &str, action: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/{}", target, action))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(voter)))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn test_like_returns_201_with_receipt() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    let response = app.vote(voter, &target.to_string(), "like").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let receipt: VoteReceipt = json_body(response.into_body()).await;
    assert_eq!(receipt.voter_id, voter);
    assert_eq!(receipt.target_id, target);
    assert_eq!(receipt.value, 1);
    assert_eq!(receipt.rating, 1);
}

#[tokio::test]
async fn test_dislike_returns_negative_rating() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    let response = app.vote(voter, &target.to_string(), "dislike").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let receipt: VoteReceipt = json_body(response.into_body()).await;
    assert_eq!(receipt.value, -1);
    assert_eq!(receipt.rating, -1);
}

#[tokio::test]
async fn test_vote_without_token_returns_401() {
    let target = Uuid::now_v7();
    let app = TestApp::new(&[target]).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/like", target))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_with_forged_token_returns_401() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    let other = JwtAuth::new(&JwtConfig::new("some-other-secret-that-is-32-chars-long").unwrap());
    let token = other.create_token(voter, "voter@example.com", "user").unwrap().token;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/like", target))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_self_vote_returns_400() {
    let voter = Uuid::now_v7();
    let app = TestApp::new(&[voter]).await;

    let response = app.vote(voter, &voter.to_string(), "like").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "You cannot vote for yourself");
}

#[tokio::test]
async fn test_invalid_uuid_returns_400() {
    let voter = Uuid::now_v7();
    let app = TestApp::new(&[voter]).await;

    let response = app.vote(voter, "not-a-uuid", "like").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_target_returns_404() {
    let voter = Uuid::now_v7();
    let app = TestApp::new(&[voter]).await;

    let response = app.vote(voter, &Uuid::now_v7().to_string(), "like").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_vote_inside_cooldown_returns_429() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    let first = app.vote(voter, &target.to_string(), "like").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.vote(voter, &target.to_string(), "dislike").await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = second
        .headers()
        .get(header::RETRY_AFTER)
        .expect("Retry-After header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 3600);

    let body: Value = json_body(second.into_body()).await;
    assert_eq!(body["error"], "RATE_LIMITED");
    assert_eq!(body["details"]["retry_after_secs"], retry_after);
}

#[tokio::test]
async fn test_revoke_returns_200_and_resets_rating() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    app.vote(voter, &target.to_string(), "like").await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}/vote", target))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token_for(voter)))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let receipt: RevokeReceipt = json_body(response.into_body()).await;
    assert_eq!(receipt.target_id, target);
    assert_eq!(receipt.rating, 0);
}

#[tokio::test]
async fn test_revoke_without_vote_returns_404() {
    let (voter, target) = (Uuid::now_v7(), Uuid::now_v7());
    let app = TestApp::new(&[voter, target]).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}/vote", target))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token_for(voter)))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Vote not found");
}

#[tokio::test]
async fn test_rating_is_public() {
    let voters: Vec<Uuid> = (0..3).map(|_| Uuid::now_v7()).collect();
    let target = Uuid::now_v7();
    let mut everyone = voters.clone();
    everyone.push(target);
    let app = TestApp::new(&everyone).await;

    for voter in &voters {
        let response = app.vote(*voter, &target.to_string(), "like").await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}/rating", target))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let rating: RatingResponse = json_body(response.into_body()).await;
    assert_eq!(rating.user_id, target);
    assert_eq!(rating.rating, 3);
}

#[tokio::test]
async fn test_rating_of_unknown_user_returns_404() {
    let app = TestApp::new(&[]).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}/rating", Uuid::now_v7()))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
