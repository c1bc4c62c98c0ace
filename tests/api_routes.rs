use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use stock_demo::api::{routes, AppState, SignInResponse};
use stock_demo::error::{LedgerError, LedgerResult};
use stock_demo::gateway::{Gateway, InMemoryGateway};
use stock_demo::ledger::Ledger;
use stock_demo::market::{default_markets, FixedQuotes};
use stock_demo::models::{Account, AccountId, AccountView};
use warp::http::StatusCode;
use warp::test::request;

const SECRET: &str = "test-secret";

fn state() -> Arc<AppState> {
    Arc::new(AppState {
        ledger: Ledger::new(Arc::new(InMemoryGateway::new())),
        quotes: Arc::new(FixedQuotes::new().with_price("AAPL", dec!(10))),
        markets: default_markets(),
        jwt_secret: SECRET.to_string(),
        token_ttl_secs: 3600,
    })
}

struct OfflineStore;

fn offline() -> LedgerError {
    LedgerError::Storage("store offline".into())
}

#[async_trait]
impl Gateway for OfflineStore {
    async fn get_by_name(&self, _name: &str) -> LedgerResult<Option<Account>> {
        Err(offline())
    }

    async fn get_by_id(&self, _id: AccountId) -> LedgerResult<Option<Account>> {
        Err(offline())
    }

    async fn create(&self, _name: &str, _password_hash: &str) -> LedgerResult<Account> {
        Err(offline())
    }

    async fn update(&self, _account: &Account) -> LedgerResult<()> {
        Err(offline())
    }

    async fn delete(&self, _name: &str) -> LedgerResult<()> {
        Err(offline())
    }
}

fn creds(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

fn pair(body: &[u8]) -> (u16, String) {
    serde_json::from_slice(body).unwrap()
}

async fn sign_up_and_in(state: &Arc<AppState>, name: &str) -> SignInResponse {
    let api = routes(state.clone());
    let res = request()
        .method("POST")
        .path("/signup")
        .json(&creds(name, "pw"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = request()
        .method("POST")
        .path("/signin")
        .json(&creds(name, "pw"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn sign_up_and_sign_in_return_status_pairs() {
    let state = state();
    let api = routes(state.clone());

    let res = request()
        .method("POST")
        .path("/signup")
        .json(&creds("alice", "pw"))
        .reply(&api)
        .await;
    assert_eq!(pair(res.body()), (200, "user created".to_string()));

    let res = request()
        .method("POST")
        .path("/signup")
        .json(&creds("alice", "other"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(pair(res.body()), (400, "user already exists".to_string()));

    let res = request()
        .method("POST")
        .path("/signin")
        .json(&creds("alice", "pw"))
        .reply(&api)
        .await;
    let body: SignInResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.status, (200, "signin successful".to_string()));
    assert_eq!(body.user.name, "alice");
    assert!(!body.token.is_empty());
}

#[tokio::test]
async fn sign_in_failures_map_to_404_and_401() {
    let state = state();
    sign_up_and_in(&state, "alice").await;
    let api = routes(state);

    let res = request()
        .method("POST")
        .path("/signin")
        .json(&creds("ghost", "pw"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(pair(res.body()), (404, "user not found".to_string()));

    let res = request()
        .method("POST")
        .path("/signin")
        .json(&creds("alice", "wrong"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(pair(res.body()), (401, "password is incorrect".to_string()));
}

#[tokio::test]
async fn buy_uses_quote_and_returns_updated_view() {
    let state = state();
    let session = sign_up_and_in(&state, "alice").await;
    let api = routes(state);

    let res = request()
        .method("POST")
        .path("/market/buy?symbol=AAPL&quantity=3")
        .header("authorization", format!("Bearer {}", session.token))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let view: AccountView = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(view.balance, dec!(-105));
    assert_eq!(view.transactions.len(), 1);
    assert_eq!(view.transactions[0].symbol, "AAPL");
    assert_eq!(view.transactions[0].price, dec!(10));

    let raw: Value = serde_json::from_slice(res.body()).unwrap();
    assert!(raw.get("passwordHash").is_none());
    assert_eq!(raw["transactions"][0]["type"], "buy");
}

#[tokio::test]
async fn buy_rejects_missing_token_and_zero_quantity() {
    let state = state();
    let session = sign_up_and_in(&state, "alice").await;
    let api = routes(state);

    let res = request()
        .method("POST")
        .path("/market/buy?symbol=AAPL&quantity=1")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = request()
        .method("POST")
        .path("/market/buy?symbol=AAPL&quantity=0")
        .header("authorization", format!("Bearer {}", session.token))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = request()
        .method("POST")
        .path("/market/buy?symbol=TSLA&quantity=1")
        .header("authorization", format!("Bearer {}", session.token))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn token_of_deleted_user_is_refused() {
    let state = state();
    let session = sign_up_and_in(&state, "alice").await;
    let api = routes(state);

    let res = request()
        .method("DELETE")
        .path("/user")
        .json(&creds("alice", "pw"))
        .reply(&api)
        .await;
    assert_eq!(pair(res.body()), (200, "user deleted".to_string()));

    let res = request()
        .method("GET")
        .path("/user")
        .header("authorization", format!("Bearer {}", session.token))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = request()
        .method("POST")
        .path("/signin")
        .json(&creds("alice", "pw"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorite_stock_round_trips_through_profile() {
    let state = state();
    let session = sign_up_and_in(&state, "alice").await;
    let api = routes(state);
    let bearer = format!("Bearer {}", session.token);

    let res = request()
        .method("PUT")
        .path("/user/favorite")
        .header("authorization", bearer.as_str())
        .json(&json!({ "favoriteStock": "MSFT" }))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = request()
        .method("GET")
        .path("/user")
        .header("authorization", bearer.as_str())
        .reply(&api)
        .await;
    let view: AccountView = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(view.favorite_stock.as_deref(), Some("MSFT"));
}

#[tokio::test]
async fn markets_search_filters_catalogue() {
    let api = routes(state());

    let res = request().method("GET").path("/markets").reply(&api).await;
    let all: Vec<Value> = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(all.len(), 5);

    let res = request()
        .method("GET")
        .path("/markets?search=apple")
        .reply(&api)
        .await;
    let found: Vec<Value> = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(found, vec![json!({ "symbol": "AAPL", "name": "Apple Inc." })]);
}

#[tokio::test]
async fn unknown_route_is_404_pair() {
    let api = routes(state());

    let res = request().method("GET").path("/nowhere").reply(&api).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(pair(res.body()).0, 404);
}

#[tokio::test]
async fn store_failure_renders_500_pair() {
    let state = Arc::new(AppState {
        ledger: Ledger::new(Arc::new(OfflineStore)),
        quotes: Arc::new(FixedQuotes::new()),
        markets: default_markets(),
        jwt_secret: SECRET.to_string(),
        token_ttl_secs: 3600,
    });
    let api = routes(state);

    for path in ["/signup", "/signin"] {
        let res = request()
            .method("POST")
            .path(path)
            .json(&creds("alice", "pw"))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let (code, message) = pair(res.body());
        assert_eq!(code, 500);
        assert!(message.contains("store offline"));
    }
}
