// src/api.rs
use crate::auth::{create_token, verify_token};
use crate::error::ApiError;
use crate::ledger::{Ledger, DELETE_OK, SIGNIN_OK, SIGNUP_OK};
use crate::market::{search, QuoteSource};
use crate::models::{AccountId, AccountView, Market};
use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub struct AppState {
    pub ledger: Ledger,
    pub quotes: Arc<dyn QuoteSource>,
    pub markets: Vec<Market>,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub favorite_stock: String,
}

#[derive(Deserialize)]
pub struct BuyQuery {
    pub symbol: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MarketQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Serialize, Deserialize)]
pub struct SignInResponse {
    pub status: (u16, String),
    pub user: AccountView,
    pub token: String,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let sign_in = warp::path("signin")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(credentials())
        .and_then(sign_in_handler);

    let sign_up = warp::path("signup")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(credentials())
        .and_then(sign_up_handler);

    let delete = warp::path("user")
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(credentials())
        .and_then(delete_handler);

    let profile = warp::path("user")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_account(state.clone()))
        .and_then(profile_handler);

    let favorite = warp::path!("user" / "favorite")
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_account(state.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and_then(favorite_handler);

    let markets = warp::path("markets")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<MarketQuery>())
        .and_then(markets_handler);

    let buy = warp::path!("market" / "buy")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_account(state))
        .and(warp::query::<BuyQuery>())
        .and_then(buy_handler);

    sign_in
        .or(sign_up)
        .or(delete)
        .or(profile)
        .or(favorite)
        .or(markets)
        .or(buy)
        .recover(handle_rejection)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn credentials() -> impl Filter<Extract = (Credentials,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Resolves the bearer token to an account id that still names a live user.
fn with_account(
    state: Arc<AppState>,
) -> impl Filter<Extract = (AccountId,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(authorize)
}

async fn authorize(header: Option<String>, state: Arc<AppState>) -> Result<AccountId, Rejection> {
    let token = header
        .as_deref()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| warp::reject::custom(ApiError::unauthorized("missing bearer token")))?;
    let claims = verify_token(token.trim(), &state.jwt_secret)
        .map_err(|_| warp::reject::custom(ApiError::unauthorized("invalid token")))?;
    let id = claims
        .account_id()
        .map_err(|_| warp::reject::custom(ApiError::unauthorized("invalid token")))?;

    if !state.ledger.exists(id, &claims.name).await {
        return Err(warp::reject::custom(ApiError::unauthorized("unknown user")));
    }
    Ok(id)
}

fn status_pair(status: StatusCode, message: &str) -> impl Reply {
    warp::reply::with_status(
        warp::reply::json(&(status.as_u16(), message)),
        status,
    )
}

async fn sign_in_handler(
    state: Arc<AppState>,
    creds: Credentials,
) -> Result<impl Reply, Rejection> {
    let account = state
        .ledger
        .sign_in(&creds.username, &creds.password)
        .await
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;
    let token = create_token(&account, &state.jwt_secret, state.token_ttl_secs)
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    Ok(warp::reply::json(&SignInResponse {
        status: (StatusCode::OK.as_u16(), SIGNIN_OK.to_string()),
        user: account.view(),
        token,
    }))
}

async fn sign_up_handler(
    state: Arc<AppState>,
    creds: Credentials,
) -> Result<impl Reply, Rejection> {
    match state.ledger.sign_up(&creds.username, &creds.password).await {
        Ok(()) => Ok(status_pair(StatusCode::OK, SIGNUP_OK)),
        Err(e) => Err(warp::reject::custom(ApiError::from(e))),
    }
}

async fn delete_handler(
    state: Arc<AppState>,
    creds: Credentials,
) -> Result<impl Reply, Rejection> {
    match state.ledger.delete(&creds.username, &creds.password).await {
        Ok(()) => Ok(status_pair(StatusCode::OK, DELETE_OK)),
        Err(e) => Err(warp::reject::custom(ApiError::from(e))),
    }
}

async fn profile_handler(state: Arc<AppState>, id: AccountId) -> Result<impl Reply, Rejection> {
    match state.ledger.account(id).await {
        Ok(account) => Ok(warp::reply::json(&account.view())),
        Err(e) => Err(warp::reject::custom(ApiError::from(e))),
    }
}

async fn favorite_handler(
    state: Arc<AppState>,
    id: AccountId,
    body: FavoriteRequest,
) -> Result<impl Reply, Rejection> {
    match state
        .ledger
        .update_favorite_stock(id, &body.favorite_stock)
        .await
    {
        Ok(account) => Ok(warp::reply::json(&account.view())),
        Err(e) => Err(warp::reject::custom(ApiError::from(e))),
    }
}

async fn markets_handler(
    state: Arc<AppState>,
    query: MarketQuery,
) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&search(&state.markets, &query.search)))
}

async fn buy_handler(
    state: Arc<AppState>,
    id: AccountId,
    order: BuyQuery,
) -> Result<impl Reply, Rejection> {
    let price = state
        .quotes
        .latest_price(&order.symbol)
        .await
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    match state
        .ledger
        .buy(id, &order.symbol, order.quantity, price, Utc::now())
        .await
    {
        Ok(account) => Ok(warp::reply::json(&account.view())),
        Err(e) => {
            error!("Buy of {} {} failed: {}", order.quantity, order.symbol, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<ApiError>() {
        (e.status, e.message.clone())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some()
        || err
            .find::<warp::filters::body::BodyDeserializeError>()
            .is_some()
    {
        (StatusCode::BAD_REQUEST, "malformed request".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    info!("Request rejected with {}: {}", status, message);
    Ok(status_pair(status, &message))
}
