use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Lifetime of tokens issued by the password flows, in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub created: Value,
    pub expiry: Value,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenGrant {
    pub token: String,
}

#[derive(Deserialize)]
pub struct FirebaseGrant {
    pub token: String,
    pub token_expiry: i64,
    #[serde(default)]
    pub options: Option<BTreeMap<String, String>>,
}

struct User {
    password: String,
    email: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: RwLock<HashMap<String, User>>,
    refresh_tokens: RwLock<HashSet<String>>,
    issued: AtomicUsize,
}

/// Shared server state. Cloning shares the same users and counters.
#[derive(Clone, Default)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens issued by any auth route so far.
    pub fn tokens_issued(&self) -> usize {
        self.inner.issued.load(Ordering::SeqCst)
    }

    /// Email recorded when `username` registered, if any.
    pub async fn email_of(&self, username: &str) -> Option<String> {
        self.inner
            .users
            .read()
            .await
            .get(username)
            .and_then(|user| user.email.clone())
    }

    async fn issue(&self, ttl: i64, as_strings: bool) -> Token {
        let created = chrono::Utc::now().timestamp();
        let expiry = created + ttl;
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        self.inner
            .refresh_tokens
            .write()
            .await
            .insert(refresh_token.clone());
        self.inner.issued.fetch_add(1, Ordering::SeqCst);

        let (created, expiry) = if as_strings {
            (json!(created.to_string()), json!(expiry.to_string()))
        } else {
            (json!(created), json!(expiry))
        };
        Token {
            access_token: format!("access-{}", Uuid::new_v4()),
            refresh_token,
            created,
            expiry,
        }
    }
}

type ApiResult = Result<(StatusCode, Json<Token>), (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/{provider}", post(third_party))
        .route("/sidecar/firebase/auth/token", post(firebase))
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/numbers", get(numbers))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn register(State(state): State<AppState>, Json(input): Json<Registration>) -> ApiResult {
    if input.username.is_empty() || input.password.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "username and password are required"));
    }
    {
        let mut users = state.inner.users.write().await;
        if users.contains_key(&input.username) {
            return Err(reject(StatusCode::CONFLICT, "user already exists"));
        }
        users.insert(
            input.username,
            User {
                password: input.password,
                email: input.email,
            },
        );
    }
    Ok((StatusCode::CREATED, Json(state.issue(TOKEN_TTL_SECS, false).await)))
}

async fn login(State(state): State<AppState>, Json(input): Json<Credentials>) -> ApiResult {
    let authorized = state
        .inner
        .users
        .read()
        .await
        .get(&input.username)
        .is_some_and(|user| user.password == input.password);
    if !authorized {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    Ok((StatusCode::OK, Json(state.issue(TOKEN_TTL_SECS, false).await)))
}

async fn refresh(State(state): State<AppState>, Json(input): Json<TokenGrant>) -> ApiResult {
    let known = state.inner.refresh_tokens.write().await.remove(&input.token);
    if !known {
        return Err(reject(StatusCode::UNAUTHORIZED, "unknown refresh token"));
    }
    Ok((StatusCode::OK, Json(state.issue(TOKEN_TTL_SECS, false).await)))
}

async fn third_party(
    State(state): State<AppState>,
    Path(_provider): Path<String>,
    Json(input): Json<TokenGrant>,
) -> ApiResult {
    if input.token.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "token is required"));
    }
    Ok((StatusCode::OK, Json(state.issue(TOKEN_TTL_SECS, false).await)))
}

/// Issues a token living `token_expiry` seconds, with timestamps rendered as
/// numeric strings.
async fn firebase(State(state): State<AppState>, Json(input): Json<FirebaseGrant>) -> ApiResult {
    if input.token.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "token is required"));
    }
    Ok((StatusCode::OK, Json(state.issue(input.token_expiry, true).await)))
}

async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let custom: BTreeMap<String, String> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-"))
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    Json(json!({
        "message": "echo",
        "method": method.as_str(),
        "query": query,
        "headers": custom,
        "content_type": content_type,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({ "message": format!("status {code}") }))))
}

async fn numbers() -> Json<Vec<u32>> {
    Json(vec![1, 2, 3])
}
