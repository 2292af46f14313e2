use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const APPLICATION_ID: &str = "mock-app-id";
pub const REST_API_KEY: &str = "mock-rest-key";

const OBJECT_NOT_FOUND: i64 = 101;
const INVALID_JSON: i64 = 107;

/// Stored objects keyed by class name, then by object id.
pub type Db = Arc<RwLock<HashMap<String, HashMap<String, Map<String, Value>>>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    application_id: Arc<str>,
    rest_api_key: Arc<str>,
}

type ApiResponse = (StatusCode, Json<Value>);

/// Router accepting the default mock credentials.
pub fn app() -> Router {
    app_with_credentials(APPLICATION_ID, REST_API_KEY)
}

pub fn app_with_credentials(application_id: &str, rest_api_key: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        application_id: application_id.into(),
        rest_api_key: rest_api_key.into(),
    };
    Router::new()
        .route("/1/classes/{class}", get(query_objects).post(create_object))
        .route("/1/classes/{class}/{id}", put(update_object).delete(delete_object))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiResponse> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header("X-Parse-Application-Id") == Some(&*state.application_id)
        && header("X-Parse-REST-API-Key") == Some(&*state.rest_api_key)
    {
        return Ok(());
    }
    tracing::debug!("rejecting request with bad credentials");
    Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))))
}

fn backend_error(status: StatusCode, code: i64, message: &str) -> ApiResponse {
    (status, Json(json!({"code": code, "error": message})))
}

fn not_found() -> ApiResponse {
    backend_error(StatusCode::NOT_FOUND, OBJECT_NOT_FOUND, "Object not found.")
}

/// Ten alphanumeric characters, the shape of a backend object id.
fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

async fn query_objects(
    State(state): State<AppState>,
    Path(class): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<ApiResponse, ApiResponse> {
    authorize(&state, &headers)?;
    let constraints = match params.get("where") {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(constraints)) => constraints,
            _ => {
                return Err(backend_error(
                    StatusCode::BAD_REQUEST,
                    INVALID_JSON,
                    "invalid JSON",
                ))
            }
        },
        None => Map::new(),
    };

    let db = state.db.read().await;
    let mut results: Vec<&Map<String, Value>> = db
        .get(&class)
        .map(|objects| {
            objects
                .values()
                .filter(|object| matches_where(object, &constraints))
                .collect()
        })
        .unwrap_or_default();
    // Stable order so repeated queries agree.
    results.sort_by(|a, b| {
        let id = |object: &Map<String, Value>| object.get("objectId").and_then(Value::as_str).map(str::to_owned);
        id(a).cmp(&id(b))
    });

    Ok((StatusCode::OK, Json(json!({ "results": results }))))
}

async fn create_object(
    State(state): State<AppState>,
    Path(class): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<ApiResponse, ApiResponse> {
    authorize(&state, &headers)?;
    let Value::Object(mut object) = body else {
        return Err(backend_error(
            StatusCode::BAD_REQUEST,
            INVALID_JSON,
            "invalid JSON",
        ));
    };

    let id = new_object_id();
    object.insert("objectId".to_string(), Value::String(id.clone()));
    state
        .db
        .write()
        .await
        .entry(class.clone())
        .or_default()
        .insert(id.clone(), object);
    tracing::info!(%class, %id, "created object");

    Ok((StatusCode::CREATED, Json(json!({ "objectId": id }))))
}

async fn update_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(changes): Json<Map<String, Value>>,
) -> Result<ApiResponse, ApiResponse> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    let object = db
        .get_mut(&class)
        .and_then(|objects| objects.get_mut(&id))
        .ok_or_else(not_found)?;
    for (key, value) in changes {
        if key != "objectId" {
            object.insert(key, value);
        }
    }
    Ok((StatusCode::OK, Json(json!({}))))
}

async fn delete_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<ApiResponse, ApiResponse> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    db.get_mut(&class)
        .and_then(|objects| objects.remove(&id))
        .ok_or_else(not_found)?;
    tracing::info!(%class, %id, "deleted object");
    Ok((StatusCode::OK, Json(json!({}))))
}

/// Whether `object` satisfies every constraint of a `where` document.
///
/// Plain values match by equality. Objects whose keys start with `$` are
/// comparison operators (`$gt`, `$gte`, `$lt`, `$lte`, `$ne`) on numbers.
pub fn matches_where(object: &Map<String, Value>, constraints: &Map<String, Value>) -> bool {
    constraints.iter().all(|(field, constraint)| {
        let actual = object.get(field);
        match constraint {
            Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, expected)| compare(op, actual, expected))
            }
            expected => actual == Some(expected),
        }
    })
}

fn compare(op: &str, actual: Option<&Value>, expected: &Value) -> bool {
    if op == "$ne" {
        return actual != Some(expected);
    }
    let (Some(actual), Some(expected)) = (actual.and_then(Value::as_f64), expected.as_f64()) else {
        return false;
    };
    match op {
        "$gt" => actual > expected,
        "$gte" => actual >= expected,
        "$lt" => actual < expected,
        "$lte" => actual <= expected,
        _ => false,
    }
}
