//! Demo backend serving one in-memory resource collection.
//!
//! Run one process per resource, e.g. `crud-backend --resource users --port 3001`
//! and `crud-backend --resource products --port 3002`, then point the
//! gateway's default backends at them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crud-backend")]
#[command(about = "In-memory CRUD service for exercising the gateway", long_about = None)]
struct Args {
    /// Collection name, also the route prefix (`/<resource>`)
    #[arg(short, long, default_value = "users")]
    resource: String,

    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,
}

/// Record storage keyed by numeric id.
trait Store: Send + Sync + 'static {
    fn get(&self, id: u64) -> Option<Value>;
    /// All records, ordered by id.
    fn list(&self) -> Vec<Value>;
    fn put(&self, id: u64, record: Value);
    /// Returns whether a record was removed.
    fn delete(&self, id: u64) -> bool;
    fn next_id(&self) -> u64;
}

#[derive(Default)]
struct MemoryStore {
    records: DashMap<u64, Value>,
    sequence: AtomicU64,
}

impl Store for MemoryStore {
    fn get(&self, id: u64) -> Option<Value> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    fn list(&self) -> Vec<Value> {
        let mut entries: Vec<(u64, Value)> = self
            .records
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, v)| v).collect()
    }

    fn put(&self, id: u64, record: Value) {
        self.records.insert(id, record);
    }

    fn delete(&self, id: u64) -> bool {
        self.records.remove(&id).is_some()
    }

    fn next_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    noun: Arc<str>,
}

impl AppState {
    fn new(resource: &str, store: Arc<dyn Store>) -> Self {
        Self {
            store,
            noun: noun_for(resource).into(),
        }
    }

    fn not_found(&self) -> Response {
        let message = format!("{} not found", self.noun);
        (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
    }
}

/// `users` → `User`.
fn noun_for(resource: &str) -> String {
    let singular = resource.strip_suffix('s').unwrap_or(resource);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Record".to_string(),
    }
}

/// Object fields of `body` with `id` set; non-object bodies contribute nothing.
fn with_id(id: u64, body: Value) -> Value {
    let mut fields = match body {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.insert("id".to_string(), json!(id));
    Value::Object(fields)
}

fn app(resource: &str, store: Arc<dyn Store>) -> Router {
    let collection = format!("/{}", resource);
    let item = format!("/{}/{{id}}", resource);

    Router::new()
        .route(&collection, get(list_records).post(create_record))
        .route(
            &item,
            get(get_record)
                .put(replace_record)
                .patch(merge_record)
                .delete(delete_record),
        )
        .with_state(AppState::new(resource, store))
}

async fn list_records(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.store.list())
}

async fn get_record(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.store.get(id) {
        Some(record) => Json(record).into_response(),
        None => state.not_found(),
    }
}

async fn create_record(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let id = state.store.next_id();
    let record = with_id(id, body);
    state.store.put(id, record.clone());
    tracing::debug!(id, "Record created");
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn replace_record(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if state.store.get(id).is_none() {
        return state.not_found();
    }
    let record = with_id(id, body);
    state.store.put(id, record.clone());
    Json(record).into_response()
}

async fn merge_record(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    let Some(Value::Object(mut fields)) = state.store.get(id) else {
        return state.not_found();
    };
    if let Value::Object(patch) = body {
        fields.extend(patch);
    }
    let record = with_id(id, Value::Object(fields));
    state.store.put(id, record.clone());
    Json(record).into_response()
}

async fn delete_record(State(state): State<AppState>, Path(id): Path<u64>) -> StatusCode {
    if state.store.delete(id) {
        tracing::debug!(id, "Record deleted");
    }
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crud_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    tracing::info!(
        resource = %args.resource,
        address = %listener.local_addr()?,
        "Backend listening"
    );

    let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
    axum::serve(listener, app(&args.resource, store)).await?;
    Ok(())
}
