//! In-memory implementation of the geodata service.
//!
//! Records live in a map from id to serialized feature for as long as the
//! process runs. Updates are full replacements, so two clients editing the same
//! record end up with whichever write arrived last.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Router,
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use geo_utils::{
    GEODATA_PATH, Record,
    codec::parse_feature,
    record::{Action, GeodataRequest},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone, Default)]
pub struct GeodataState {
    records: Arc<Mutex<BTreeMap<String, String>>>,
}

impl GeodataState {
    fn records(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // map operations never panic midway, so a poisoned map is still consistent
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

pub fn app(state: GeodataState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/", get(|| async { "geodata service" }))
        .route(GEODATA_PATH, get(list_records).post(create_record))
        .route(
            &format!("{GEODATA_PATH}/{{id}}"),
            put(edit_record).delete(delete_record),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn list_records(State(state): State<GeodataState>) -> Json<Vec<Record>> {
    let records = state
        .records()
        .iter()
        .map(|(id, data)| Record {
            id: id.clone(),
            data: data.clone(),
        })
        .collect();
    Json(records)
}

async fn create_record(
    State(state): State<GeodataState>,
    Json(request): Json<GeodataRequest>,
) -> Result<(StatusCode, Json<Record>), StatusCode> {
    check_request(&request, Action::Create)?;

    let id = uuid::Uuid::new_v4().to_string();
    state.records().insert(id.clone(), request.data.clone());
    log::info!("Created record {id}");

    Ok((
        StatusCode::CREATED,
        Json(Record {
            id,
            data: request.data,
        }),
    ))
}

async fn edit_record(
    State(state): State<GeodataState>,
    Path(id): Path<String>,
    Json(request): Json<GeodataRequest>,
) -> Result<Json<Record>, StatusCode> {
    check_request(&request, Action::Edit)?;

    let mut records = state.records();
    let Some(data) = records.get_mut(&id) else {
        log::warn!("Edit for unknown record {id}");
        return Err(StatusCode::NOT_FOUND);
    };
    data.clone_from(&request.data);
    log::info!("Replaced record {id}");

    Ok(Json(Record {
        id,
        data: request.data,
    }))
}

async fn delete_record(
    State(state): State<GeodataState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    if state.records().remove(&id).is_none() {
        log::warn!("Delete for unknown record {id}");
        return Err(StatusCode::NOT_FOUND);
    }
    log::info!("Deleted record {id}");
    Ok(StatusCode::OK)
}

fn check_request(request: &GeodataRequest, expected: Action) -> Result<(), StatusCode> {
    if request.action != expected {
        log::warn!("Expected {expected:?} action, got {:?}", request.action);
        return Err(StatusCode::BAD_REQUEST);
    }
    parse_feature(&request.data).map_err(|e| {
        log::warn!("Rejected feature: {e}");
        StatusCode::BAD_REQUEST
    })?;
    Ok(())
}
