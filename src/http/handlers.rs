//! Item CRUD handlers.
//!
//! Placeholders: nothing is stored. Each handler ships its own log line and
//! answers with a canned `{"message": ...}` body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemResponse {
    pub message: String,
}

impl ItemResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub async fn create_item(State(state): State<AppState>) -> (StatusCode, Json<ItemResponse>) {
    state.shipper.info("Creating new item");
    (
        StatusCode::CREATED,
        ItemResponse::new("Item created successfully"),
    )
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ItemResponse> {
    state.shipper.info(format!("Getting item with ID: {}", id));
    ItemResponse::new(format!("Get item with ID: {}", id))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ItemResponse> {
    state.shipper.info(format!("Updating item with ID: {}", id));
    ItemResponse::new(format!("Item with ID {} updated successfully", id))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ItemResponse> {
    state.shipper.info(format!("Deleting item with ID: {}", id));
    ItemResponse::new(format!("Item with ID {} deleted successfully", id))
}

pub async fn not_found() -> (StatusCode, Json<ItemResponse>) {
    (StatusCode::NOT_FOUND, ItemResponse::new("Not found"))
}
