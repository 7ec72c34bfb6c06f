use crate::core::CartItemsService;
use crate::domain::model::{CartItemRequest, ErrorResponse, GetCartItemsResponse};
use crate::utils::validation::Validate;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub const API_PREFIX: &str = "/shopping-cart/v1";

pub type SharedCartService = Arc<dyn CartItemsService>;

/// Error side of the handlers. The message is what the client sees; details
/// stay in the logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "bad request",
        }
    }

    fn internal(message: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

/// Full application: health probe plus the versioned cart routes.
pub fn app_router(service: SharedCartService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, cart_router(service))
}

/// - `GET /items` - list the cart
/// - `POST /items` - add an item; reservation happens in the background
pub fn cart_router(service: SharedCartService) -> Router {
    Router::new()
        .route("/items", get(get_cart_items).post(add_cart_item))
        .with_state(service)
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn get_cart_items(
    State(service): State<SharedCartService>,
) -> Result<Json<GetCartItemsResponse>, ApiError> {
    let items = service.get().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to get cart items");
        ApiError::internal("Error getting the cart items")
    })?;

    Ok(Json(GetCartItemsResponse::new(items)))
}

async fn add_cart_item(
    State(service): State<SharedCartService>,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Bad json request");
        ApiError::bad_request()
    })?;

    if let Err(e) = request.item.validate() {
        tracing::warn!(error = %e, item_id = %request.item.id, "Invalid cart item");
        return Err(ApiError::bad_request());
    }

    service.add(request.item).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to add item to the cart");
        ApiError::internal("internal error")
    })?;

    Ok(StatusCode::ACCEPTED)
}
