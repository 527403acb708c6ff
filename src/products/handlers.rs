use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    products::repo::Product,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Product>,
}

pub fn product_routes() -> Router<AppState> {
    Router::new().route("/products", get(list_products))
}

#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ProductListResponse>> {
    let data = state.products.list().await?;
    debug!(user_id = %user.id, count = data.len(), "products listed");
    Ok(Json(ProductListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}
