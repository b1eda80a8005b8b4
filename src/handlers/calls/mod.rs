pub mod collection;
pub mod record;

use axum::routing::{get, post};
use axum::Router;

/// Routes mounted under /api/v1
pub fn routes() -> Router {
    Router::new()
        .route("/calls", get(collection::list).post(collection::create))
        .route("/calls/batch", post(collection::create_batch))
        .route(
            "/calls/:call_id",
            get(record::get).put(record::put).delete(record::delete),
        )
}
