pub mod cors;
pub mod extract;
pub mod response;

pub use cors::cors_layer;
pub use extract::{call_id_path, json_body, query_params};
pub use response::{ApiResponse, ApiResult};
