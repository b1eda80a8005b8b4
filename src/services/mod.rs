pub mod batch_writer;
pub mod call_service;
pub mod error;
pub mod pagination;

pub use batch_writer::BatchRecordWriter;
pub use call_service::{CallPage, CallService};
pub use error::ServiceError;
pub use pagination::{Pagination, PaginationInfo, PaginationQuery};
