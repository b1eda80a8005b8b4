pub mod call;

pub use call::{CallBatch, CallRecord, FieldErrors, NewCall};
