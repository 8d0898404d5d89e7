//! Response envelopes.
//!
//! Single items and plain lists use `{ "data": ... }`; paginated lists add
//! the total row count and the effective window.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
