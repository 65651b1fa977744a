//! Transport port and the request/response values that cross it

pub mod ports;

pub use ports::{Transport, TransportRequest, TransportResponse};
