//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{builder_error, classify_reqwest_error, IntoTransportError};
