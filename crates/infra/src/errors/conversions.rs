//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as StdError;
use std::io::ErrorKind;

use reqwest::Error as HttpError;
use signway_domain::{ApiError, TransportError, TransportErrorKind};

/// Extension trait to make the conversion logic explicit at call sites.
pub trait IntoTransportError {
    fn into_transport_error(self) -> TransportError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl IntoTransportError for HttpError {
    fn into_transport_error(self) -> TransportError {
        let message = error_chain_message(&self);
        TransportError::new(classify_reqwest_error(&self), message)
    }
}

/// Pick the transport kind for a reqwest failure.
///
/// Timeouts are reported by reqwest directly; resets and refusals come from
/// the `io::Error` buried in the source chain; DNS and TLS failures are only
/// visible in the error text.
pub fn classify_reqwest_error(err: &HttpError) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }

    if let Some(kind) = io_kind_in_chain(err) {
        return kind;
    }

    let text = error_chain_message(err).to_ascii_lowercase();
    // Resolution and handshake failures both surface while connecting.
    let connecting = err.is_connect();
    if connecting
        && (text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
            || text.contains("no such host"))
    {
        TransportErrorKind::Dns
    } else if connecting
        && (text.contains("certificate")
            || text.contains("handshake")
            || text.contains("tls")
            || text.contains("ssl"))
    {
        TransportErrorKind::Tls
    } else if text.contains("connection reset") || text.contains("connection closed before") {
        TransportErrorKind::ConnectionReset
    } else if text.contains("connection refused") {
        TransportErrorKind::ConnectionRefused
    } else if text.contains("timed out") {
        TransportErrorKind::Timeout
    } else {
        TransportErrorKind::Other
    }
}

fn io_kind_in_chain(err: &HttpError) -> Option<TransportErrorKind> {
    let mut source = err.source();
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            match io.kind() {
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                    return Some(TransportErrorKind::ConnectionReset);
                }
                ErrorKind::ConnectionRefused => return Some(TransportErrorKind::ConnectionRefused),
                ErrorKind::TimedOut => return Some(TransportErrorKind::Timeout),
                _ => {}
            }
        }
        source = current.source();
    }
    None
}

/// `outer: inner: innermost`, so the root cause survives into logs.
fn error_chain_message(err: &HttpError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(current) = source {
        let text = current.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = current.source();
    }
    message
}

/// reqwest client construction failures are configuration problems.
pub fn builder_error(err: &HttpError) -> ApiError {
    ApiError::Config(format!("failed to build HTTP client: {}", error_chain_message(err)))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
