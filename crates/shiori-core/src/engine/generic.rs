//! Fallback family used when no richer engine ships with the ghost.

use crate::protocol::{Request, Response};

pub const ACKNOWLEDGEMENT: &str = "OK";

/// Every event gets the same acknowledgement.
pub fn respond(request: &Request) -> Response {
    Response::talk(ACKNOWLEDGEMENT, "0", request.event.as_str())
}
