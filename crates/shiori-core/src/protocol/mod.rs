//! SHIORI/3.0 text codec. Stateless.
//!
//! ```text
//! GET SHIORI/3.0            SHIORI/3.0 200
//! ID: OnMouseClick          Value: ...
//! Reference0: 120           Surface: 1
//! Reference2: head          Event: OnMouseClick
//! <blank>                   <blank>
//! ```

mod request;
mod response;

pub use request::{build_request, Request, MAX_REFERENCE_INDEX};
pub use response::{format_response, Response, STATUS_INTERNAL_ERROR, STATUS_NO_CONTENT, STATUS_OK};

/// Parse raw request text.
pub fn parse(raw: &str) -> crate::ShioriResult<Request> {
    Request::parse(raw)
}
