use rocket::{
    Request,
    http::{Method, Status},
    request::{self, FromRequest},
};
use tracing::debug;

use crate::error::GameError;

/// Proof that a request speaks JSON both ways.
///
/// Clients must accept `application/json`, and requests that may carry a body
/// (`POST`, `PUT`, `PATCH`, `DELETE`) must declare it as their content type.
#[derive(Debug, Clone, Copy)]
pub struct JsonOnly;

/// Guard form that never fails the route, so handlers can answer with `?`.
pub type RequireJson = Result<JsonOnly, GameError>;

fn accepts_json(req: &Request<'_>) -> bool {
    req.accept().is_none_or(|accept| {
        accept.media_types().any(|media| {
            (media.top() == "*" || media.top() == "application")
                && (media.sub() == "*" || media.sub() == "json")
        })
    })
}

fn may_carry_body(method: Method) -> bool {
    matches!(
        method,
        Method::Post | Method::Put | Method::Patch | Method::Delete
    )
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for JsonOnly {
    type Error = GameError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        if !accepts_json(req) {
            debug!("Refusing {} {}: JSON not accepted", req.method(), req.uri());
            return request::Outcome::Error((Status::NotAcceptable, GameError::NotAcceptable));
        }

        let sends_json = req.content_type().is_some_and(|ct| ct.is_json());
        if may_carry_body(req.method()) && !sends_json {
            debug!("Refusing {} {}: body is not JSON", req.method(), req.uri());
            return request::Outcome::Error((
                Status::UnsupportedMediaType,
                GameError::UnsupportedMediaType,
            ));
        }

        request::Outcome::Success(JsonOnly)
    }
}
