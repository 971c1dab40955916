use rocket::{Request, catch, serde::json::Json};
use shared::error::{Error as ErrorBody, ErrorCode};

fn message(code: ErrorCode, message: &str) -> Json<ErrorBody> {
    Json(ErrorBody::new(code, message))
}

#[catch(422)]
pub fn unprocessable_entity(req: &Request) -> Json<ErrorBody> {
    let error = match req.uri().path().segments().last() {
        Some("vote") => "Invalid vote request data passed.",
        Some("comment") => "Invalid comment request data passed.",
        _ => "Invalid request data passed.",
    };
    message(ErrorCode::ValidationFailed, error)
}

#[catch(429)]
pub fn too_many_requests(_req: &Request) -> Json<ErrorBody> {
    message(ErrorCode::RateLimited, "Too many votes. Please wait before trying again.")
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorBody> {
    message(ErrorCode::InvalidInput, "Invalid request parameters.")
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorBody> {
    message(ErrorCode::SystemError, "An internal server error occurred.")
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorBody> {
    message(ErrorCode::NotFound, "The requested resource was not found.")
}
