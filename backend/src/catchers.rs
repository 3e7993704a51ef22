use rocket::{Request, catch, serde::json::Json};
use shared::error::{Error, ErrorCode};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::BadRequest, "Malformed request body or parameters."))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::NotFound, format!("No resource at {}", req.uri().path())))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::Unprocessable, "Request body does not match the expected shape."))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::StorageError, "An internal server error occurred."))
}
