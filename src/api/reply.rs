use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use warp::{
    http::{header, StatusCode},
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::error::Error;

pub fn ok<T: Serialize>(value: &T) -> Response {
    reply::json(value).into_response()
}

pub fn created<T: Serialize>(value: &T) -> Response {
    reply::with_status(reply::json(value), StatusCode::CREATED).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `text/plain` body the browser saves as `filename`.
pub fn attachment(body: String, filename: &str) -> Response {
    reply::with_header(
        body,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\""),
    )
    .into_response()
}

fn detail(status: StatusCode, message: &str) -> Response {
    reply::with_status(reply::json(&json!({ "detail": message })), status).into_response()
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<Error>() {
        if let Error::Fatal(info) = e {
            log::error!("Request failed: {info}");
        }
        return Ok(reply::with_status(reply::json(&e.body()), e.status()).into_response());
    }

    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found."));
    }
    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &format!("Malformed request body: {e}")));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large."));
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(detail(StatusCode::LENGTH_REQUIRED, "Content-Length is required."));
    }
    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(detail(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected an application/json body.",
        ));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."));
    }

    log::error!("Unhandled rejection: {err:?}");
    Ok(detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
}
