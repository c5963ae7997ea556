use http::StatusCode;
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No CSRF token on the login page, or credentials rejected.
    LoginError(String),
    /// Request never produced a response (DNS, connect, TLS, timeout, ...).
    Transport(String),
    /// Response arrived with a status the operation does not accept.
    Status(StatusCode),
    /// Response body could not be read or decoded.
    Decode(String),
    InvalidConfig(String),
    FormatError,
    InternalError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoginError(s) => write!(f, "login failed: {}", s),
            Error::Transport(s) => write!(f, "transport error: {}", s),
            Error::Status(status) => write!(f, "unexpected status: {}", status),
            Error::Decode(s) => write!(f, "invalid response: {}", s),
            Error::InvalidConfig(s) => write!(f, "invalid configuration: {}", s),
            Error::FormatError => write!(f, "format error"),
            Error::InternalError => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {}

/// Map `reqwest` failures onto transport, status and decode errors.
pub(crate) fn map_api_err(error: reqwest::Error) -> Error {
    if error.is_decode() || error.is_body() {
        Error::Decode(error.to_string())
    } else if let Some(status) = error.status() {
        Error::Status(status)
    } else {
        Error::Transport(error.to_string())
    }
}

fn html_response(status: Status, body: String) -> response::Result<'static> {
    Response::build()
        .status(status)
        .sized_body(body.len(), Cursor::new(body))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::LoginError(s) => {
                let error = format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to the portal: <code>{}</code></body></html>", s);
                html_response(Status::Forbidden, error)
            }
            Error::Transport(_) | Error::Status(_) | Error::Decode(_) => {
                let error = format!(
                    "<html><body><h3>502 Bad Gateway</h3>Portal request failed: <code>{}</code></body></html>",
                    self
                );
                html_response(Status::BadGateway, error)
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                html_response(Status::InternalServerError, error)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            "unexpected status: 500 Internal Server Error",
            Error::Status(StatusCode::INTERNAL_SERVER_ERROR).to_string()
        );
        assert_eq!(
            "login failed: no csrf-token",
            Error::LoginError(String::from("no csrf-token")).to_string()
        );
    }
}
