mod auth;
pub mod endpoint;
pub mod error;
mod fetch;
pub mod session;

use crate::model;
pub use auth::{extract_csrf_token, resolve_redirect};
pub use error::Error;
use reqwest::Url;
pub use session::Session;

pub fn api(base_url: &str, login: String, password: String) -> Result<model::Api, Error> {
    let base_url = Url::parse(base_url)
        .map_err(|e| Error::InvalidConfig(format!("base url {:?}: {}", base_url, e)))?;

    Ok(model::Api {
        base_url,
        credentials: model::Credentials { login, password },
    })
}
