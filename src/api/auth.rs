use super::error::map_api_err;
use super::session::Session;
use super::{endpoint, Error};
use crate::model::LoginType;
use http::StatusCode;
use regex::Regex;
use reqwest::header::{HeaderMap, REFERER};
use reqwest::multipart::Form;
use reqwest::Url;

pub const CSRF_FIELD: &str = "_csrf-lk";
const LOCATION_HEADER: &str = "location";
const PJAX_URL: &str = "x-pjax-url";

lazy_static! {
    static ref CSRF_META: Regex =
        Regex::new(r#"<meta name="csrf-token" content="([^"]+)""#).unwrap();
}

/// Extract the anti-forgery token from the login page markup.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    CSRF_META
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Where a successful login redirects to: `Location`, else `x-pjax-url`, else the site root,
/// resolved against the login URL.
pub fn resolve_redirect(login_url: &Url, headers: &HeaderMap) -> Result<Url, Error> {
    let location = [LOCATION_HEADER, PJAX_URL]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .unwrap_or(endpoint::HOME);

    login_url
        .join(location)
        .map_err(|e| Error::Decode(format!("invalid redirect target {:?}: {}", location, e)))
}

impl Session {
    async fn fetch_csrf_token(&self) -> Result<String, Error> {
        let html = self
            .client
            .get(self.url(endpoint::LOGIN)?)
            .send()
            .await
            .map_err(map_api_err)?
            .text()
            .await
            .map_err(map_api_err)?;

        extract_csrf_token(&html)
            .ok_or_else(|| Error::LoginError(String::from("no csrf-token meta tag on login page")))
    }

    /// Log in and establish the session cookies.
    pub async fn try_authenticate(&self) -> Result<(), Error> {
        let csrf_token = self.fetch_csrf_token().await?;
        let login_url = self.url(endpoint::LOGIN)?;
        let credentials = &self.api.credentials;
        let login_type = LoginType::from_login(&credentials.login);

        let form = Form::new()
            .text(CSRF_FIELD, csrf_token.clone())
            .text("Login[login]", credentials.login.clone())
            .text("Login[password]", credentials.password.clone())
            .text("type_login", login_type.as_str());

        log::debug!("submitting login form ({} login)", login_type.as_str());

        let response = self
            .no_redirect
            .post(login_url.clone())
            .multipart(form)
            .header("X-CSRF-Token", csrf_token.as_str())
            .header("X-PJAX", "true")
            .header("X-PJAX-Container", "#p0")
            .header(REFERER, login_url.as_str())
            .send()
            .await
            .map_err(map_api_err)?;

        match response.status() {
            StatusCode::FOUND => {
                let target = resolve_redirect(&login_url, response.headers())?;
                log::debug!("login accepted, following redirect to {}", target);

                self.client
                    .get(target)
                    .send()
                    .await
                    .map_err(map_api_err)?;
                Ok(())
            }
            /* The portal re-renders the form instead of redirecting */
            StatusCode::OK => Err(Error::LoginError(String::from(
                "login form returned 200, wrong login or password?",
            ))),
            status => Err(Error::Status(status)),
        }
    }

    /// `true` once the session is logged in. Failures are logged, never returned.
    pub async fn authenticate(&self) -> bool {
        match self.try_authenticate().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Authentication failed: {}", e);
                false
            }
        }
    }
}
