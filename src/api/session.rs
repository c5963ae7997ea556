use super::endpoint::Endpoint;
use super::Error;
use crate::model;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Url;

use std::sync::Arc;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/26.2 Safari/605.1.15";
const ACCEPT: &str = "text/html, */*; q=0.01";
const ACCEPT_LANGUAGE: &str = "ru";

/// Cookie-bearing HTTP session against the portal, shaped like a desktop browser.
///
/// Two clients share one cookie jar: `client` follows redirects like a browser would, while
/// `no_redirect` is used for the login form submission whose 302 carries the outcome.
pub struct Session {
    pub(super) api: model::Api,
    jar: Arc<Jar>,
    pub(super) client: reqwest::Client,
    pub(super) no_redirect: reqwest::Client,
}

fn default_headers(base_url: &Url) -> Result<HeaderMap, Error> {
    let origin = base_url.origin().ascii_serialization();
    let origin = HeaderValue::from_str(&origin)
        .map_err(|e| Error::InvalidConfig(format!("origin {}: {}", origin, e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    headers.insert(header::ORIGIN, origin);
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(headers)
}

fn build_client(
    jar: Arc<Jar>,
    headers: HeaderMap,
    policy: Policy,
) -> Result<reqwest::Client, Error> {
    reqwest::ClientBuilder::new()
        .cookie_provider(jar)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(policy)
        .build()
        .or(Err(Error::InternalError))
}

impl Session {
    /// Open a fresh, unauthenticated session for `api`.
    pub fn new(api: &model::Api) -> Result<Session, Error> {
        let jar = Arc::new(Jar::default());
        let headers = default_headers(&api.base_url)?;

        Ok(Session {
            api: api.clone(),
            client: build_client(jar.clone(), headers.clone(), Policy::default())?,
            no_redirect: build_client(jar.clone(), headers, Policy::none())?,
            jar,
        })
    }

    pub fn url(&self, endpoint: &Endpoint) -> Result<Url, Error> {
        self.api.base_url.join(endpoint).map_err(|e| {
            Error::InvalidConfig(format!("{}{}: {}", self.api.base_url, endpoint, e))
        })
    }

    #[cfg(test)]
    pub(super) fn jar(&self) -> &Jar {
        &self.jar
    }

    /// Current value of cookie `name` as the portal root would receive it.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let cookies = self.jar.cookies(&self.api.base_url)?;
        let cookies = cookies.to_str().ok()?;

        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api;

    fn session(base_url: &str) -> Session {
        let api = api::api(base_url, String::from("user@example.com"), String::from("secret"))
            .unwrap();
        Session::new(&api).unwrap()
    }

    #[test]
    fn origin_header() {
        let headers = default_headers(&Url::parse("https://narod.nskes.ru/some/path").unwrap())
            .unwrap();
        assert_eq!(headers[header::ORIGIN], "https://narod.nskes.ru");
        assert_eq!(headers["X-Requested-With"], "XMLHttpRequest");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
    }

    #[test]
    fn endpoint_urls() {
        let session = session("https://narod.nskes.ru");
        assert_eq!(
            "https://narod.nskes.ru/login",
            session.url(api::endpoint::LOGIN).unwrap().as_str()
        );
        assert_eq!(
            "https://narod.nskes.ru/accounts-details/?full=N&_pjax=%23pjax-account-details",
            session.url(api::endpoint::ACCOUNT_DETAILS).unwrap().as_str()
        );
    }

    #[test]
    fn cookie_lookup() {
        let session = session("https://narod.nskes.ru");
        assert_eq!(None, session.cookie("_csrf-lk"));

        let url = Url::parse("https://narod.nskes.ru/login").unwrap();
        session.jar.add_cookie_str("_csrf-lk=abc%3D%3D; Path=/", &url);
        session.jar.add_cookie_str("PHPSESSID=xyz; Path=/", &url);

        assert_eq!(Some(String::from("abc%3D%3D")), session.cookie("_csrf-lk"));
        assert_eq!(Some(String::from("xyz")), session.cookie("PHPSESSID"));
        assert_eq!(None, session.cookie("missing"));
    }
}
