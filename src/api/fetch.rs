use super::auth::CSRF_FIELD;
use super::error::map_api_err;
use super::session::Session;
use super::{endpoint, Error};
use crate::details;
use crate::model::{AccountsPayload, Details};
use http::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};

impl Session {
    /// `X-CSRF-Token` taken from the current `_csrf-lk` cookie, so a token rotated by the
    /// portal is picked up on the next request.
    fn csrf_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self
            .cookie(CSRF_FIELD)
            .and_then(|token| HeaderValue::from_str(&token).ok())
        {
            Some(token) => {
                headers.insert("x-csrf-token", token);
            }
            None => log::debug!("no {} cookie in session", CSRF_FIELD),
        }
        headers
    }

    async fn get_text(
        &self,
        endpoint: &endpoint::Endpoint,
        headers: HeaderMap,
    ) -> Result<String, Error> {
        let response = self
            .client
            .get(self.url(endpoint)?)
            .headers(headers)
            .send()
            .await
            .map_err(map_api_err)?;

        match response.status() {
            StatusCode::OK => {}
            status => return Err(Error::Status(status)),
        }

        response
            .text()
            .await
            .map_err(|e| Error::Decode(format!("Error reading portal response: {}", e)))
    }

    pub async fn try_get_accounts(&self) -> Result<AccountsPayload, Error> {
        let response_text = self.get_text(endpoint::ACCOUNTS, self.csrf_headers()).await?;

        log::trace!(
            "endpoint: {}, response_text: {}",
            endpoint::ACCOUNTS,
            response_text
        );

        serde_json::from_str(&response_text).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Accounts of the logged in user, `None` on any failure.
    pub async fn get_accounts(&self) -> Option<AccountsPayload> {
        self.try_get_accounts()
            .await
            .map_err(|e| log::error!("Error requesting accounts: {}", e))
            .ok()
    }

    pub async fn try_get_account_details(&self) -> Result<Details, Error> {
        let mut headers = self.csrf_headers();
        headers.insert("x-pjax", HeaderValue::from_static("true"));
        headers.insert(
            "x-pjax-container",
            HeaderValue::from_static("#pjax-account-details"),
        );
        let referer = self.url(endpoint::HOME)?;
        if let Ok(referer) = HeaderValue::from_str(referer.as_str()) {
            headers.insert(REFERER, referer);
        }

        let html = self.get_text(endpoint::ACCOUNT_DETAILS, headers).await?;
        Ok(details::parse_details(&html))
    }

    /// Scraped details: `None` if the page could not be fetched, an empty map if it was fetched
    /// but its body could not be used.
    pub async fn get_account_details(&self) -> Option<Details> {
        match self.try_get_account_details().await {
            Ok(details) => Some(details),
            Err(Error::Decode(e)) => {
                log::error!("Error parsing account details: {}", e);
                Some(Details::new())
            }
            Err(e) => {
                log::error!("Error requesting account details: {}", e);
                None
            }
        }
    }
}
