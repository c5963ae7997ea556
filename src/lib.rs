#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod details;
pub mod model;
pub mod sensor;

pub use api::Error;
use model::{AccountsPayload, Details};
use sensor::SensorRecord;

/// Turn the accounts payload into one sensor per account, all sharing the same `details`.
pub fn build_sensors(
    accounts: AccountsPayload,
    login: &str,
    details: Option<&Details>,
) -> Vec<SensorRecord> {
    accounts
        .into_accounts()
        .iter()
        .map(|account| SensorRecord::build(account, login, details))
        .collect()
}

/// One setup pass on a fresh session: authenticate, fetch accounts, fetch details, build
/// sensors. Failing to fetch details only drops the enrichment.
pub async fn try_setup(api: &model::Api) -> Result<Vec<SensorRecord>, Error> {
    let session = api::Session::new(api)?;

    session.try_authenticate().await?;
    let accounts = session.try_get_accounts().await?;
    let details = session.get_account_details().await;

    let sensors = build_sensors(accounts, &api.credentials.login, details.as_ref());
    log::info!(
        "{} sensor(s) for {} (details {})",
        sensors.len(),
        api.base_url,
        if details.is_some() { "available" } else { "unavailable" }
    );
    Ok(sensors)
}

/// Like [`try_setup`], but any failure yields no sensors.
pub async fn setup(api: &model::Api) -> Vec<SensorRecord> {
    try_setup(api).await.unwrap_or_else(|e| {
        log::error!("Setup against {} failed: {}", api.base_url, e);
        Vec::new()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use std::fs;
    use std::path::PathBuf;

    fn read_resource(filename: &str) -> String {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push(format!("resources/test/{}", filename));
        fs::read_to_string(d.as_path()).unwrap()
    }

    async fn mock_login(server: &mut ServerGuard) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/login")
                .with_status(200)
                .with_body(read_resource("login.html"))
                .create_async()
                .await,
            server
                .mock("POST", "/login")
                .with_status(302)
                .with_header("location", "/")
                .with_header("set-cookie", "_csrf-lk=cookie-token; path=/")
                .create_async()
                .await,
            server
                .mock("GET", "/")
                .with_status(200)
                .create_async()
                .await,
        ]
    }

    async fn mock_accounts(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/accounts")
            .match_header("x-csrf-token", "cookie-token")
            .with_status(200)
            .with_body(read_resource("accounts.json"))
            .create_async()
            .await
    }

    fn api(server: &ServerGuard) -> model::Api {
        api::api(
            &server.url(),
            String::from("user@example.com"),
            String::from("secret"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn two_accounts_two_sensors() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let accounts = mock_accounts(&mut server).await;
        let details = server
            .mock("GET", "/accounts-details/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(read_resource("account_details.html"))
            .create_async()
            .await;

        let sensors = setup(&api(&server)).await;

        assert_eq!(2, sensors.len());
        assert_eq!(
            "nsk_sbyt_user@example.com_540000000001",
            sensors[0].unique_id
        );
        assert_eq!(
            "nsk_sbyt_user@example.com_540000000002",
            sensors[1].unique_id
        );
        assert_eq!(123.45, sensors[0].state);
        assert_eq!(0.0, sensors[1].state);
        assert_eq!(
            serde_json::json!("5.5 ₽/кВт⋅ч"),
            sensors[1].attributes["Тариф"]
        );
        assert_eq!(
            serde_json::json!("12.02.2026"),
            sensors[0].attributes["Дата последнего платежа"]
        );

        accounts.assert_async().await;
        details.assert_async().await;
    }

    #[tokio::test]
    async fn details_unavailable() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let _accounts = mock_accounts(&mut server).await;
        let _details = server
            .mock("GET", "/accounts-details/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let sensors = try_setup(&api(&server)).await.unwrap();

        assert_eq!(2, sensors.len());
        for sensor in &sensors {
            assert_eq!(7, sensor.attributes.len());
        }
    }

    #[test]
    fn empty_details_still_build_sensors() {
        let details = Details::new();
        let payload: AccountsPayload =
            serde_json::from_str(&read_resource("accounts.json")).unwrap();
        let sensors = build_sensors(payload, "user@example.com", Some(&details));

        assert_eq!(2, sensors.len());
        assert_ne!(sensors[0].unique_id, sensors[1].unique_id);
    }

    #[tokio::test]
    async fn failed_login_yields_no_sensors() {
        let mut server = Server::new_async().await;
        let _page = server
            .mock("GET", "/login")
            .with_status(200)
            .with_body(read_resource("login.html"))
            .create_async()
            .await;
        let _login = server
            .mock("POST", "/login")
            .with_status(200)
            .create_async()
            .await;
        let accounts = server
            .mock("GET", "/accounts")
            .expect(0)
            .create_async()
            .await;

        let api = api(&server);
        assert!(matches!(try_setup(&api).await, Err(Error::LoginError(_))));
        assert!(setup(&api).await.is_empty());
        accounts.assert_async().await;
    }

    #[tokio::test]
    async fn failed_accounts_yield_no_sensors() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let _accounts = server
            .mock("GET", "/accounts")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        assert!(setup(&api(&server)).await.is_empty());
    }
}
