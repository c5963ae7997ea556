#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use config::Config;
use nsk_sbyt_rs::api;
use nsk_sbyt_rs::model::Api;
use rocket::response::content::RawJson;
use rocket::State;

mod metrics;

const BASE_URL: &str = "https://narod.nskes.ru";

#[derive(Clone, serde::Deserialize)]
pub struct NskSbytConfig {
    base_url: String,
    login: String,
    password: String,
}

/// Structure containing state for API handlers.
pub struct StateData {
    api: Api,
}

pub fn read_settings() -> Result<NskSbytConfig, config::ConfigError> {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("NSK"))?
        .set_default("base_url", BASE_URL)?;

    settings.try_into()
}

/// Run one setup pass and return its sensors as JSON.
#[get("/sensors")]
async fn sensors_route(state: &State<StateData>) -> Result<RawJson<String>, api::Error> {
    let sensors = nsk_sbyt_rs::try_setup(&state.api).await?;

    serde_json::to_string(&sensors)
        .map(RawJson)
        .or(Err(api::Error::FormatError))
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, api::Error> {
    let sensors = nsk_sbyt_rs::try_setup(&state.api).await?;
    metrics::collect(&sensors);
    metrics::read()
}

#[rocket::main]
async fn main() {
    env_logger::init();

    let settings = match read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let api = match api::api(&settings.base_url, settings.login, settings.password) {
        Ok(api) => api,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rocket::build()
        .manage(StateData { api })
        .mount("/", routes![sensors_route, metrics_route])
        .launch()
        .await
    {
        log::error!("Server error: {}", e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;

    #[test]
    fn settings_from_environment() {
        env::set_var("NSK_LOGIN", "user@example.com");
        env::set_var("NSK_PASSWORD", "secret");
        env::remove_var("NSK_BASE_URL");

        let settings = read_settings().unwrap();
        assert_eq!(BASE_URL, settings.base_url);
        assert_eq!("user@example.com", settings.login);
        assert_eq!("secret", settings.password);

        env::set_var("NSK_BASE_URL", "http://127.0.0.1:8080");
        assert_eq!("http://127.0.0.1:8080", read_settings().unwrap().base_url);

        env::remove_var("NSK_PASSWORD");
        assert!(read_settings().is_err());
        env::remove_var("NSK_LOGIN");
        env::remove_var("NSK_BASE_URL");
    }
}
