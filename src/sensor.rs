use crate::details::DetailLabel;
use crate::model::{Account, Details};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Prefix of every unique id, keeps ids stable across restarts and reconfiguration.
pub const UNIQUE_ID_NAMESPACE: &str = "nsk_sbyt";

const NAME_PREFIX: &str = "НСЭ";
const CURRENCY: &str = "₽";
const TARIFF_UNIT: &str = "₽/кВт⋅ч";
const ICON: &str = "mdi:cash";

const ACCOUNT_ID: &str = "Лицевой счет";
const ADDRESS: &str = "Адрес";
const DEBT: &str = "Задолженность";
const TOTAL_DUE: &str = "К оплате";
const METER_SERIAL: &str = "Номер счетчика";
const METER_READING: &str = "Последние показания";
const METER_READING_DATE: &str = "Дата показаний";
const TARIFF: &str = "Тариф";
const LAST_PAYMENT: &str = "Последний платеж";
const LAST_PAYMENT_DATE: &str = "Дата последнего платежа";
const AMOUNT_DUE: &str = "Сумма к оплате (текущая)";
const AMOUNT_DUE_DATE: &str = "Дата расчета";
const CONSUMPTION_VOLUME: &str = "Объем потребления";
const ACCRUED: &str = "Начислено";
const CALCULATION_METHOD: &str = "Метод расчета";

lazy_static! {
    static ref DATE: Regex = Regex::new(r"(\d{2}\.\d{2}\.\d{4})").unwrap();
}

/// One read-only sensor per account, as handed over to the host platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorRecord {
    pub name: String,
    pub unique_id: String,
    pub account_id: String,
    /// Debt amount of the first contract.
    pub state: f64,
    /// Total amount due on the first contract.
    pub total_due: f64,
    pub unit: String,
    pub icon: String,
    pub attributes: Map<String, Value>,
}

/// Render a JSON scalar the way it is shown to the user: strings without quotes.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a contract amount, falling back to `0.0` for anything that is not a number.
pub fn numeric_state(amount: &Value) -> f64 {
    let parsed = match amount {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        log::warn!("amount {} is not numeric, reporting 0", amount);
        0.0
    })
}

pub fn unique_id(login: &str, account_id: &Value) -> String {
    format!(
        "{}_{}_{}",
        UNIQUE_ID_NAMESPACE,
        login,
        scalar_text(account_id)
    )
}

fn embedded_date(label: &str) -> Option<String> {
    DATE.captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

fn base_attributes(account: &Account) -> Map<String, Value> {
    let contract = account.contract().cloned().unwrap_or_default();
    let meter = account.meter_device().cloned().unwrap_or_default();

    let mut attributes = Map::new();
    attributes.insert(ACCOUNT_ID.to_owned(), account.id.clone());
    attributes.insert(ADDRESS.to_owned(), account.address.clone());
    attributes.insert(
        DEBT.to_owned(),
        Value::from(format!("{} {}", scalar_text(&contract.debt_amount), CURRENCY)),
    );
    attributes.insert(
        TOTAL_DUE.to_owned(),
        Value::from(format!("{} {}", scalar_text(&contract.total_amount), CURRENCY)),
    );
    attributes.insert(METER_SERIAL.to_owned(), meter.serial_number);
    attributes.insert(METER_READING.to_owned(), meter.meter_reading);
    attributes.insert(METER_READING_DATE.to_owned(), meter.date_meter_reading);
    attributes
}

/// Fold scraped details into `attributes`. The first label of each recognised kind wins;
/// unrecognised labels are passed through unless they would shadow an attribute already set.
fn enrich(attributes: &mut Map<String, Value>, details: &Details) {
    let mut seen: Vec<DetailLabel<'_>> = Vec::new();

    for (label, value) in details.iter() {
        let kind = DetailLabel::classify(label);
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        match kind {
            DetailLabel::Tariff => {
                attributes.insert(
                    TARIFF.to_owned(),
                    Value::from(format!("{} {}", value, TARIFF_UNIT)),
                );
            }
            DetailLabel::LastPayment => {
                attributes.insert(LAST_PAYMENT.to_owned(), Value::from(value));
                if let Some(date) = embedded_date(label) {
                    attributes.insert(LAST_PAYMENT_DATE.to_owned(), Value::from(date));
                }
            }
            DetailLabel::AmountDue => {
                attributes.insert(AMOUNT_DUE.to_owned(), Value::from(value));
                if let Some(date) = embedded_date(label) {
                    attributes.insert(AMOUNT_DUE_DATE.to_owned(), Value::from(date));
                }
            }
            DetailLabel::ConsumptionVolume => {
                attributes.insert(CONSUMPTION_VOLUME.to_owned(), Value::from(value));
            }
            DetailLabel::Accrued => {
                attributes.insert(ACCRUED.to_owned(), Value::from(value));
            }
            DetailLabel::CalculationMethod => {
                attributes.insert(CALCULATION_METHOD.to_owned(), Value::from(value));
            }
            DetailLabel::Other(label) => {
                if !attributes.contains_key(label) {
                    attributes.insert(label.to_owned(), Value::from(value));
                }
            }
        }
    }
}

impl SensorRecord {
    /// Build the sensor for `account`. `details` is `None` when the details page could not be
    /// fetched, in which case only the attributes from the accounts endpoint are present.
    pub fn build(account: &Account, login: &str, details: Option<&Details>) -> Self {
        let account_id = scalar_text(&account.id);
        let (debt, total_due) = account
            .contract()
            .map(|c| (numeric_state(&c.debt_amount), numeric_state(&c.total_amount)))
            .unwrap_or((0.0, 0.0));

        let mut attributes = base_attributes(account);
        if let Some(details) = details {
            enrich(&mut attributes, details);
        }

        SensorRecord {
            name: format!("{} {}", NAME_PREFIX, account_id),
            unique_id: unique_id(login, &account.id),
            account_id,
            state: debt,
            total_due,
            unit: CURRENCY.to_owned(),
            icon: ICON.to_owned(),
            attributes,
        }
    }
}
