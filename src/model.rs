use reqwest::Url;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use std::fmt;

/// Login and password as typed into the portal login form. Neither shows up in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Value of the `type_login` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    Email,
    Phone,
}

impl LoginType {
    pub fn from_login(login: &str) -> Self {
        if login.contains('@') {
            LoginType::Email
        } else {
            LoginType::Phone
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Email => "email",
            LoginType::Phone => "phone",
        }
    }
}

/// Everything needed to open a session: where the portal lives and who logs in.
#[derive(Debug, Clone)]
pub struct Api {
    pub base_url: Url,
    pub credentials: Credentials,
}

fn unknown_id() -> Value {
    Value::from("unknown")
}

fn empty_text() -> Value {
    Value::from("")
}

fn zero() -> Value {
    Value::from(0)
}

/// Lists the portal sends as `null` (or anything but an array) count as empty.
fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: de::DeserializeOwned,
{
    match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| T::deserialize(item).map_err(de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

/* Scalars stay raw JSON: the portal mixes numbers and numeric strings */

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterDevice {
    #[serde(default = "empty_text")]
    pub serial_number: Value,
    #[serde(default = "zero")]
    pub meter_reading: Value,
    #[serde(default = "empty_text")]
    pub date_meter_reading: Value,
}

impl Default for MeterDevice {
    fn default() -> Self {
        MeterDevice {
            serial_number: empty_text(),
            meter_reading: zero(),
            date_meter_reading: empty_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(default = "zero")]
    pub debt_amount: Value,
    #[serde(default = "zero")]
    pub total_amount: Value,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub meter_devices: Vec<MeterDevice>,
}

impl Default for Contract {
    fn default() -> Self {
        Contract {
            debt_amount: zero(),
            total_amount: zero(),
            meter_devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Account {
    #[serde(default = "unknown_id")]
    pub id: Value,
    #[serde(default = "empty_text")]
    pub address: Value,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub contracts: Vec<Contract>,
}

impl Account {
    /// Only the first contract is reported.
    pub fn contract(&self) -> Option<&Contract> {
        self.contracts.first()
    }

    /// First meter device of the first contract.
    pub fn meter_device(&self) -> Option<&MeterDevice> {
        self.contract().and_then(|c| c.meter_devices.first())
    }
}

/// Body of the accounts endpoint. The portal has been seen returning a bare array, an object
/// wrapping the array in `items`, and a single account object.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountsPayload {
    List(Vec<Account>),
    Paged(Vec<Account>),
    Single(Box<Account>),
}

impl AccountsPayload {
    pub fn into_accounts(self) -> Vec<Account> {
        match self {
            AccountsPayload::List(accounts) | AccountsPayload::Paged(accounts) => accounts,
            AccountsPayload::Single(account) => vec![*account],
        }
    }
}

impl<'de> serde::Deserialize<'de> for AccountsPayload {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;

        /* Empty payloads carry no accounts rather than one account full of defaults */
        match value {
            Value::Null => Ok(AccountsPayload::List(Vec::new())),
            Value::Array(_) => Vec::<Account>::deserialize(value)
                .map(AccountsPayload::List)
                .map_err(de::Error::custom),
            Value::Object(mut map) => {
                if map.is_empty() {
                    Ok(AccountsPayload::List(Vec::new()))
                } else if let Some(items) = map.remove("items") {
                    Vec::<Account>::deserialize(items)
                        .map(AccountsPayload::Paged)
                        .map_err(de::Error::custom)
                } else {
                    Account::deserialize(Value::Object(map))
                        .map(|account| AccountsPayload::Single(Box::new(account)))
                        .map_err(de::Error::custom)
                }
            }
            other => Err(de::Error::custom(format!(
                "unexpected accounts payload: {}",
                other
            ))),
        }
    }
}

/// Label/value pairs scraped from the account details page, in document order.
///
/// Inserting an existing label replaces its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details(Vec<(String, String)>);

impl Details {
    pub fn new() -> Self {
        Details(Vec::new())
    }

    pub fn insert(&mut self, label: String, value: String) {
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.0.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> std::iter::FromIterator<(K, V)> for Details {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut details = Details::new();
        for (label, value) in iter {
            details.insert(label.into(), value.into());
        }
        details
    }
}
