//! Scraping of the account details fragment.
//!
//! The fragment has two unrelated regions: payment summary items (title + text) and the last
//! readings table (rows of label + value columns). Both are flattened into one [`Details`] map.

use crate::model::Details;
use scraper::{ElementRef, Html, Selector};

const TARIFF_MARKER: &str = "Тариф";
const TARIFF_INFO_MARKER: &str = "Информация";
const LAST_PAYMENT_MARKER: &str = "Последний платеж";
const AMOUNT_DUE_MARKER: &str = "Сумма к оплате";
const CONSUMPTION_VOLUME_LABEL: &str = "Объем кв/ч для расчета";
const ACCRUED_LABEL: &str = "Начислено, руб.";
const CALCULATION_METHOD_LABEL: &str = "Метод расчета";

lazy_static! {
    static ref PAYMENT_ITEM: Selector =
        Selector::parse("div.account-details-page__payments-item").unwrap();
    static ref PAYMENT_ITEM_TITLE: Selector =
        Selector::parse("div.account-details-page__payments-item-title").unwrap();
    static ref PAYMENT_ITEM_TEXT: Selector =
        Selector::parse("div.account-details-page__payments-item-text").unwrap();
    static ref TABLE_ROW: Selector =
        Selector::parse("div.account-details-page__last-table-row").unwrap();
    static ref TABLE_COL: Selector =
        Selector::parse("div.account-details-page__last-table-col").unwrap();
    static ref TABLE_COL_VALUE: Selector =
        Selector::parse("span.account-details-page__last-table-col--value").unwrap();
}

/// Labels the entity builder knows how to interpret. Anything else is carried as
/// [`DetailLabel::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailLabel<'a> {
    /// Any label mentioning the tariff, e.g. "Тариф на электроэнергию".
    Tariff,
    /// "Последний платеж от DD.MM.YYYY"
    LastPayment,
    /// "Сумма к оплате на DD.MM.YYYY"
    AmountDue,
    ConsumptionVolume,
    Accrued,
    CalculationMethod,
    Other(&'a str),
}

impl<'a> DetailLabel<'a> {
    pub fn classify(label: &'a str) -> Self {
        if label.contains(TARIFF_MARKER) {
            DetailLabel::Tariff
        } else if label.contains(LAST_PAYMENT_MARKER) {
            DetailLabel::LastPayment
        } else if label.contains(AMOUNT_DUE_MARKER) {
            DetailLabel::AmountDue
        } else {
            match label {
                CONSUMPTION_VOLUME_LABEL => DetailLabel::ConsumptionVolume,
                ACCRUED_LABEL => DetailLabel::Accrued,
                CALCULATION_METHOD_LABEL => DetailLabel::CalculationMethod,
                other => DetailLabel::Other(other),
            }
        }
    }
}

/// Text of all descendant nodes, each piece trimmed, empty pieces dropped, joined without a
/// separator.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn payment_items(document: &Html, details: &mut Details) {
    for item in document.select(&PAYMENT_ITEM) {
        let title = item.select(&PAYMENT_ITEM_TITLE).next();
        let text = item.select(&PAYMENT_ITEM_TEXT).next();

        match (title, text) {
            (Some(title), Some(text)) => details.insert(stripped_text(title), stripped_text(text)),
            _ => log::trace!("skipping incomplete payment item: {}", stripped_text(item)),
        }
    }
}

fn tariff_value(column: ElementRef<'_>) -> String {
    match column.select(&TABLE_COL_VALUE).next() {
        Some(span) => stripped_text(span),
        None => stripped_text(column)
            .split(TARIFF_INFO_MARKER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned(),
    }
}

fn table_rows(document: &Html, details: &mut Details) {
    for row in document.select(&TABLE_ROW) {
        let columns: Vec<ElementRef<'_>> = row.select(&TABLE_COL).collect();

        if let [label, value] = columns.as_slice() {
            let label = stripped_text(*label);
            let value = if label.contains(TARIFF_MARKER) {
                tariff_value(*value)
            } else {
                stripped_text(*value)
            };
            details.insert(label, value);
        } else {
            log::trace!("skipping table row with {} columns", columns.len());
        }
    }
}

/// Extract label/value pairs from the details fragment. Markup that matches neither region
/// simply yields an empty map.
pub fn parse_details(html: &str) -> Details {
    let document = Html::parse_fragment(html);
    let mut details = Details::new();

    payment_items(&document, &mut details);
    table_rows(&document, &mut details);

    log::debug!("parsed {} detail entries", details.len());
    details
}
