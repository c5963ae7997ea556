use nsk_sbyt_rs::sensor::SensorRecord;
use prometheus::{Encoder, GaugeVec, TextEncoder};

lazy_static! {
    static ref ACCOUNT_DEBT_GAUGE: GaugeVec = register_gauge_vec!(
        opts!("account_debt", "debt on the first contract of the account (in RUB)"),
        &["account_id"],
    )
    .unwrap();
    static ref ACCOUNT_TOTAL_DUE_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "account_total_due",
            "total amount due on the first contract of the account (in RUB)"
        ),
        &["account_id"],
    )
    .unwrap();
}

/// Replace the exported values with the sensors of one setup pass.
pub fn collect(sensors: &[SensorRecord]) {
    ACCOUNT_DEBT_GAUGE.reset();
    ACCOUNT_TOTAL_DUE_GAUGE.reset();

    for sensor in sensors {
        ACCOUNT_DEBT_GAUGE
            .with_label_values(&[&sensor.account_id])
            .set(sensor.state);
        ACCOUNT_TOTAL_DUE_GAUGE
            .with_label_values(&[&sensor.account_id])
            .set(sensor.total_due);
    }
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, nsk_sbyt_rs::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(nsk_sbyt_rs::Error::FormatError))?;
    String::from_utf8(buffer).or(Err(nsk_sbyt_rs::Error::FormatError))
}

#[cfg(test)]
mod test {
    use super::*;
    use nsk_sbyt_rs::model::Account;
    use serde_json::json;

    fn sensor(id: &str, debt: &str, total: &str) -> SensorRecord {
        let account: Account = serde_json::from_value(json!({
            "id": id,
            "contracts": [{"debtAmount": debt, "totalAmount": total}]
        }))
        .unwrap();
        SensorRecord::build(&account, "user@example.com", None)
    }

    #[test]
    fn gauges_follow_the_latest_pass() {
        collect(&[sensor("1", "5", "1500"), sensor("2", "n/a", "12.5")]);
        let output = read().unwrap();

        assert!(output.contains(r#"account_debt{account_id="1"} 5"#), "{}", output);
        assert!(output.contains(r#"account_debt{account_id="2"} 0"#), "{}", output);
        assert!(output.contains(r#"account_total_due{account_id="1"} 1500"#), "{}", output);
        assert!(output.contains(r#"account_total_due{account_id="2"} 12.5"#), "{}", output);

        collect(&[sensor("1", "7", "1500")]);
        let output = read().unwrap();

        assert!(output.contains(r#"account_debt{account_id="1"} 7"#), "{}", output);
        assert!(!output.contains(r#"account_id="2""#), "{}", output);
    }
}
