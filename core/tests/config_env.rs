use audit_report_core::config::ReportConfig;
use std::collections::BTreeMap;
use std::time::Duration;
use time::macros::datetime;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

const BASE: &[(&str, &str)] = &[
    ("ASSESSMENT_ID", "a-weekly-soc2"),
    ("REPORT_DESTINATION", "/var/reports"),
    ("REPORT_RECIPIENTS", "ciso@example.com, audit@example.com"),
    ("SENDER_EMAIL", "reports@example.com"),
];

#[test]
fn defaults_apply_when_optional_keys_are_absent() {
    let cfg = ReportConfig::from_lookup(env(BASE)).unwrap();
    assert_eq!(cfg.assessment_id, "a-weekly-soc2");
    assert_eq!(cfg.recipients, vec!["ciso@example.com", "audit@example.com"]);
    assert_eq!(cfg.freshness_days, 7);
    assert_eq!(cfg.link_expiry_days, 7);
    assert_eq!(cfg.workers, 4);
    assert_eq!(cfg.call_timeout_ms, 30_000);
    assert_eq!(cfg.link_expiry().whole_seconds(), 604_800);

    let opts = cfg.aggregation_options(datetime!(2024-03-15 00:30 UTC));
    assert_eq!(opts.call_timeout, Duration::from_secs(30));
    assert_eq!(opts.cutoff_date(), time::macros::date!(2024-03-08));
}

#[test]
fn legacy_bucket_key_is_accepted() {
    let mut pairs: Vec<(&str, &str)> = BASE
        .iter()
        .copied()
        .filter(|(k, _)| *k != "REPORT_DESTINATION")
        .collect();
    pairs.push(("S3_BUCKET", "audit-reports-bucket"));
    let cfg = ReportConfig::from_lookup(env(&pairs)).unwrap();
    assert_eq!(cfg.destination, "audit-reports-bucket");
}

#[test]
fn overrides_are_parsed() {
    let mut pairs = BASE.to_vec();
    pairs.extend([
        ("EVIDENCE_FRESHNESS_DAYS", "14"),
        ("EVIDENCE_WORKERS", "1"),
        ("SOURCE_CALL_TIMEOUT_MS", "500"),
    ]);
    let cfg = ReportConfig::from_lookup(env(&pairs)).unwrap();
    assert_eq!(cfg.freshness_days, 14);
    assert_eq!(cfg.workers, 1);
    assert_eq!(cfg.call_timeout_ms, 500);
}

#[test]
fn missing_required_keys_fail() {
    for missing in ["ASSESSMENT_ID", "REPORT_DESTINATION", "REPORT_RECIPIENTS", "SENDER_EMAIL"] {
        let pairs: Vec<(&str, &str)> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != missing)
            .collect();
        let err = ReportConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains(missing), "{}: {}", missing, err);
    }
}

#[test]
fn bad_addresses_and_numbers_are_rejected() {
    let mut pairs = BASE.to_vec();
    pairs[2] = ("REPORT_RECIPIENTS", "ciso@example.com, not-an-address");
    assert!(ReportConfig::from_lookup(env(&pairs)).is_err());

    let mut pairs = BASE.to_vec();
    pairs[2] = ("REPORT_RECIPIENTS", " , ");
    assert!(ReportConfig::from_lookup(env(&pairs)).is_err());

    let mut pairs = BASE.to_vec();
    pairs.push(("EVIDENCE_FRESHNESS_DAYS", "0"));
    assert!(ReportConfig::from_lookup(env(&pairs)).is_err());
}

#[test]
fn day_windows_are_capped() {
    for key in ["EVIDENCE_FRESHNESS_DAYS", "REPORT_LINK_EXPIRY_DAYS"] {
        let mut pairs = BASE.to_vec();
        pairs.push((key, "5000000"));
        let err = ReportConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains(key), "{}", err);
    }

    let mut pairs = BASE.to_vec();
    pairs.push(("EVIDENCE_FRESHNESS_DAYS", "3650"));
    let cfg = ReportConfig::from_lookup(env(&pairs)).unwrap();
    let opts = cfg.aggregation_options(datetime!(2024-03-15 12:00 UTC));
    assert_eq!(opts.cutoff_date(), time::macros::date!(2014-03-18));
}
