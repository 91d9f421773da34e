use std::env;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::json;

use crate::defaults::default_policy;
use crate::errors::PolicyError;
use crate::loader::{load_policy, load_policy_with_options, LoadOptions};
use crate::model::PolicySource;
use crate::overrides::apply_override;

static ENV_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn default_policy_matches_documented_constants() {
    let policy = default_policy();
    assert_eq!(policy.placement.tooltip_width, 384.0);
    assert_eq!(policy.placement.tooltip_height, 400.0);
    assert_eq!(policy.placement.highlight_padding, 4.0);
    assert_eq!(policy.sync.max_attempts, 3);
    assert_eq!(policy.timing.completion_ms, 1_400);
    assert!(policy.validate().is_ok());
}

#[test]
fn tab_selector_substitutes_label() {
    let policy = default_policy();
    assert_eq!(
        policy.sync.tab_selector("Lookalike"),
        "[data-tour-tab=\"Lookalike\"]"
    );
}

#[test]
fn load_policy_applies_file_overlay() {
    let _guard = ENV_GUARD.lock();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("tour.yaml");
    std::fs::write(
        &file_path,
        r#"placement:
  nav_rail_width: 0
  tooltip_width: 320
sync:
  max_attempts: 5
"#,
    )
    .unwrap();

    let loaded = load_policy_with_options(&LoadOptions {
        paths: vec![file_path],
        include_env: false,
    })
    .unwrap();
    assert_eq!(loaded.policy.placement.nav_rail_width, 0.0);
    assert_eq!(loaded.policy.placement.tooltip_width, 320.0);
    assert_eq!(loaded.policy.sync.max_attempts, 5);
    assert_eq!(
        loaded.provenance.get("sync.max_attempts"),
        Some(&PolicySource::File)
    );
    assert_eq!(
        loaded.provenance.get("sync.settle_ms"),
        Some(&PolicySource::Builtin)
    );
}

#[test]
fn env_overrides_win_over_defaults() {
    let _guard = ENV_GUARD.lock();
    env::set_var("TOURGUIDE_POLICY__TIMING__COMPLETION_MS", "900");
    env::set_var(
        "TOURGUIDE_POLICY_OVERRIDE_JSON",
        r#"{"sync": {"retry_delay_ms": 120}}"#,
    );
    let loaded = load_policy(None);
    env::remove_var("TOURGUIDE_POLICY__TIMING__COMPLETION_MS");
    env::remove_var("TOURGUIDE_POLICY_OVERRIDE_JSON");

    let loaded = loaded.unwrap();
    assert_eq!(loaded.policy.timing.completion_ms, 900);
    assert_eq!(loaded.policy.sync.retry_delay_ms, 120);
    assert_eq!(
        loaded.provenance.get("timing.completion_ms"),
        Some(&PolicySource::Env)
    );
}

#[test]
fn missing_file_is_an_error() {
    let _guard = ENV_GUARD.lock();
    let err = load_policy_with_options(&LoadOptions {
        paths: vec!["/definitely/not/here.yaml".into()],
        include_env: false,
    })
    .unwrap_err();
    assert!(matches!(err, PolicyError::Io(_)));
}

#[test]
fn invalid_values_are_rejected() {
    let mut policy = default_policy();
    assert!(matches!(
        apply_override(&mut policy, "sync.max_attempts", &json!(300)),
        Err(PolicyError::InvalidValue(_))
    ));
    assert!(matches!(
        apply_override(&mut policy, "sync.unknown", &json!(1)),
        Err(PolicyError::UnsupportedPath(_))
    ));
    assert_eq!(
        apply_override(&mut policy, "placement.gap", &json!(20.0)).unwrap(),
        false
    );

    apply_override(&mut policy, "sync.max_attempts", &json!(0)).unwrap();
    assert!(matches!(policy.validate(), Err(PolicyError::Invalid(_))));

    let mut policy = default_policy();
    policy.placement.max_width_ratio = 1.5;
    assert!(policy.validate().is_err());

    let mut policy = default_policy();
    policy.sync.tab_selector_template = "[role=tab]".into();
    assert!(policy.validate().is_err());
}
