use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::defaults::default_policy;
use crate::errors::PolicyError;
use crate::model::{LoadedPolicy, PolicySource};
use crate::overrides::apply_override;

const ENV_PREFIX: &str = "TOURGUIDE_POLICY__";
const ENV_JSON: &str = "TOURGUIDE_POLICY_OVERRIDE_JSON";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// Defaults, then the optional file, then environment overrides.
pub fn load_policy(path: Option<&Path>) -> Result<LoadedPolicy, PolicyError> {
    let mut options = LoadOptions::default();
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    options.include_env = true;
    load_policy_with_options(&options)
}

pub fn load_policy_with_options(options: &LoadOptions) -> Result<LoadedPolicy, PolicyError> {
    let mut loaded = LoadedPolicy {
        policy: default_policy(),
        provenance: BTreeMap::new(),
    };
    bootstrap_builtin_provenance(&mut loaded)?;

    for path in &options.paths {
        if !path.exists() {
            return Err(PolicyError::Io(format!(
                "policy file not found: {}",
                path.display()
            )));
        }
        let overlays = overlays_from_file(path)?;
        apply_overlays(&mut loaded, overlays)?;
    }

    if options.include_env {
        let overlays = overlays_from_env()?;
        apply_overlays(&mut loaded, overlays)?;
    }

    loaded.policy.validate()?;
    Ok(loaded)
}

struct PolicyOverlay {
    path: String,
    value: Value,
    source: PolicySource,
}

fn apply_overlays(loaded: &mut LoadedPolicy, overlays: Vec<PolicyOverlay>) -> Result<(), PolicyError> {
    for overlay in overlays {
        if apply_override(&mut loaded.policy, &overlay.path, &overlay.value)? {
            debug!(path = %overlay.path, source = ?overlay.source, "policy value overridden");
        }
        loaded.provenance.insert(overlay.path, overlay.source);
    }
    Ok(())
}

fn overlays_from_file(path: &Path) -> Result<Vec<PolicyOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, PolicySource::File))
}

fn overlays_from_env() -> Result<Vec<PolicyOverlay>, PolicyError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overlays.push(PolicyOverlay {
                path,
                value: parse_env_value(&raw),
                source: PolicySource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_JSON) {
        if !raw_json.trim().is_empty() {
            let json_value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
            overlays.extend(flatten_value(json_value, None, PolicySource::Env));
        }
    }

    Ok(overlays)
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>, source: PolicySource) -> Vec<PolicyOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment,
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => match prefix {
            Some(path) => vec![PolicyOverlay {
                path,
                value: other,
                source,
            }],
            None => Vec::new(),
        },
    }
}

fn bootstrap_builtin_provenance(loaded: &mut LoadedPolicy) -> Result<(), PolicyError> {
    let value = serde_json::to_value(&loaded.policy)
        .map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    for overlay in flatten_value(value, None, PolicySource::Builtin) {
        loaded.provenance.insert(overlay.path, overlay.source);
    }
    Ok(())
}
