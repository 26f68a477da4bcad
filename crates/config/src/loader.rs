use std::{fmt::Write, path::Path, str::FromStr};

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use toml::Value;

use crate::{Config, RateLimitQuota};

/// Fields that may reference an unset environment variable. When expansion
/// fails for one of these, the field is dropped and the provider counts as
/// unconfigured.
const OPTIONAL_FIELDS: &[&str] = &[
    "llm.anthropic.api_key",
    "llm.anthropic.base_url",
    "llm.openrouter.api_key",
    "llm.openrouter.base_url",
];

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config = parse(&content)?;

    for warning in validate(&config)? {
        log::warn!("{warning}");
    }

    Ok(config)
}

pub fn parse(content: &str) -> anyhow::Result<Config> {
    let mut raw_config: Value = toml::from_str(content)?;
    let mut unresolved = Vec::new();

    expand_dynamic_strings(&mut Vec::new(), &mut unresolved, &mut raw_config)?;

    for path in unresolved {
        remove_field(&mut raw_config, &path);
    }

    Ok(Config::deserialize(raw_config)?)
}

pub fn validate(config: &Config) -> anyhow::Result<Vec<String>> {
    let mut warnings = Vec::new();
    let llm = &config.llm;

    if !llm.enabled() {
        warnings.push("The chat gateway is disabled, only the health endpoint will be served.".to_string());
        return Ok(warnings);
    }

    if !llm.has_providers() {
        warnings.push(
            "No LLM provider has an API key configured. Chat requests will fail with 503 until \
             llm.anthropic.api_key or llm.openrouter.api_key is set."
                .to_string(),
        );
    }

    if llm.default_model.trim().is_empty() {
        bail!("llm.default_model must not be empty");
    }

    if !llm.path.starts_with('/') {
        bail!("llm.path must start with '/', got '{}'", llm.path);
    }

    if llm.rate_limits.enabled {
        validate_quota("llm.rate_limits.global", llm.rate_limits.global.as_ref())?;
        validate_quota("llm.rate_limits.per_ip", llm.rate_limits.per_ip.as_ref())?;

        if llm.rate_limits.global.is_none() && llm.rate_limits.per_ip.is_none() {
            warnings.push("Rate limiting is enabled but neither a global nor a per-IP quota is defined.".to_string());
        }
    }

    Ok(warnings)
}

fn validate_quota(name: &str, quota: Option<&RateLimitQuota>) -> anyhow::Result<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    if quota.limit == 0 {
        bail!("{name}.limit must be greater than zero");
    }

    if quota.duration.is_zero() {
        bail!("{name}.duration must be greater than zero");
    }

    Ok(())
}

fn expand_dynamic_strings<'a>(
    path: &mut Vec<Result<&'a str, usize>>,
    unresolved: &mut Vec<String>,
    value: &'a mut Value,
) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => {
                let mut p = String::new();

                for segment in path.iter() {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]")?,
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                if OPTIONAL_FIELDS.contains(&p.as_str()) {
                    log::debug!("Skipping optional field '{p}': {err}");
                    unresolved.push(p);
                } else {
                    bail!("Failed to expand dynamic string at path '{p}': {err}");
                }
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, unresolved, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, unresolved, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

fn remove_field(config: &mut Value, path: &str) {
    let mut parts: Vec<&str> = path.split('.').collect();

    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = config;

    for part in parts {
        match current.as_table_mut().and_then(|table| table.get_mut(part)) {
            Some(value) => current = value,
            None => return,
        }
    }

    if let Some(table) = current.as_table_mut() {
        table.remove(last);
    }
}
