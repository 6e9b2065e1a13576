use crate::error::{HarnessError, Result};
use crate::scenario::{VarMap, VarValue};

/// Parse a `NAME=VALUE` override. `VALUE` is decoded as JSON when it parses,
/// otherwise taken as a plain string.
pub fn parse_var(raw: &str) -> Result<(String, VarValue)> {
    let (name, value) = raw.split_once('=').ok_or_else(|| {
        HarnessError::Config(format!("Variable override '{}' must be NAME=VALUE", raw))
    })?;

    validate_var_name(name)?;

    let value = serde_json::from_str::<VarValue>(value).unwrap_or_else(|_| value.into());
    Ok((name.to_string(), value))
}

pub fn parse_vars(raw: &[String]) -> Result<VarMap> {
    raw.iter().map(|r| parse_var(r)).collect()
}

pub fn validate_var_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HarnessError::Config(
            "Variable name cannot be empty".to_string(),
        ));
    }

    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(HarnessError::Config(format!(
                "Variable name '{}' must start with a letter or '_'",
                name
            )));
        }
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(HarnessError::Config(format!(
            "Variable name '{}' may only contain letters, digits, '_' and '-'",
            name
        )));
    }

    Ok(())
}

/// Prefixes end up in AWS resource names and in a directory name.
pub fn validate_name_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(HarnessError::Config(
            "Name prefix cannot be empty".to_string(),
        ));
    }

    if prefix.starts_with('-') || prefix.ends_with('-') {
        return Err(HarnessError::Config(
            "Name prefix cannot start or end with '-'".to_string(),
        ));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(HarnessError::Config(format!(
            "Name prefix '{}' may only contain lowercase letters, digits and '-'",
            prefix
        )));
    }

    Ok(())
}
