// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wahub config` command: print the effective configuration.

use wahub_config::WahubConfig;
use wahub_core::WahubError;

/// Print the merged configuration as JSON with secrets redacted.
pub fn run_config(config: &WahubConfig) -> Result<(), WahubError> {
    let mut value = serde_json::to_value(config)
        .map_err(|e| WahubError::Serialization(e.to_string()))?;

    if let Some(token) = value.pointer_mut("/gateway/bearer_token") {
        if !token.is_null() {
            *token = serde_json::Value::String("[redacted]".to_string());
        }
    }

    let rendered = serde_json::to_string_pretty(&value)
        .map_err(|e| WahubError::Serialization(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_reach_stdout() {
        let mut config = WahubConfig::default();
        config.gateway.bearer_token = Some("super-secret".into());

        let mut value = serde_json::to_value(&config).unwrap();
        if let Some(token) = value.pointer_mut("/gateway/bearer_token") {
            *token = serde_json::Value::String("[redacted]".to_string());
        }
        let rendered = serde_json::to_string_pretty(&value).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn run_config_succeeds_on_defaults() {
        run_config(&WahubConfig::default()).unwrap();
    }
}
