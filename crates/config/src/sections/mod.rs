// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod telemetry;
mod vite;

pub use self::{
    telemetry::TelemetryConfig,
    vite::{EnvironmentSignals, MissingFilesPolicy, SettingsError, ViteConfig, ViteMode},
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Configuration of the Vite integration
    #[serde(default)]
    pub vite: ViteConfig,

    /// Configuration related to logging
    #[serde(default, skip_serializing_if = "TelemetryConfig::is_default")]
    pub telemetry: TelemetryConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.vite.validate(figment)?;
        self.telemetry.validate(figment)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };

    use super::*;

    #[test]
    fn load_empty_config() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "{}")?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = RootConfig::extract(&figment).unwrap();

            assert_eq!(config.vite.assets_path, "dist");
            assert!(config.telemetry.filter.is_none());

            Ok(())
        });
    }

    #[test]
    fn reject_invalid_section() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    vite:
                      dev_server_url: ftp://localhost:5173
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(RootConfig::extract(&figment).is_err());

            Ok(())
        });
    }
}
