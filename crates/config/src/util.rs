// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use figment::Figment;
use serde::de::DeserializeOwned;

/// A part of the configuration which can be loaded on its own from a
/// [`Figment`]
pub trait ConfigurationSection: Sized + DeserializeOwned {
    /// Where this section lives, relative to the root of the configuration.
    /// `None` means the section is the root itself.
    const PATH: Option<&'static str> = None;

    /// Check the values of the section once it has been deserialized
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    fn validate(
        &self,
        _figment: &Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        Ok(())
    }

    /// Deserialize and validate the section
    ///
    /// # Errors
    ///
    /// Returns an error if the section is missing, malformed or invalid
    fn extract(
        figment: &Figment,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let this: Self = match Self::PATH {
            Some(path) => figment.extract_inner(path)?,
            None => figment.extract()?,
        };

        this.validate(figment)?;
        Ok(this)
    }
}

/// Extension of [`ConfigurationSection`] for sections which can be omitted
/// entirely
pub trait ConfigurationSectionExt: ConfigurationSection + Default {
    /// Deserialize and validate the section, falling back to its default
    /// value when it is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the section is present but malformed or invalid
    fn extract_or_default(
        figment: &Figment,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let this: Self = match Self::PATH {
            Some(path) if !figment.contains(path) => return Ok(Self::default()),
            Some(path) => figment.extract_inner(path)?,
            None => figment.extract()?,
        };

        this.validate(figment)?;
        Ok(this)
    }
}

impl<T: ConfigurationSection + Default> ConfigurationSectionExt for T {}
