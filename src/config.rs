//! Configuration primitives for the PMW3360 driver.

use crate::params::{Cpi, PowerProfile, SromCheck};

/// User-facing configuration for the PMW3360 sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Resolution applied at the end of the power-up sequence.
    pub initial_cpi: u16,
    /// `Config2` profile written once the firmware runs.
    pub power_profile: PowerProfile,
    /// Post-upload `SROM_ID` verification policy.
    pub srom_check: SromCheck,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is valid according to datasheet rules.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if Cpi::new(self.initial_cpi).is_none() {
            return Err(ConfigError::CpiOutOfRange);
        }

        Ok(())
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the resolution applied during bring-up.
    pub fn initial_cpi(mut self, cpi: u16) -> Self {
        self.config.initial_cpi = cpi;
        self
    }

    /// Selects the `Config2` power profile.
    pub fn power_profile(mut self, profile: PowerProfile) -> Self {
        self.config.power_profile = profile;
        self
    }

    /// Selects how `SROM_ID` is verified after the upload.
    pub fn srom_check(mut self, check: SromCheck) -> Self {
        self.config.srom_check = check;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_cpi: Cpi::default().value(),
            power_profile: PowerProfile::Wired,
            srom_check: SromCheck::Skip,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Initial resolution lies outside the range `Config1` can encode.
    CpiOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.initial_cpi, 2_200);
        assert_eq!(config.power_profile, PowerProfile::Wired);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = Config::new()
            .initial_cpi(800)
            .power_profile(PowerProfile::Wireless)
            .srom_check(SromCheck::Expect(0x04))
            .build();

        assert_eq!(config.initial_cpi, 800);
        assert_eq!(config.power_profile, PowerProfile::Wireless);
        assert_eq!(config.srom_check, SromCheck::Expect(0x04));
    }

    #[test]
    fn out_of_range_cpi_fails_validation() {
        let config = Config::new().initial_cpi(50).build();
        assert_eq!(config.validate(), Err(ConfigError::CpiOutOfRange));
    }
}
