//! Decoder service configuration.

use anyhow::{bail, Context, Result};
use projection::{GeostationaryNavigator, GeostationaryParameters, ScanGeometry};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Top-level decoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Satellite view to reproject product footprints into
    pub navigation: Option<NavigationConfig>,

    /// Number of files decoded concurrently (0 = one per core)
    pub parallelism: usize,

    /// Include calibrated value statistics in the summaries
    pub calibrate: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            navigation: None,
            parallelism: 0,
            calibrate: true,
        }
    }
}

/// Geostationary view used for footprint reprojection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Sub-satellite longitude (degrees)
    pub sub_lon: f64,
    #[serde(default = "default_sweep")]
    pub sweep: ScanGeometry,
    #[serde(default)]
    pub ellipsoid: Ellipsoid,
}

fn default_sweep() -> ScanGeometry {
    ScanGeometry::Goes
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            sub_lon: -75.0,
            sweep: default_sweep(),
            ellipsoid: Ellipsoid::default(),
        }
    }
}

/// Earth model for the navigation section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ellipsoid {
    #[default]
    Grs80,
    Wgs84,
    /// Meteosat Second Generation constants; fixes the height as well
    Msg,
}

impl FromStr for Ellipsoid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grs80" => Ok(Ellipsoid::Grs80),
            "wgs84" => Ok(Ellipsoid::Wgs84),
            "msg" => Ok(Ellipsoid::Msg),
            other => bail!("unknown ellipsoid '{}'", other),
        }
    }
}

impl NavigationConfig {
    pub fn parameters(&self) -> GeostationaryParameters {
        match self.ellipsoid {
            Ellipsoid::Grs80 => GeostationaryParameters::grs80(self.sub_lon, self.sweep),
            Ellipsoid::Wgs84 => GeostationaryParameters::wgs84(self.sub_lon, self.sweep),
            Ellipsoid::Msg => GeostationaryParameters {
                sub_lon: self.sub_lon,
                sweep: self.sweep,
                ..GeostationaryParameters::msg()
            },
        }
    }

    pub fn navigator(&self) -> Result<GeostationaryNavigator> {
        GeostationaryNavigator::new(self.parameters()).context("invalid navigation section")
    }
}

impl DecoderConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: DecoderConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Defaults with environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `GINI_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sub_lon = lookup("GINI_SUB_LON");
        let sweep = lookup("GINI_SWEEP");
        let ellipsoid = lookup("GINI_ELLIPSOID");

        if sub_lon.is_some() || sweep.is_some() || ellipsoid.is_some() {
            let mut nav = self.navigation.unwrap_or_default();
            if let Some(v) = sub_lon {
                nav.sub_lon = v
                    .parse()
                    .with_context(|| format!("GINI_SUB_LON is not a number: {}", v))?;
            }
            if let Some(v) = sweep {
                nav.sweep = v.parse().context("GINI_SWEEP")?;
            }
            if let Some(v) = ellipsoid {
                nav.ellipsoid = v.parse()?;
            }
            self.navigation = Some(nav);
        }

        if let Some(v) = lookup("GINI_PARALLELISM") {
            self.parallelism = v
                .parse()
                .with_context(|| format!("GINI_PARALLELISM is not a count: {}", v))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(nav) = &self.navigation {
            if !nav.sub_lon.is_finite() || nav.sub_lon.abs() > 180.0 {
                bail!("sub_lon must be within [-180, 180], got {}", nav.sub_lon);
            }
            nav.navigator()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "navigation:\n  sub_lon: -137.2\n  sweep: goes\n  ellipsoid: wgs84\nparallelism: 4"
        )
        .unwrap();

        let config = DecoderConfig::from_yaml(file.path()).unwrap();
        let nav = config.navigation.unwrap();
        assert_eq!(nav.sub_lon, -137.2);
        assert_eq!(nav.ellipsoid, Ellipsoid::Wgs84);
        assert_eq!(config.parallelism, 4);
        assert!(config.calibrate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "navigation:\n  sub_lon: 0.0").unwrap();
        let config = DecoderConfig::from_yaml(file.path()).unwrap();
        let nav = config.navigation.unwrap();
        assert_eq!(nav.sweep, ScanGeometry::Goes);
        assert_eq!(nav.ellipsoid, Ellipsoid::Grs80);
        assert_eq!(config.parallelism, 0);
    }

    #[test]
    fn test_missing_file() {
        assert!(DecoderConfig::from_yaml("/nonexistent/gini.yaml").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = DecoderConfig::default()
            .with_overrides(lookup(&[
                ("GINI_SUB_LON", "9.5"),
                ("GINI_SWEEP", "geos"),
                ("GINI_ELLIPSOID", "msg"),
                ("GINI_PARALLELISM", "2"),
            ]))
            .unwrap();
        let nav = config.navigation.unwrap();
        assert_eq!(nav.sub_lon, 9.5);
        assert_eq!(nav.sweep, ScanGeometry::Geos);
        assert_eq!(nav.parameters().req_km, 6378.169);
        assert_eq!(config.parallelism, 2);
    }

    #[test]
    fn test_no_overrides_keeps_navigation_off() {
        let config = DecoderConfig::default().with_overrides(lookup(&[])).unwrap();
        assert!(config.navigation.is_none());
    }

    #[test]
    fn test_bad_override() {
        assert!(DecoderConfig::default()
            .with_overrides(lookup(&[("GINI_SWEEP", "sideways")]))
            .is_err());
        assert!(DecoderConfig::default()
            .with_overrides(lookup(&[("GINI_PARALLELISM", "-1")]))
            .is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = DecoderConfig {
            navigation: Some(NavigationConfig {
                sub_lon: 200.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
