//! Generator settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::barcode::{DEFAULT_HEIGHT_PX, DEFAULT_MODULE_WIDTH_PX};

pub const DEFAULT_TEMPLATE_PATH: &str = "assets/templates/invoice_template.docx";

/// What to do when the invoice number cannot be stamped as a barcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarcodePolicy {
    /// Fail the whole generation.
    #[default]
    Required,
    /// Log a warning and produce the document without a barcode.
    BestEffort,
}

impl FromStr for BarcodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            other => Err(format!("unknown barcode policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub template_path: PathBuf,
    pub barcode_policy: BarcodePolicy,
    pub barcode_height_px: u32,
    pub barcode_module_width_px: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            barcode_policy: BarcodePolicy::default(),
            barcode_height_px: DEFAULT_HEIGHT_PX,
            barcode_module_width_px: DEFAULT_MODULE_WIDTH_PX,
        }
    }
}

fn parse_or_default<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "invalid setting; using default");
                default
            }
        },
    }
}

fn positive(key: &str, raw: Option<String>, default: u32) -> u32 {
    match parse_or_default(key, raw, default) {
        0 => {
            tracing::warn!(key, "setting must be positive; using default");
            default
        }
        value => value,
    }
}

impl GeneratorConfig {
    /// `FACTORING_TEMPLATE_PATH`, `FACTORING_BARCODE_POLICY`, `FACTORING_BARCODE_HEIGHT`
    /// and `FACTORING_BARCODE_MODULE_WIDTH`; anything unset or invalid keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            template_path: lookup("FACTORING_TEMPLATE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            barcode_policy: parse_or_default(
                "FACTORING_BARCODE_POLICY",
                lookup("FACTORING_BARCODE_POLICY"),
                defaults.barcode_policy,
            ),
            barcode_height_px: positive(
                "FACTORING_BARCODE_HEIGHT",
                lookup("FACTORING_BARCODE_HEIGHT"),
                defaults.barcode_height_px,
            ),
            barcode_module_width_px: positive(
                "FACTORING_BARCODE_MODULE_WIDTH",
                lookup("FACTORING_BARCODE_MODULE_WIDTH"),
                defaults.barcode_module_width_px,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> GeneratorConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        GeneratorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), GeneratorConfig::default());
        assert_eq!(GeneratorConfig::default().barcode_policy, BarcodePolicy::Required);
    }

    #[test]
    fn reads_every_setting() {
        let cfg = config(&[
            ("FACTORING_TEMPLATE_PATH", "/srv/invoice.docx"),
            ("FACTORING_BARCODE_POLICY", "best-effort"),
            ("FACTORING_BARCODE_HEIGHT", "120"),
            ("FACTORING_BARCODE_MODULE_WIDTH", " 3 "),
        ]);
        assert_eq!(cfg.template_path, PathBuf::from("/srv/invoice.docx"));
        assert_eq!(cfg.barcode_policy, BarcodePolicy::BestEffort);
        assert_eq!(cfg.barcode_height_px, 120);
        assert_eq!(cfg.barcode_module_width_px, 3);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[
            ("FACTORING_BARCODE_POLICY", "sometimes"),
            ("FACTORING_BARCODE_HEIGHT", "0"),
            ("FACTORING_BARCODE_MODULE_WIDTH", "wide"),
        ]);
        assert_eq!(cfg, GeneratorConfig::default());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("REQUIRED".parse::<BarcodePolicy>(), Ok(BarcodePolicy::Required));
        assert_eq!("Best_Effort".parse::<BarcodePolicy>(), Ok(BarcodePolicy::BestEffort));
        assert!("".parse::<BarcodePolicy>().is_err());
    }
}
