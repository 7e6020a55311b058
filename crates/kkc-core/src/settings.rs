//! Conversion settings loaded from TOML.
//!
//! - `Settings::default()` parses the embedded `default_settings.toml`
//! - `parse_settings_toml(toml_content)` parses and validates a custom file
//!
//! Settings are a plain value owned by the converter; there is no
//! process-wide instance, so tests can run side by side with different
//! configurations.

use serde::Deserialize;

use crate::converter::BoundaryCheck;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cost: CostSettings,
    pub nbest: NBestSettings,
    pub correction: CorrectionSettings,
    pub segments: SegmentsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // build.rs rejects an invalid embedded file, and the test suite
        // parses it, so this cannot fail at runtime.
        parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap_or_else(|e| {
            panic!("embedded default_settings.toml is invalid: {e}");
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostSettings {
    pub unknown_word_cost: i64,
    pub unknown_id: u16,
    pub key_correction_penalty: i64,
    pub exact_match_bonus: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NBestSettings {
    pub max_candidates: usize,
    pub max_cost_diff: i64,
    pub max_structure_cost: i64,
    pub max_trial: usize,
    pub boundary_check: BoundaryCheck,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionSettings {
    pub enabled: bool,
    pub max_key_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsSettings {
    pub max_history_segments_size: usize,
    pub insert_dummy_candidates: bool,
    pub max_key_len: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_non_negative {
        ($section:ident . $field:ident) => {
            if s.$section.$field < 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_non_negative!(cost.unknown_word_cost);
    check_non_negative!(cost.key_correction_penalty);
    check_non_negative!(cost.exact_match_bonus);
    if s.cost.unknown_id == 0 {
        return Err(SettingsError::InvalidValue {
            field: "cost.unknown_id".to_string(),
            reason: "id 0 is reserved for sentence boundaries".to_string(),
        });
    }

    check_positive_usize!(nbest.max_candidates);
    check_non_negative!(nbest.max_cost_diff);
    check_non_negative!(nbest.max_structure_cost);
    check_positive_usize!(nbest.max_trial);

    check_positive_usize!(correction.max_key_len);

    check_positive_usize!(segments.max_key_len);

    Ok(())
}
