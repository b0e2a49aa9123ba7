// src/config.rs

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::standardize::date::DatePattern;

/// What to do with a phone number whose digit count is not exactly ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhonePolicy {
    /// Keep the stripped digit string as-is.
    #[default]
    PassThrough,
    /// Replace the value with null.
    Null,
    /// Hyphenate every complete run of ten digits, leaving the remainder attached.
    Partial,
}

/// Per-partner normalization rules.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerConfig {
    pub partner_code: String,
    pub delimiter: u8,
    pub dob_format: DatePattern,
    /// Source column → canonical column, in document order.
    pub column_mapping: Vec<(String, String)>,
    pub source_path: Option<PathBuf>,
    pub phone_policy: PhonePolicy,
}

#[derive(Deserialize)]
struct RawPartnerConfig {
    delimiter: String,
    dob_format: String,
    partner_code: String,
    column_mapping: Map<String, Value>,
    #[serde(default)]
    source_path: Option<PathBuf>,
    #[serde(default)]
    phone_policy: PhonePolicy,
}

/// All partners of one run, in the order the document lists them.
#[derive(Debug, Clone, Default)]
pub struct PartnerConfigs {
    partners: Vec<(String, PartnerConfig)>,
}

impl PartnerConfigs {
    /// Read and validate the JSON document at `path`.
    #[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| PipelineError::config(path, format!("cannot read file: {e}")))?;
        let configs = Self::parse(&text, path)?;
        info!(partners = configs.len(), "loaded partner config");
        Ok(configs)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, origin: &Path) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| PipelineError::config(origin, format!("invalid JSON: {e}")))?;
        let Value::Object(entries) = doc else {
            return Err(PipelineError::config(
                origin,
                "top level must be an object keyed by partner id",
            ));
        };

        let mut partners = Vec::with_capacity(entries.len());
        for (partner_id, entry) in entries {
            let cfg = partner_from_value(entry).map_err(|reason| {
                PipelineError::config(origin, format!("partner `{partner_id}`: {reason}"))
            })?;
            debug!(partner = %partner_id, code = %cfg.partner_code, "parsed partner entry");
            partners.push((partner_id, cfg));
        }
        Ok(Self { partners })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PartnerConfig)> {
        self.partners.iter().map(|(id, cfg)| (id.as_str(), cfg))
    }

    pub fn get(&self, partner_id: &str) -> Option<&PartnerConfig> {
        self.partners
            .iter()
            .find(|(id, _)| id == partner_id)
            .map(|(_, cfg)| cfg)
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

fn partner_from_value(entry: Value) -> std::result::Result<PartnerConfig, String> {
    let raw: RawPartnerConfig = serde_json::from_value(entry).map_err(|e| e.to_string())?;

    let delimiter = match raw.delimiter.as_bytes() {
        [b] if b.is_ascii() => *b,
        _ => {
            return Err(format!(
                "delimiter must be a single ASCII character, got {:?}",
                raw.delimiter
            ))
        }
    };

    let dob_format = DatePattern::compile(&raw.dob_format)?;

    let mut column_mapping = Vec::with_capacity(raw.column_mapping.len());
    for (source, target) in raw.column_mapping {
        match target {
            Value::String(target) => column_mapping.push((source, target)),
            other => {
                return Err(format!(
                    "column_mapping[{source:?}] must be a string, got {other}"
                ))
            }
        }
    }

    Ok(PartnerConfig {
        partner_code: raw.partner_code,
        delimiter,
        dob_format,
        column_mapping,
        source_path: raw.source_path,
        phone_policy: raw.phone_policy,
    })
}
