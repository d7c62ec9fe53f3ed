//! Run configuration: report families, section layouts, entity mappings, and
//! rates. Loaded once per run and passed by reference into every component.

pub mod mapping;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::period::Cadence;
use crate::report::model::StyleToken;
use crate::{ClientError, ClientResult};

pub use mapping::{CombinePolicy, EntityMapping};

pub const CONFIG_FILE_NAME: &str = "msrsync.json";

const DEFAULT_SKIP_CATEGORIES: [&str; 2] = ["PTO", "Holiday"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub from: u32,
    pub to: u32,
}

impl RowRange {
    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.from..=self.to
    }

    pub fn contains(&self, row: u32) -> bool {
        self.rows().contains(&row)
    }
}

/// A total cell computed as the sum of a fixed row range in the same column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRule {
    pub row: u32,
    #[serde(flatten)]
    pub range: RowRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub header_row: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_row: Option<u32>,
    #[serde(default)]
    pub totals: Vec<TotalRule>,
    /// Rows painted with the status style when a period is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_range: Option<RowRange>,
    /// Used when the preceding period's cell carries no style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_style: Option<StyleToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupLayout {
    /// Section holding the weekly columns that roll up into a month.
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub cadence: Cadence,
    pub sections: BTreeMap<String, SectionLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup: Option<RollupLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 250,
        }
    }
}

fn default_skip_categories() -> Vec<String> {
    DEFAULT_SKIP_CATEGORIES
        .iter()
        .map(|value| value.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub families: BTreeMap<String, FamilyConfig>,
    #[serde(default)]
    pub mappings: Vec<EntityMapping>,
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
    #[serde(default = "default_skip_categories")]
    pub skip_categories: Vec<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl RunConfig {
    pub fn family(&self, family: &str) -> ClientResult<&FamilyConfig> {
        self.families
            .get(family)
            .ok_or_else(|| ClientError::unknown_family(family))
    }

    pub fn mappings_for<'a, 'f>(
        &'a self,
        family: &'f str,
    ) -> impl Iterator<Item = &'a EntityMapping> + use<'a, 'f> {
        self.mappings
            .iter()
            .filter(move |mapping| mapping.family == family)
    }

    /// Mapping override first, then the shared rate table.
    pub fn rate_for(&self, mapping: &EntityMapping) -> Option<f64> {
        mapping
            .rate
            .or_else(|| self.rates.get(&mapping.entity).copied())
    }

    pub fn from_json(body: &str, path: &Path) -> ClientResult<Self> {
        let config = serde_json::from_str::<Self>(body)
            .map_err(|error| ClientError::config_invalid(path, &error.to_string()))?;
        config
            .validate()
            .map_err(|detail| ClientError::config_invalid(path, &detail))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.retry.attempts == 0 {
            return Err("retry.attempts must be at least 1".to_string());
        }

        for (name, family) in &self.families {
            if family.sections.is_empty() {
                return Err(format!("family `{name}` declares no sections"));
            }
            for (section_name, layout) in &family.sections {
                validate_layout(name, section_name, layout)?;
            }
            if let Some(rollup) = &family.rollup {
                if family.cadence != Cadence::Weekly {
                    return Err(format!("family `{name}` rolls up but is not weekly"));
                }
                if !family.sections.contains_key(&rollup.section) {
                    return Err(format!(
                        "family `{name}` rolls up unknown section `{}`",
                        rollup.section
                    ));
                }
            }
        }

        let mut rollup_rows: BTreeMap<(&str, u32), &str> = BTreeMap::new();
        for mapping in &self.mappings {
            let Some(family) = self.families.get(&mapping.family) else {
                return Err(format!(
                    "mapping for `{}` references unknown family `{}`",
                    mapping.entity, mapping.family
                ));
            };
            let Some(layout) = family.sections.get(&mapping.section) else {
                return Err(format!(
                    "mapping for `{}` references unknown section `{}` in `{}`",
                    mapping.entity, mapping.section, mapping.family
                ));
            };
            if mapping.row == 0 {
                return Err(format!("mapping for `{}` uses row 0", mapping.entity));
            }
            if mapping.row == layout.header_row || Some(mapping.row) == layout.status_row {
                return Err(format!(
                    "mapping for `{}` targets a header or status row in `{}`",
                    mapping.entity, mapping.section
                ));
            }
            if family
                .rollup
                .as_ref()
                .is_some_and(|rollup| rollup.section == mapping.section)
                && self.rate_for(mapping).is_none()
            {
                return Err(format!(
                    "`{}` rolls up into invoicing but has no rate",
                    mapping.entity
                ));
            }
            if family
                .rollup
                .as_ref()
                .is_some_and(|rollup| rollup.section == mapping.section)
                && let Some(owner) = rollup_rows
                    .insert((mapping.family.as_str(), mapping.row), mapping.entity.as_str())
                && owner != mapping.entity
            {
                return Err(format!(
                    "rollup row {} in `{}` is shared by `{owner}` and `{}`",
                    mapping.row, mapping.family, mapping.entity
                ));
            }
        }

        Ok(())
    }
}

fn validate_layout(family: &str, section: &str, layout: &SectionLayout) -> Result<(), String> {
    if layout.header_row == 0 {
        return Err(format!("`{family}` / `{section}` header_row must be 1-based"));
    }
    for total in &layout.totals {
        if total.range.from > total.range.to {
            return Err(format!(
                "`{family}` / `{section}` total row {} has an empty range",
                total.row
            ));
        }
        if total.range.contains(total.row) {
            return Err(format!(
                "`{family}` / `{section}` total row {} sums itself",
                total.row
            ));
        }
    }
    if let Some(range) = layout.fill_range
        && range.from > range.to
    {
        return Err(format!("`{family}` / `{section}` fill_range is empty"));
    }
    Ok(())
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config").join(CONFIG_FILE_NAME)
}

pub fn load(home: &Path) -> ClientResult<RunConfig> {
    let path = config_path(home);
    if !path.exists() {
        return Err(ClientError::config_missing(&path));
    }
    let body = fs::read_to_string(&path)
        .map_err(|error| ClientError::config_invalid(&path, &error.to_string()))?;
    RunConfig::from_json(&body, &path)
}
