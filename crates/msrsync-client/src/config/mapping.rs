use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RunConfig;
use crate::report::model::StyleToken;
use crate::sources::hours::HoursTable;
use crate::{ClientError, ClientResult};

/// How mappings that share one row combine their hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// The row belongs to this mapping alone; a second value is a conflict.
    #[default]
    Exclusive,
    /// The row is a combined row; every `sum` mapping adds into it.
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub entity: String,
    pub charge_code: String,
    pub family: String,
    pub section: String,
    pub row: u32,
    /// Fixed style applied instead of the carried-forward one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleToken>,
    #[serde(default)]
    pub combine: CombinePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowTarget<'a> {
    pub section: &'a str,
    pub row: u32,
    pub mapping: &'a EntityMapping,
}

/// One value bound for one row of one section.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub section: String,
    pub row: u32,
    pub hours: f64,
    pub style: Option<StyleToken>,
    /// `(entity, charge_code)` pairs feeding this value.
    pub sources: Vec<(String, String)>,
}

pub fn resolve<'a>(
    config: &'a RunConfig,
    entity: &str,
    charge_code: &str,
    family: &str,
) -> ClientResult<RowTarget<'a>> {
    let matches = config
        .mappings_for(family)
        .filter(|mapping| mapping.entity == entity && mapping.charge_code == charge_code)
        .collect::<Vec<&EntityMapping>>();

    match matches.as_slice() {
        [] => Err(ClientError::unmapped_entity(entity, charge_code, Some(family))),
        [mapping] => Ok(RowTarget {
            section: &mapping.section,
            row: mapping.row,
            mapping,
        }),
        many => {
            let rows = many
                .iter()
                .map(|mapping| (mapping.section.clone(), mapping.row))
                .collect::<Vec<(String, u32)>>();
            Err(ClientError::ambiguous_entity_mapping(
                entity,
                charge_code,
                family,
                &rows,
            ))
        }
    }
}

fn mapped_anywhere(config: &RunConfig, entity: &str, charge_code: &str) -> bool {
    config
        .mappings
        .iter()
        .any(|mapping| mapping.entity == entity && mapping.charge_code == charge_code)
}

/// Turns aggregated hours into row writes for one family.
///
/// Every mapping of the family produces a write (idle rows get `0`). Hours for
/// pairs that no family maps are rejected; pairs owned by other families are
/// left for their own runs.
pub fn plan(config: &RunConfig, hours: &HoursTable, family: &str) -> ClientResult<Vec<PlannedWrite>> {
    for (entity, charge_code, _) in hours.entries() {
        if !mapped_anywhere(config, entity, charge_code) {
            return Err(ClientError::unmapped_entity(entity, charge_code, None));
        }
        if config
            .mappings_for(family)
            .all(|mapping| mapping.entity != entity || mapping.charge_code != charge_code)
        {
            debug!(entity, charge_code, family, "hours belong to another family");
        }
    }

    let mut exclusive = Vec::new();
    let mut combined: BTreeMap<(String, u32), PlannedWrite> = BTreeMap::new();

    for mapping in config.mappings_for(family) {
        let target = resolve(config, &mapping.entity, &mapping.charge_code, family)?;
        let value = hours.get(&mapping.entity, &mapping.charge_code);
        let source = (mapping.entity.clone(), mapping.charge_code.clone());

        match target.mapping.combine {
            CombinePolicy::Exclusive => exclusive.push(PlannedWrite {
                section: target.section.to_string(),
                row: target.row,
                hours: value,
                style: target.mapping.style.clone(),
                sources: vec![source],
            }),
            CombinePolicy::Sum => {
                let entry = combined
                    .entry((target.section.to_string(), target.row))
                    .or_insert_with(|| PlannedWrite {
                        section: target.section.to_string(),
                        row: target.row,
                        hours: 0.0,
                        style: target.mapping.style.clone(),
                        sources: Vec::new(),
                    });
                entry.hours += value;
                entry.sources.push(source);
            }
        }
    }

    let mut writes = exclusive;
    writes.extend(combined.into_values());
    writes.sort_by(|left, right| {
        left.section
            .cmp(&right.section)
            .then_with(|| left.row.cmp(&right.row))
    });
    Ok(writes)
}
