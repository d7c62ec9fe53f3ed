use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::period::{Cadence, Period};
use crate::report::model::{InstanceStatus, ReportInstance};
use crate::report::store::{load_instance, scan_chain, template_path};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub enum BaseSource {
    Prior { period: Period, path: PathBuf },
    Template { path: PathBuf },
}

/// The document a new instance is built from.
#[derive(Debug, Clone)]
pub struct CarryForward {
    pub instance: ReportInstance,
    pub source: BaseSource,
}

impl CarryForward {
    /// A blank template has no preceding column worth copying styles from.
    pub fn is_uninitialized(&self) -> bool {
        matches!(self.source, BaseSource::Template { .. })
    }

    pub fn source_path(&self) -> &Path {
        match &self.source {
            BaseSource::Prior { path, .. } | BaseSource::Template { path } => path,
        }
    }

    pub fn source_period(&self) -> Option<Period> {
        match &self.source {
            BaseSource::Prior { period, .. } => Some(*period),
            BaseSource::Template { .. } => None,
        }
    }
}

/// Nearest instance strictly before `target`, independent of scan order.
pub fn select_prior<'a>(
    chain: &'a BTreeMap<Period, PathBuf>,
    target: &Period,
) -> Option<(&'a Period, &'a PathBuf)> {
    chain.range(..*target).next_back()
}

pub fn resolve_base(home: &Path, family: &str, cadence: Cadence, target: &Period) -> ClientResult<CarryForward> {
    let chain = scan_chain(home, family, cadence)?;
    resolve_from_chain(home, family, &chain, target)
}

pub(crate) fn resolve_from_chain(
    home: &Path,
    family: &str,
    chain: &BTreeMap<Period, PathBuf>,
    target: &Period,
) -> ClientResult<CarryForward> {
    if let Some((period, path)) = select_prior(chain, target) {
        let instance = load_instance(path)?;
        info!(family, target = %target, base = %period, "carrying forward prior report");
        return Ok(CarryForward {
            instance,
            source: BaseSource::Prior {
                period: *period,
                path: path.clone(),
            },
        });
    }

    let template = template_path(home, family);
    if !template.exists() {
        return Err(ClientError::no_template_available(
            family,
            &target.key(),
            &template,
        ));
    }

    let mut instance = load_instance(&template)?;
    instance.family = family.to_string();
    instance.period = None;
    instance.status = InstanceStatus::Draft;
    info!(family, target = %target, "no prior report; starting from blank template");
    Ok(CarryForward {
        instance,
        source: BaseSource::Template { path: template },
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use tempfile::tempdir;

    use crate::period::{Cadence, Period};

    use super::{resolve_base, select_prior};

    fn month(label: &str) -> Period {
        Period::parse(label).unwrap_or_else(|_| panic!("fixture period {label} must parse"))
    }

    #[test]
    fn picks_nearest_prior_regardless_of_insertion_order() {
        let mut chain = BTreeMap::new();
        for label in ["Jan-26", "Nov-25", "Mar-26", "Dec-25"] {
            chain.insert(month(label), PathBuf::from(format!("{label}.json")));
        }

        let feb = month("Feb-26");
        assert_eq!(select_prior(&chain, &feb).map(|(period, _)| period.key()), Some("2026-01".to_string()));

        let jan = month("Jan-26");
        assert_eq!(select_prior(&chain, &jan).map(|(period, _)| period.key()), Some("2025-12".to_string()));

        let oct = month("Oct-25");
        assert!(select_prior(&chain, &oct).is_none());
    }

    #[test]
    fn missing_chain_and_template_is_reported() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let result = resolve_base(dir.path(), "TO8", Cadence::Monthly, &month("Feb-26"));
            assert!(result.is_err());
            if let Err(error) = result {
                assert_eq!(error.code, "no_template_available");
            }
        }
    }
}
