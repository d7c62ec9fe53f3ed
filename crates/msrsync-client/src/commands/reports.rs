use std::path::Path;

use tracing::{info, warn};

use crate::commands::common::{load_setup, parse_family_period, timestamp_now};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ArchiveData, ReportListData, ReportListItem};
use crate::report::model::InstanceStatus;
use crate::report::store::{load_instance, save_instance, scan_chain, template_path};
use crate::state::FamilyLock;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct ReportsListOptions<'a> {
    pub family: String,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ReportsArchiveOptions<'a> {
    pub family: String,
    pub period: String,
    pub home_override: Option<&'a Path>,
}

pub fn list(family: &str) -> ClientResult<SuccessEnvelope> {
    list_with_options(ReportsListOptions {
        family: family.to_string(),
        home_override: None,
    })
}

#[doc(hidden)]
pub fn list_with_options(options: ReportsListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let family = options.family.as_str();
    let family_config = setup.config.family(family)?;
    let chain = scan_chain(&setup.home, family, family_config.cadence)?;

    let mut reports = Vec::with_capacity(chain.len());
    for (period, path) in chain.iter().rev() {
        let item = match load_instance(path) {
            Ok(instance) => ReportListItem {
                period: period.key(),
                label: period.label(),
                status: instance.status.as_str().to_string(),
                path: path.display().to_string(),
                updated_at: instance.updated_at,
                run_id: instance.run_id,
            },
            Err(error) => {
                warn!(path = %path.display(), code = %error.code, "unreadable report instance");
                ReportListItem {
                    period: period.key(),
                    label: period.label(),
                    status: "corrupt".to_string(),
                    path: path.display().to_string(),
                    updated_at: None,
                    run_id: None,
                }
            }
        };
        reports.push(item);
    }

    let template = template_path(&setup.home, family);
    let data = ReportListData {
        family: family.to_string(),
        cadence: family_config.cadence.as_str().to_string(),
        template_path: template
            .exists()
            .then(|| template.display().to_string()),
        reports,
    };
    success("reports list", data)
}

pub fn archive(family: &str, period: &str) -> ClientResult<SuccessEnvelope> {
    archive_with_options(ReportsArchiveOptions {
        family: family.to_string(),
        period: period.to_string(),
        home_override: None,
    })
}

/// Marks a draft instance completed. Completed instances never change again.
#[doc(hidden)]
pub fn archive_with_options(options: ReportsArchiveOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let family = options.family.as_str();
    let family_config = setup.config.family(family)?;
    let period = parse_family_period(&options.period, family, family_config, "reports archive")?;

    let _lock = FamilyLock::acquire(&setup.home, family)?;
    let chain = scan_chain(&setup.home, family, family_config.cadence)?;
    let Some(path) = chain.get(&period) else {
        return Err(ClientError::report_not_found(family, &period.key()));
    };

    let mut instance = load_instance(path)?;
    if instance.is_completed() {
        return Err(ClientError::report_archived(family, &period.key(), path));
    }
    instance.status = InstanceStatus::Completed;
    instance.updated_at = Some(timestamp_now());
    save_instance(path, &instance)?;
    info!(family, period = %period, "archived report instance");

    let data = ArchiveData {
        family: family.to_string(),
        period: period.key(),
        path: path.display().to_string(),
        status: instance.status.as_str().to_string(),
    };
    success("reports archive", data)
}
