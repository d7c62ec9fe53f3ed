use crate::ClientResult;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::PeriodData;
use crate::period::{Cadence, Period};

/// Shows how a label normalizes. `cadence` decides what a bare date means.
pub fn run(input: &str, cadence: Option<Cadence>) -> ClientResult<SuccessEnvelope> {
    let period = match cadence {
        Some(value) => Period::parse_for(input, value)?,
        None => Period::parse(input)?,
    };

    let data = PeriodData {
        input: input.to_string(),
        key: period.key(),
        label: period.label(),
        cadence: period.cadence().as_str().to_string(),
        start: period.start_date().format("%Y-%m-%d").to_string(),
        end: period.end_date().format("%Y-%m-%d").to_string(),
        variants: period.variants(),
        work_weeks: period.work_weeks().iter().map(Period::key).collect(),
        previous: period.previous().key(),
        next: period.next().key(),
    };
    success("period", data)
}

#[cfg(test)]
mod tests {
    use crate::period::Cadence;

    use super::run;

    #[test]
    fn month_preview_lists_work_weeks() {
        let result = run("January 2026", None);
        assert!(result.is_ok());
        if let Ok(envelope) = result {
            assert_eq!(envelope.command, "period");
            assert_eq!(envelope.data["key"], "2026-01");
            assert_eq!(envelope.data["work_weeks"][0], "2026-W01");
            assert_eq!(envelope.data["work_weeks"].as_array().map(Vec::len), Some(5));
        }
    }

    #[test]
    fn bare_dates_follow_requested_cadence() {
        let weekly = run("2026-01-14", None);
        assert_eq!(weekly.map(|envelope| envelope.data["key"].clone()).ok(), Some("2026-W03".into()));

        let monthly = run("2026-01-14", Some(Cadence::Monthly));
        assert_eq!(monthly.map(|envelope| envelope.data["key"].clone()).ok(), Some("2026-01".into()));
    }

    #[test]
    fn unparseable_labels_fail() {
        let result = run("sometime soon", None);
        assert_eq!(result.err().map(|error| error.code), Some("invalid_period_format".to_string()));
    }
}
