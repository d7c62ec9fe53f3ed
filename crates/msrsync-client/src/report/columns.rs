use crate::period::{Cadence, Period};
use crate::report::model::{Cell, CellValue, Section};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    Found(u32),
    Missing,
    Ambiguous(Vec<u32>),
}

/// Reads a header cell as a period of the report's cadence. Cells that do not
/// normalize are not period headers.
pub fn header_period(cell: &Cell, cadence: Cadence) -> Option<Period> {
    match &cell.value {
        CellValue::Date(date) => Some(Period::from_date(*date, cadence)),
        CellValue::Text(text) => Period::parse_for(text, cadence).ok(),
        CellValue::Number(_) | CellValue::Empty => None,
    }
}

pub fn locate_column(section: &Section, header_row: u32, target: &Period) -> ColumnMatch {
    let cadence = target.cadence();
    let matches = section
        .row_cells(header_row)
        .into_iter()
        .filter(|(_, cell)| header_period(cell, cadence).as_ref() == Some(target))
        .map(|(column, _)| column)
        .collect::<Vec<u32>>();

    match matches.as_slice() {
        [] => ColumnMatch::Missing,
        [column] => ColumnMatch::Found(*column),
        _ => ColumnMatch::Ambiguous(matches),
    }
}

/// Like [`locate_column`], but anything other than a unique match is an error.
pub fn require_column(
    family: &str,
    section_name: &str,
    section: &Section,
    header_row: u32,
    target: &Period,
) -> ClientResult<u32> {
    match locate_column(section, header_row, target) {
        ColumnMatch::Found(column) => Ok(column),
        ColumnMatch::Missing => Err(ClientError::column_not_found(
            family,
            section_name,
            &target.key(),
        )),
        ColumnMatch::Ambiguous(columns) => Err(ClientError::ambiguous_column(
            family,
            section_name,
            &target.key(),
            &columns,
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::period::Period;
    use crate::report::model::{Cell, Section};

    use super::{ColumnMatch, locate_column, require_column};

    fn header(cells: Vec<(u32, Cell)>) -> Section {
        let mut section = Section::default();
        for (column, cell) in cells {
            section.set(3, column, cell);
        }
        section
    }

    fn date(year: i32, month: u32, day: u32) -> Cell {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Cell::date)
            .unwrap_or_default()
    }

    #[test]
    fn mixed_label_styles_resolve_to_one_month() {
        let section = header(vec![
            (1, Cell::text("Employee")),
            (5, Cell::text("Nov-25")),
            (6, date(2025, 12, 1)),
            (7, Cell::text("January 2026")),
            (8, Cell::text("January 2026 Total")),
        ]);
        let target = Period::parse("2026-01");
        assert!(target.is_ok());
        if let Ok(target) = target {
            assert_eq!(locate_column(&section, 3, &target), ColumnMatch::Found(7));
            assert_eq!(locate_column(&section, 3, &target.previous()), ColumnMatch::Found(6));
        }
    }

    #[test]
    fn weekly_headers_match_by_week() {
        let section = header(vec![
            (4, date(2026, 1, 5)),
            (5, Cell::text("Jan 12-16, 2026")),
            (6, Cell::text("2026-01-19")),
        ]);
        let target = Period::parse("2026-01-14");
        assert!(target.is_ok());
        if let Ok(target) = target {
            assert_eq!(locate_column(&section, 3, &target), ColumnMatch::Found(5));
            assert_eq!(locate_column(&section, 3, &target.previous()), ColumnMatch::Found(4));
        }
    }

    #[test]
    fn duplicate_month_headers_are_ambiguous() {
        let section = header(vec![(7, Cell::text("Jan-26")), (9, Cell::text("2026-01"))]);
        let target = Period::parse("January 2026");
        assert!(target.is_ok());
        if let Ok(target) = target {
            let result = require_column("TO1", "MSR", &section, 3, &target);
            assert!(result.is_err());
            if let Err(error) = result {
                assert_eq!(error.code, "ambiguous_column");
            }
            assert_eq!(
                locate_column(&section, 3, &target),
                ColumnMatch::Ambiguous(vec![7, 9])
            );
        }
    }

    #[test]
    fn absent_period_is_column_not_found() {
        let section = header(vec![(7, Cell::text("Jan-26"))]);
        let target = Period::parse("Feb-26");
        assert!(target.is_ok());
        if let Ok(target) = target {
            let result = require_column("TO1", "MSR", &section, 3, &target);
            assert_eq!(result.err().map(|error| error.code), Some("column_not_found".to_string()));
        }
    }
}
