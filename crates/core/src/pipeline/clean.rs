use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::domain::sales::{CleanedRecord, TransactionRecord};
use crate::ingest::{CanonicalField, ColumnMap, RawTable, ResolvedColumns};
use crate::pipeline::PipelineError;

// Month-first wins for ambiguous slash dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Validates and normalizes every row of `table`.
///
/// Rows whose date does not parse are dropped without error. A missing required column or
/// a malformed amount aborts the whole run.
pub fn clean(table: &RawTable, columns: &ColumnMap) -> Result<Vec<CleanedRecord>, PipelineError> {
    let cols = columns.resolve(table.headers())?;

    let mut out = Vec::with_capacity(table.len());
    let mut dropped: usize = 0;
    for row in 0..table.len() {
        match clean_record(row, transaction_at(table, &cols, row))? {
            Some(record) => out.push(record),
            None => dropped += 1,
        }
    }

    tracing::debug!(
        rows_in = table.len(),
        rows_kept = out.len(),
        rows_dropped = dropped,
        "cleaned raw transactions"
    );
    Ok(out)
}

fn transaction_at<'a>(
    table: &'a RawTable,
    cols: &ResolvedColumns,
    row: usize,
) -> TransactionRecord<'a> {
    let cell = |field: CanonicalField| -> Option<&'a str> {
        cols.get(field).map(|column| table.cell(row, column))
    };

    TransactionRecord {
        date: cell(CanonicalField::Date).unwrap_or(""),
        time: cell(CanonicalField::Time),
        item_name: cell(CanonicalField::ItemName).unwrap_or(""),
        amount: cell(CanonicalField::Amount).unwrap_or(""),
        weekday_rank: cell(CanonicalField::WeekdayRank),
        month_rank: cell(CanonicalField::MonthRank),
    }
}

/// Cleans a single row. `Ok(None)` means the row was dropped for an unparseable date.
pub fn clean_record(
    row: usize,
    record: TransactionRecord<'_>,
) -> Result<Option<CleanedRecord>, PipelineError> {
    let Some(date) = parse_calendar_date(record.date) else {
        return Ok(None);
    };

    let amount = parse_amount(record.amount)
        .map_err(|reason| PipelineError::data(row, "amount", record.amount, reason))?;

    let item_name = record.item_name.trim();
    if item_name.is_empty() {
        return Err(PipelineError::data(
            row,
            "item_name",
            record.item_name,
            "item name is empty",
        ));
    }

    let weekday_rank = match record.weekday_rank {
        Some(raw) => parse_rank(raw, 7)
            .map_err(|reason| PipelineError::data(row, "weekday_rank", raw, reason))?,
        None => None,
    }
    .unwrap_or_else(|| weekday_rank_of(date));

    let month_rank = match record.month_rank {
        Some(raw) => parse_rank(raw, 12)
            .map_err(|reason| PipelineError::data(row, "month_rank", raw, reason))?,
        None => None,
    }
    .unwrap_or_else(|| month_rank_of(date));

    let time = record
        .time
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(Some(CleanedRecord {
        date,
        time,
        item_name: item_name.to_string(),
        amount,
        weekday_rank,
        month_rank,
    }))
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Strips thousands separators and surrounding whitespace, then parses a finite number.
pub fn parse_amount(raw: &str) -> Result<f64, String> {
    let stripped: String = raw.chars().filter(|c| *c != ',').collect();
    let s = stripped.trim();
    if s.is_empty() {
        return Err("amount is empty".to_string());
    }

    let value = s
        .parse::<f64>()
        .map_err(|_| "amount is not a number".to_string())?;
    if !value.is_finite() {
        return Err("amount is not finite".to_string());
    }
    Ok(value)
}

/// Blank cells yield `Ok(None)` so the caller can fall back to the date-derived rank.
fn parse_rank(raw: &str, max: u8) -> Result<Option<u8>, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }

    let value = s
        .parse::<f64>()
        .map_err(|_| format!("expected an integer in 1..={max}"))?;
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(max) {
        return Err(format!("expected an integer in 1..={max}"));
    }
    Ok(Some(value as u8))
}

/// Monday = 1 .. Sunday = 7.
pub fn weekday_rank_of(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

pub fn month_rank_of(date: NaiveDate) -> u8 {
    date.month() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalizes_amount_name_and_derives_ranks() {
        let t = table(
            &["Date", "Time", " coffee_name", "money "],
            &[&["2024-01-06", "08:01", "  Latte ", " 1,000 "]],
        );
        let out = clean(&t, &ColumnMap::default()).unwrap();
        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert_eq!(r.date, ymd(2024, 1, 6));
        assert_eq!(r.item_name, "Latte");
        assert_eq!(r.amount, 1000.0);
        assert_eq!(r.weekday_rank, 6);
        assert_eq!(r.month_rank, 1);
        assert_eq!(r.time.as_deref(), Some("08:01"));
    }

    #[test]
    fn weekday_rank_is_monday_based() {
        assert_eq!(weekday_rank_of(ymd(2024, 1, 1)), 1);
        assert_eq!(weekday_rank_of(ymd(2024, 1, 5)), 5);
        assert_eq!(weekday_rank_of(ymd(2024, 1, 6)), 6);
        assert_eq!(weekday_rank_of(ymd(2024, 1, 7)), 7);
        assert_eq!(month_rank_of(ymd(2024, 12, 31)), 12);
    }

    #[test]
    fn unparseable_date_is_dropped_silently() {
        let t = table(
            &["Date", "coffee_name", "money"],
            &[
                &["not a date", "Latte", "100"],
                &["", "Latte", "100"],
                &["2024-01-01", "Latte", "100"],
            ],
        );
        let out = clean(&t, &ColumnMap::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, ymd(2024, 1, 1));
    }

    #[test]
    fn malformed_amount_is_fatal() {
        let t = table(
            &["Date", "coffee_name", "money"],
            &[&["2024-01-01", "Latte", "100"], &["2024-01-01", "Latte", "abc"]],
        );
        let err = clean(&t, &ColumnMap::default()).unwrap_err();
        assert_eq!(err.kind(), "data");
        assert_eq!(err.field(), Some("amount"));
        match err {
            PipelineError::Data { row, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn date_is_checked_before_amount() {
        // A row with a bad date is dropped even when its amount is malformed too.
        let t = table(
            &["Date", "coffee_name", "money"],
            &[&["garbage", "Latte", "abc"]],
        );
        let out = clean(&t, &ColumnMap::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_date_column_is_a_schema_error() {
        let t = table(&["coffee_name", "money"], &[&["Latte", "100"]]);
        let err = clean(&t, &ColumnMap::default()).unwrap_err();
        assert_eq!(err.kind(), "schema");
        assert_eq!(err.field(), Some("date"));
    }

    #[test]
    fn missing_item_column_is_a_schema_error() {
        let t = table(&["Date", "money"], &[&["2024-01-01", "100"]]);
        let err = clean(&t, &ColumnMap::default()).unwrap_err();
        assert_eq!(err.field(), Some("item_name"));
    }

    #[test]
    fn provided_ranks_are_kept_and_blank_ranks_fall_back() {
        let t = table(
            &["Date", "coffee_name", "money", "Weekdaysort", "Monthsort"],
            &[
                &["2024-01-01", "Latte", "100", "3", "9"],
                &["2024-01-01", "Mocha", "100", "", "2.0"],
            ],
        );
        let out = clean(&t, &ColumnMap::default()).unwrap();
        assert_eq!((out[0].weekday_rank, out[0].month_rank), (3, 9));
        assert_eq!((out[1].weekday_rank, out[1].month_rank), (1, 2));
    }

    #[test]
    fn out_of_range_rank_is_a_data_error() {
        let t = table(
            &["Date", "coffee_name", "money", "Weekdaysort"],
            &[&["2024-01-01", "Latte", "100", "8"]],
        );
        let err = clean(&t, &ColumnMap::default()).unwrap_err();
        assert_eq!(err.field(), Some("weekday_rank"));
    }

    #[test]
    fn empty_item_name_is_a_data_error() {
        let t = table(&["Date", "coffee_name", "money"], &[&["2024-01-01", "  ", "100"]]);
        let err = clean(&t, &ColumnMap::default()).unwrap_err();
        assert_eq!(err.field(), Some("item_name"));
    }

    #[test]
    fn parses_common_date_shapes() {
        let expected = Some(ymd(2024, 3, 1));
        assert_eq!(parse_calendar_date("2024-03-01"), expected);
        assert_eq!(parse_calendar_date(" 2024/03/01 "), expected);
        assert_eq!(parse_calendar_date("03/01/2024"), expected);
        assert_eq!(parse_calendar_date("2024-03-01 10:15:32"), expected);
        assert_eq!(parse_calendar_date("2024-03-01 10:15:32.123"), expected);
        assert_eq!(parse_calendar_date("2024-03-01T10:15:32+07:00"), expected);
        assert_eq!(parse_calendar_date("2024-02-30"), None);
        assert_eq!(parse_calendar_date("yesterday"), None);
    }

    #[test]
    fn amount_parsing_rules() {
        assert_eq!(parse_amount("1,234.50"), Ok(1234.5));
        assert_eq!(parse_amount(" 38.7 "), Ok(38.7));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("inf").is_err());
    }
}
