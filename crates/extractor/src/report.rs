use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info, warn};

use common::{Error, Extraction, IpoRecord, Result};

use crate::html;

const TABLE_ID: &str = "report_table";

// Column positions in the live GMP report.
const COL_NAME: usize = 0;
const COL_GMP: usize = 1;
const COL_SUBSCRIPTION: usize = 3;
const COL_OPEN: usize = 7;
const COL_CLOSE: usize = 8;

/// Dates this far from the run date are assumed to belong to the adjacent year.
const YEAR_ROLL_DAYS: i64 = 180;

/// Parse the GMP report page into records.
///
/// A page without the report table is an extraction failure. Rows with too
/// few cells are ignored; rows whose date cells hold an unparseable date are
/// dropped and counted.
pub fn parse_report(body: &str, today: NaiveDate) -> Result<Extraction> {
    let table = find_table(body).ok_or_else(|| {
        Error::Extraction(format!("report table '#{TABLE_ID}' not found in page"))
    })?;

    let mut extraction = Extraction::default();

    for (start, end) in html::tag_blocks(table, "tr") {
        let row = &table[start..end];
        let cells: Vec<String> = html::tag_blocks(row, "td")
            .into_iter()
            .map(|(s, e)| html::text(html::inner(&row[s..e])))
            .collect();

        // Header rows use <th> and produce no cells.
        if cells.len() <= COL_CLOSE {
            continue;
        }

        match parse_row(&cells, today) {
            Ok(record) => {
                debug!(
                    name = %record.name,
                    gmp = record.gmp,
                    start = ?record.start_date,
                    end = ?record.end_date,
                    "Parsed IPO row"
                );
                extraction.records.push(record);
            }
            Err(e) => {
                warn!(name = %cells[COL_NAME], error = %e, "Dropping malformed IPO row");
                extraction.dropped += 1;
            }
        }
    }

    info!(
        records = extraction.records.len(),
        dropped = extraction.dropped,
        "Parsed GMP report"
    );
    Ok(extraction)
}

fn find_table(body: &str) -> Option<&str> {
    html::tag_blocks(body, "table")
        .into_iter()
        .map(|(s, e)| &body[s..e])
        .find(|block| {
            let tag = html::open_tag(block);
            tag.contains(&format!("id=\"{TABLE_ID}\"")) || tag.contains(&format!("id='{TABLE_ID}'"))
        })
}

fn parse_row(cells: &[String], today: NaiveDate) -> Result<IpoRecord> {
    let name = cells[COL_NAME].trim().to_string();
    if name.is_empty() {
        return Err(Error::Parse("empty IPO name".into()));
    }
    Ok(IpoRecord {
        name,
        gmp: parse_gmp(&cells[COL_GMP]),
        start_date: parse_day_month(&cells[COL_OPEN], today)?,
        end_date: parse_day_month(&cells[COL_CLOSE], today)?,
        subscription: cells[COL_SUBSCRIPTION].trim().to_string(),
    })
}

/// Pull the percentage out of a GMP cell such as `₹45 (12.50%)`.
/// Cells without a percentage (`--`, blank) read as zero, as do negatives.
pub fn parse_gmp(cell: &str) -> f64 {
    let Some(close) = cell.find("%)") else {
        return 0.0;
    };
    let Some(open) = cell[..close].rfind('(') else {
        return 0.0;
    };
    cell[open + 1..close]
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .unwrap_or(0.0)
}

/// Parse the first `d-Mon` token (e.g. `7-Mar`) in a cell.
///
/// `Ok(None)` when the cell holds no such token; `Err` when it holds one
/// that is not a real date.
pub fn parse_day_month(cell: &str, today: NaiveDate) -> Result<Option<NaiveDate>> {
    let Some(token) = find_day_month_token(cell) else {
        return Ok(None);
    };
    let year = today.year();
    let date = NaiveDate::parse_from_str(&format!("{token}-{year}"), "%d-%b-%Y")
        .map_err(|e| Error::Parse(format!("bad date '{token}': {e}")))?;

    let rolled = if date < today - Duration::days(YEAR_ROLL_DAYS) {
        date.with_year(year + 1)
    } else if date > today + Duration::days(YEAR_ROLL_DAYS) {
        date.with_year(year - 1)
    } else {
        Some(date)
    };
    rolled
        .map(Some)
        .ok_or_else(|| Error::Parse(format!("date '{token}' does not exist in adjacent year")))
}

fn find_day_month_token(cell: &str) -> Option<&str> {
    let bytes = cell.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() || (i > 0 && bytes[i - 1].is_ascii_digit()) {
            i += 1;
            continue;
        }
        let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        let dash = i + digits;
        let month = dash + 1;
        let month_end = month + 3;
        let is_token = digits <= 2
            && bytes.get(dash) == Some(&b'-')
            && month_end <= bytes.len()
            && bytes[month..month_end].iter().all(|b| b.is_ascii_alphabetic())
            && !bytes.get(month_end).is_some_and(|b| b.is_ascii_alphabetic());
        if is_token {
            return Some(&cell[i..month_end]);
        }
        i = dash;
    }
    None
}
