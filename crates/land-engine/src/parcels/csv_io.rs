use std::io::Read;

use tracing::warn;

use super::domain::ParcelInput;
use super::metrics::ParcelMetrics;

pub const REQUIRED_HEADERS: [&str; 6] = [
    "state",
    "county",
    "acres",
    "purchase_price_per_acre",
    "expected_payment_per_acre_year1",
    "risk_score",
];

const SCORE_COLUMNS: [&str; 4] = [
    "las_score",
    "expected_year1_payout",
    "raw_yield_percent",
    "rank",
];

#[derive(Debug, thiserror::Error)]
pub enum ParcelCsvError {
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV must contain: {}", .0.join(", "))]
    MissingHeaders(Vec<&'static str>),
    #[error("no valid rows in CSV")]
    NoValidRows,
    #[error("failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// One usable CSV line: the raw cells plus the parsed, validated parcel.
#[derive(Debug, Clone)]
pub struct CsvParcelRow {
    pub line: usize,
    pub cells: csv::StringRecord,
    pub input: ParcelInput,
}

#[derive(Debug, Clone)]
pub struct ParsedParcels {
    pub headers: csv::StringRecord,
    pub rows: Vec<CsvParcelRow>,
    pub skipped: usize,
}

/// Reads parcel rows, skipping (and logging) rows that fail to parse or validate.
pub fn read_parcels<R: Read>(reader: R) -> Result<ParsedParcels, ParcelCsvError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let keys: csv::StringRecord = headers
        .iter()
        .map(|header| header.to_lowercase())
        .collect();
    let missing: Vec<&'static str> = REQUIRED_HEADERS
        .into_iter()
        .filter(|required| !keys.iter().any(|key| key == *required))
        .collect();
    if !missing.is_empty() {
        return Err(ParcelCsvError::MissingHeaders(missing));
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (index, record) in csv_reader.records().enumerate() {
        let line = index + 2;
        let parsed = record.map_err(|err| err.to_string()).and_then(|cells| {
            let input: ParcelInput = cells
                .deserialize(Some(&keys))
                .map_err(|err| err.to_string())?;
            input.validate().map_err(|err| err.to_string())?;
            Ok(CsvParcelRow { line, cells, input })
        });
        match parsed {
            Ok(row) => rows.push(row),
            Err(reason) => {
                skipped += 1;
                warn!(line, %reason, "skipping parcel CSV row");
            }
        }
    }

    Ok(ParsedParcels {
        headers,
        rows,
        skipped,
    })
}

#[derive(Debug, Clone)]
pub struct RankedCsv {
    pub body: Vec<u8>,
    pub ranked: usize,
    pub skipped: usize,
}

/// Scores every valid row and writes them back out, best LAS score first, with the
/// score columns and a 1-based `rank` appended. Nothing is persisted.
pub fn rank_csv<R: Read>(reader: R) -> Result<RankedCsv, ParcelCsvError> {
    let parsed = read_parcels(reader)?;
    if parsed.rows.is_empty() {
        return Err(ParcelCsvError::NoValidRows);
    }

    let kept: Vec<usize> = parsed
        .headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !SCORE_COLUMNS.contains(&header.to_lowercase().as_str()))
        .map(|(index, _)| index)
        .collect();

    let mut scored: Vec<(ParcelMetrics, CsvParcelRow)> = parsed
        .rows
        .into_iter()
        .map(|row| (ParcelMetrics::compute(&row.input), row))
        .collect();
    scored.sort_by(|a, b| b.0.las_score.total_cmp(&a.0.las_score));

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<&str> = kept.iter().filter_map(|&i| parsed.headers.get(i)).collect();
    header.extend(SCORE_COLUMNS);
    writer.write_record(&header)?;

    for (rank, (metrics, row)) in scored.iter().enumerate() {
        let mut record: Vec<String> = kept
            .iter()
            .map(|&i| row.cells.get(i).unwrap_or_default().to_string())
            .collect();
        record.push(metrics.las_score.to_string());
        record.push(metrics.expected_year1_payout.to_string());
        record.push(metrics.raw_yield_percent.to_string());
        record.push((rank + 1).to_string());
        writer.write_record(&record)?;
    }

    let body = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(RankedCsv {
        body,
        ranked: scored.len(),
        skipped: parsed.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARCELS: &str = "\
state,county,acres,purchase_price_per_acre,expected_payment_per_acre_year1,risk_score,owner
Iowa,Story,80,4000,200,0.1,Lee
Iowa,Polk,40,2000,200,0.5,Ng
Iowa,Polk,forty,2000,200,0.5,Bad
Iowa,Story,10,1000,50,1.5,Risky
";

    #[test]
    fn reads_valid_rows_and_counts_skips() {
        let parsed = read_parcels(PARCELS.as_bytes()).expect("parse");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.rows[1].line, 3);
        assert_eq!(parsed.rows[1].input.county, "Polk");
    }

    #[test]
    fn missing_headers_are_listed() {
        let err = read_parcels("state,county,acres\nIowa,Story,1\n".as_bytes())
            .expect_err("missing headers");
        assert_eq!(
            err.to_string(),
            "CSV must contain: purchase_price_per_acre, expected_payment_per_acre_year1, risk_score"
        );
    }

    #[test]
    fn ranks_by_score_and_keeps_extra_columns() {
        let ranked = rank_csv(PARCELS.as_bytes()).expect("rank");
        assert_eq!(ranked.ranked, 2);
        let text = String::from_utf8(ranked.body).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "state,county,acres,purchase_price_per_acre,expected_payment_per_acre_year1,\
risk_score,owner,las_score,expected_year1_payout,raw_yield_percent,rank"
        );
        // Polk: 10% yield * 0.5 * 20 = 100; Story: 5% * 0.9 * 20 = 90.
        assert_eq!(lines[1], "Iowa,Polk,40,2000,200,0.5,Ng,100,8000,10,1");
        assert_eq!(lines[2], "Iowa,Story,80,4000,200,0.1,Lee,90,16000,5,2");
    }

    #[test]
    fn no_valid_rows_is_an_error() {
        let csv = "state,county,acres,purchase_price_per_acre,expected_payment_per_acre_year1,risk_score\n\
                   Iowa,Story,0,1000,10,0.1\n";
        assert!(matches!(
            rank_csv(csv.as_bytes()),
            Err(ParcelCsvError::NoValidRows)
        ));
    }
}
