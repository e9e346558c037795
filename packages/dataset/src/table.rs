//! Raw table loading.
//!
//! Parses an uploaded CSV into a header row plus string cells. No typing
//! happens here; every cell stays a string until the analysis pipeline
//! asks for a specific coercion.

use crate::DatasetError;

/// A parsed CSV: trimmed header names and string cells.
///
/// Every row holds exactly one cell per header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from already-split headers and rows, padding short
    /// rows with empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Parse`] if a row has more cells than there
    /// are headers.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, DatasetError> {
        let width = headers.len();
        let mut padded = Vec::with_capacity(rows.len());

        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(DatasetError::Parse(format!(
                    "row {} has {} fields, expected {width}",
                    i + 1,
                    row.len()
                )));
            }
            row.resize(width, String::new());
            padded.push(row);
        }

        Ok(Self {
            headers,
            rows: padded,
        })
    }

    /// Column names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates the data rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterates the cells of one column in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }
}

/// Checks that an uploaded file name carries the `.csv` extension.
///
/// The check is case-sensitive: `DATA.CSV` is rejected.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidFileType`] for any other name.
pub fn ensure_csv_file_name(file_name: &str) -> Result<(), DatasetError> {
    if file_name.ends_with(".csv") {
        Ok(())
    } else {
        Err(DatasetError::InvalidFileType)
    }
}

/// Parses CSV bytes into a [`RawTable`].
///
/// Header cells are trimmed; blank header cells are named `Unnamed: <index>`.
///
/// # Errors
///
/// Returns [`DatasetError::Csv`] if the bytes are not valid UTF-8 delimited
/// text, or [`DatasetError::Parse`] if there is no header row or a row is
/// wider than the header.
pub fn load_csv(bytes: &[u8]) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(i, h))
        .collect();

    if headers.is_empty() {
        return Err(DatasetError::Parse(
            "CSV file contains no header row".to_owned(),
        ));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    let table = RawTable::new(headers, rows)?;

    log::debug!(
        "Loaded CSV with {} columns and {} rows",
        table.headers().len(),
        table.len()
    );

    Ok(table)
}

fn header_name(index: usize, raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        format!("Unnamed: {index}")
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_header_names() {
        let table = load_csv(b" State ,Lat , 2019\nAlpha,1,2\n").unwrap();
        assert_eq!(table.headers(), ["State", "Lat", "2019"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn names_blank_headers() {
        let table = load_csv(b"State,,2019\nAlpha,x,2\n").unwrap();
        assert_eq!(table.headers()[1], "Unnamed: 1");
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = load_csv("\u{feff}State,2019\nAlpha,2\n".as_bytes()).unwrap();
        assert_eq!(table.headers()[0], "State");
    }

    #[test]
    fn pads_short_rows() {
        let table = load_csv(b"State,Lat,2019\nAlpha\n").unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row, ["Alpha", "", ""]);
    }

    #[test]
    fn rejects_rows_wider_than_header() {
        let err = load_csv(b"State,2019\nAlpha,1,2\n").unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn rejects_empty_input() {
        assert!(load_csv(b"").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(load_csv(b"State,2019\n\xff\xfe,1\n").is_err());
    }

    #[test]
    fn reads_column_cells_in_order() {
        let table = load_csv(b"State,2019\nA,1\nB,2\n").unwrap();
        let cells: Vec<&str> = table.column(1).collect();
        assert_eq!(cells, ["1", "2"]);
    }

    #[test]
    fn checks_csv_extension() {
        assert!(ensure_csv_file_name("crimes.csv").is_ok());
        assert!(matches!(
            ensure_csv_file_name("data.txt"),
            Err(DatasetError::InvalidFileType)
        ));
        assert!(ensure_csv_file_name("DATA.CSV").is_err());
    }
}
