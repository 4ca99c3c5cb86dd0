//! A small string table for reshaping upstream CSV payloads.

use crate::error::Result;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashMap;

/// Header plus rows of cells, all kept as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Whether a column name is a date column in a wide table. Non-date columns
/// never start with a digit.
pub fn is_date_column(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_digit())
}

impl Table {
    /// Parse CSV bytes with a header row. Short rows are padded with empty
    /// cells.
    pub fn from_csv(bytes: &[u8]) -> Result<Table> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Table { headers, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.into_inner()
            .map_err(|e| crate::error::SourceError::Io(e.into_error()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first column whose name starts with a digit.
    pub fn first_date_column(&self) -> Option<usize> {
        self.headers.iter().position(|h| is_date_column(h))
    }

    pub fn rename(&mut self, renames: &[(&str, &str)]) {
        let renames: HashMap<&str, &str> = renames.iter().copied().collect();
        for header in self.headers.iter_mut() {
            if let Some(new) = renames.get(header.as_str()) {
                *header = new.to_string();
            }
        }
    }

    /// Keep only the columns whose name satisfies `keep`.
    pub fn retain_columns(&mut self, keep: impl Fn(&str) -> bool) {
        let kept: Vec<usize> = (0..self.headers.len())
            .filter(|&i| keep(&self.headers[i]))
            .collect();
        let pick = |cells: &Vec<String>| -> Vec<String> {
            kept.iter().map(|&i| cells[i].clone()).collect()
        };
        self.headers = pick(&self.headers);
        self.rows = self.rows.iter().map(pick).collect();
    }

    pub fn map_column(&mut self, col: usize, f: impl Fn(&str) -> String) {
        for row in self.rows.iter_mut() {
            row[col] = f(&row[col]);
        }
    }

    pub fn retain_rows(&mut self, keep: impl Fn(&[String]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Stable sort of the rows by one column.
    pub fn sort_by_column(&mut self, col: usize) {
        self.rows.sort_by(|a, b| a[col].cmp(&b[col]));
    }

    /// Cells of one column, in row order.
    pub fn values(&self, col: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[col].as_str())
    }

    /// Distinct values of one column in order of first appearance.
    pub fn unique(&self, col: usize) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        for value in self.values(col) {
            if !seen.iter().any(|s| s == value) {
                seen.push(value.to_string());
            }
        }
        seen
    }

    /// Split into one table per distinct value of `col`, in order of first
    /// appearance.
    pub fn partition_by(&self, col: usize) -> Vec<(String, Table)> {
        let mut parts: Vec<(String, Table)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &self.rows {
            let key = &row[col];
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                parts.push((
                    key.clone(),
                    Table {
                        headers: self.headers.clone(),
                        rows: Vec::new(),
                    },
                ));
                parts.len() - 1
            });
            parts[slot].1.rows.push(row.clone());
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: &str = "Province_State,Admin2,Lat,1/22/20,1/23/20\nTexas,Bexar,29.4,1,2\nTexas,Harris,29.8,3,5\nOhio,Summit,41.1,0,1\n";

    #[test]
    fn test_parse_and_partition() {
        let mut table = Table::from_csv(WIDE.as_bytes()).unwrap();
        table.rename(&[("Province_State", "k8state"), ("Admin2", "k8county")]);
        table.retain_columns(|h| is_date_column(h) || h.starts_with("k8"));
        assert_eq!(table.headers, vec!["k8state", "k8county", "1/22/20", "1/23/20"]);
        assert_eq!(table.first_date_column(), Some(2));

        let parts = table.partition_by(0);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "Texas");
        assert_eq!(parts[0].1.len(), 2);
        assert_eq!(parts[1].1.unique(1), vec!["Summit"]);
    }

    #[test]
    fn test_csv_output_quotes_commas() {
        let table = Table {
            headers: vec!["k8country".into(), "1/22/20".into()],
            rows: vec![vec!["Korea, South".into(), "1".into()]],
        };
        let bytes = table.to_csv().unwrap();
        let back = Table::from_csv(&bytes).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = Table::from_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }
}
