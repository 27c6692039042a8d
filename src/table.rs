//! A small relational table: ordered columns and rows of string cells.
//!
//! Every input sheet and every result sheet passes through this type. Cells stay strings until a
//! typed accessor is called, so tables can be split, filtered and joined without knowing their
//! schema.
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;

/// The broadcast sentinel used in scenario and parameter key columns.
pub const WILDCARD: &str = "*";

/// A named table with ordered columns and string-valued cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// The logical table name (sheet name)
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<S: Into<String>>(name: S, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Read a table from a CSV file, using the header row as column names.
    pub fn from_csv(name: &str, file_path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(file_path)
            .with_context(|| format!("Error reading {}", file_path.display()))?;

        let columns = reader
            .headers()
            .with_context(|| format!("Error reading {}", file_path.display()))?
            .iter()
            .map(String::from)
            .collect();

        let mut table = Table {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        };
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Error reading {}", file_path.display()))?;
            table.rows.push(record.iter().map(String::from).collect());
        }

        Ok(table)
    }

    /// Write the table to a CSV file.
    pub fn write_csv(&self, file_path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(file_path)
            .with_context(|| format!("Error writing {}", file_path.display()))?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// The ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The table rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<String>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "Row width mismatch for table {}",
            self.name
        );
        self.rows.push(row);
    }

    /// Find a column's position by name (ASCII case-insensitive).
    pub fn maybe_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| unicase::eq_ascii(c.as_str(), name))
    }

    /// Find a column's position by name, or fail naming the table.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.maybe_column(name)
            .with_context(|| format!("Table {} has no column {name}", self.name))
    }

    /// The string cell at the given row and column position.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    /// Parse the cell at (row, column) as an f64.
    ///
    /// An empty cell yields `None`; anything else must parse.
    pub fn cell_f64(&self, row: usize, column: usize) -> Result<Option<f64>> {
        let cell = self.cell(row, column).trim();
        if cell.is_empty() {
            return Ok(None);
        }

        let value = cell.parse().with_context(|| {
            format!(
                "Table {}, column {}, row {}: cannot parse {cell:?} as a number",
                self.name,
                self.columns[column],
                row + 1
            )
        })?;
        Ok(Some(value))
    }

    /// A new table with the same columns containing only the rows matching `predicate`.
    pub fn filter_rows<F: Fn(&[String]) -> bool>(&self, predicate: F) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }

    /// The distinct values of a column, in first-appearance order.
    pub fn distinct(&self, column: usize) -> Vec<String> {
        let mut seen = IndexMap::new();
        for row in &self.rows {
            seen.entry(row[column].clone()).or_insert(());
        }
        seen.into_keys().collect()
    }

    /// Append another table's rows to this one.
    ///
    /// Fails if the column counts differ (concatenation across scenarios requires a stable
    /// column order).
    pub fn append(&mut self, other: &Table) -> Result<()> {
        ensure!(
            self.columns.len() == other.columns.len(),
            "Tables named {} have different numbers of columns",
            self.name
        );
        self.rows.extend(other.rows.iter().cloned());

        Ok(())
    }

    /// Rename the table's columns. The new list must have the same length.
    pub fn set_columns(&mut self, columns: &[&str]) {
        assert_eq!(
            columns.len(),
            self.columns.len(),
            "Column rename width mismatch for table {}",
            self.name
        );
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
    }

    /// Natural full outer join with `other` on all shared column names.
    ///
    /// Matched rows are merged cell-wise; unmatched rows from either side are kept with empty
    /// cells for the missing columns. Rows sharing a key join pairwise-cartesian, as a
    /// relational outer merge does.
    pub fn outer_merge(&self, other: &Table, name: &str) -> Table {
        let shared: Vec<(usize, usize)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| other.maybe_column(c).map(|j| (i, j)))
            .collect();
        let right_extra: Vec<usize> = (0..other.columns.len())
            .filter(|j| !shared.iter().any(|(_, sj)| sj == j))
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(right_extra.iter().map(|&j| other.columns[j].clone()));

        // Index the right side by its shared-key tuple
        let mut right_by_key: HashMap<Vec<&str>, Vec<usize>> = HashMap::new();
        for (r, row) in other.rows.iter().enumerate() {
            let key = shared.iter().map(|&(_, j)| row[j].as_str()).collect();
            right_by_key.entry(key).or_default().push(r);
        }

        let mut merged = Table {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        };
        let mut matched_right = vec![false; other.rows.len()];
        for row in &self.rows {
            let key: Vec<&str> = shared.iter().map(|&(i, _)| row[i].as_str()).collect();
            match right_by_key.get(&key) {
                Some(matches) => {
                    for &r in matches {
                        matched_right[r] = true;
                        let mut out = row.clone();
                        out.extend(right_extra.iter().map(|&j| other.rows[r][j].clone()));
                        merged.rows.push(out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(right_extra.iter().map(|_| String::new()));
                    merged.rows.push(out);
                }
            }
        }

        // Right-only rows
        for (r, row) in other.rows.iter().enumerate() {
            if matched_right[r] {
                continue;
            }
            let mut out = vec![String::new(); self.columns.len()];
            for &(i, j) in &shared {
                out[i] = row[j].clone();
            }
            out.extend(right_extra.iter().map(|&j| row[j].clone()));
            merged.rows.push(out);
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn two_column_table() -> Table {
        let mut table = Table::new("demo", &["Key", "Value"]);
        table.push_row(vec!["a".to_string(), "1".to_string()]);
        table.push_row(vec!["b".to_string(), "".to_string()]);
        table
    }

    #[test]
    fn test_from_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("demo.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "Key,Value\na,1\nb,2").unwrap();
        }

        let table = Table::from_csv("demo", &file_path).unwrap();
        assert_eq!(table.columns(), &["Key".to_string(), "Value".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), "b");
    }

    #[test]
    fn test_cell_f64() {
        let table = two_column_table();
        assert_eq!(table.cell_f64(0, 1).unwrap(), Some(1.0));
        assert_eq!(table.cell_f64(1, 1).unwrap(), None);

        let mut bad = Table::new("demo", &["Value"]);
        bad.push_row(vec!["not-a-number".to_string()]);
        assert!(bad.cell_f64(0, 0).is_err());
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = two_column_table();
        assert_eq!(table.column("value").unwrap(), 1);
        assert!(table.column("Missing").is_err());
    }

    #[test]
    fn test_distinct() {
        let mut table = Table::new("demo", &["Key"]);
        for key in ["x", "y", "x", "z"] {
            table.push_row(vec![key.to_string()]);
        }
        assert_eq!(table.distinct(0), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_outer_merge() {
        let mut left = Table::new("left", &["Node", "Period", "flow"]);
        left.push_row(vec!["A".into(), "1".into(), "10".into()]);
        left.push_row(vec!["A".into(), "2".into(), "20".into()]);

        let mut right = Table::new("right", &["Node", "Period", "cost"]);
        right.push_row(vec!["A".into(), "1".into(), "5".into()]);
        right.push_row(vec!["B".into(), "1".into(), "7".into()]);

        let merged = left.outer_merge(&right, "merged");
        assert_eq!(
            merged.columns(),
            &["Node", "Period", "flow", "cost"]
                .map(String::from)
                .to_vec()
        );
        assert_eq!(merged.len(), 3);
        // Matched row carries both values
        assert_eq!(merged.rows()[0], ["A", "1", "10", "5"].map(String::from).to_vec());
        // Left-only row has an empty cost
        assert_eq!(merged.rows()[1][3], "");
        // Right-only row has an empty flow
        let right_only = &merged.rows()[2];
        assert_eq!(right_only[0], "B");
        assert_eq!(right_only[2], "");
        assert_eq!(right_only[3], "7");
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("demo.csv");
        let table = two_column_table();
        table.write_csv(&file_path).unwrap();
        assert_eq!(Table::from_csv("demo", &file_path).unwrap(), table);
    }
}
