//! Typed in-memory table.
//!
//! Columns are inferred from their text cells when loaded: numeric if every
//! non-empty cell parses as a number, temporal if every non-empty cell parses
//! as a date, categorical otherwise. Empty cells become nulls.

use crate::error::{ChartError, Result};
use jiff::civil::Date;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Temporal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Temporal(Vec<Option<Date>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Numeric(values.into_iter().map(Some).collect()))
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Categorical(values.into_iter().map(|v| Some(v.into())).collect()),
        )
    }

    /// Build a column from raw text cells, inferring its type.
    pub fn from_cells(name: impl Into<String>, cells: Vec<String>) -> Self {
        let present = || cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty());

        let data = if present().all(|c| c.parse::<f64>().is_ok()) {
            ColumnData::Numeric(
                cells
                    .iter()
                    .map(|c| c.trim().parse::<f64>().ok())
                    .collect(),
            )
        } else if present().all(|c| parse_date(c).is_some()) {
            ColumnData::Temporal(cells.iter().map(|c| parse_date(c.trim())).collect())
        } else {
            ColumnData::Categorical(
                cells
                    .into_iter()
                    .map(|c| {
                        let c = c.trim();
                        (!c.is_empty()).then(|| c.to_string())
                    })
                    .collect(),
            )
        };

        Self::new(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Categorical(_) => ColumnType::Categorical,
            ColumnData::Temporal(_) => ColumnType::Temporal,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Temporal(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Categorical(v) => v[row].is_none(),
            ColumnData::Temporal(v) => v[row].is_none(),
        }
    }

    /// Numeric view of a cell. Dates become fractional years.
    pub fn value(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v[row],
            ColumnData::Temporal(v) => v[row].map(fractional_year),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Text view of a cell, used for categorical grouping.
    pub fn text(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map(format_number),
            ColumnData::Categorical(v) => v[row].clone(),
            ColumnData::Temporal(v) => v[row].map(|d| d.to_string()),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&r| v[r].clone()).collect())
            }
            ColumnData::Temporal(v) => ColumnData::Temporal(rows.iter().map(|&r| v[r]).collect()),
        };
        Column::new(self.name.clone(), data)
    }
}

/// An ordered collection of equally long named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(ChartError::LengthMismatch {
                    column: bad.name.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from a header row and string rows.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ChartError::EmptyData(
                "Input must contain at least one data row".to_string(),
            ));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ChartError::LengthMismatch {
                    column: format!("row {}", row_idx + 1),
                    expected: headers.len(),
                    found: row.len(),
                });
            }
            for (col, cell) in row.into_iter().enumerate() {
                cells[col].push(cell);
            }
        }

        Self::new(
            headers
                .into_iter()
                .zip(cells)
                .map(|(name, cells)| Column::from_cells(name, cells))
                .collect(),
        )
    }

    /// Read a delimited file with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        let table = Self::from_rows(headers, rows)?;
        log::debug!(
            "Loaded table with {} rows and {} columns",
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Create a table from a JSON array of objects.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value.as_array().ok_or_else(|| {
            ChartError::EmptyData("Input data must be a JSON array of objects".to_string())
        })?;

        let first_obj = array
            .first()
            .ok_or_else(|| ChartError::EmptyData("Input data array is empty".to_string()))?
            .as_object()
            .ok_or_else(|| ChartError::Param("Items in array must be objects".to_string()))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| ChartError::Param("Items in array must be objects".to_string()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => {
                        return Err(ChartError::Param(format!(
                            "Unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Self::from_rows(headers, rows)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ChartError::ColumnNotFound(name.to_string()))
    }

    /// Numeric values of a column, nulls kept as `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?;
        if let ColumnData::Categorical(values) = &column.data {
            let (row, value) = values
                .iter()
                .enumerate()
                .find_map(|(i, v)| v.as_ref().map(|v| (i, v.clone())))
                .unwrap_or((0, String::new()));
            return Err(ChartError::NotNumeric {
                column: column.name.clone(),
                row: row + 1,
                value,
            });
        }
        Ok((0..column.len()).map(|row| column.value(row)).collect())
    }

    /// Text values of a column, nulls kept as `None`.
    pub fn categorical(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.column(name)?;
        Ok((0..column.len()).map(|row| column.text(row)).collect())
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Table { columns })
    }

    pub fn drop_columns(&self, names: &[&str]) -> Result<Table> {
        for name in names {
            self.column(name)?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
            .cloned()
            .collect();
        Ok(Table { columns })
    }

    /// Remove rows holding a null in any of `subset` (all columns when empty).
    pub fn drop_nulls(&self, subset: &[&str]) -> Result<Table> {
        let checked = self.subset_columns(subset)?;
        let keep: Vec<usize> = (0..self.row_count())
            .filter(|&row| checked.iter().all(|c| !c.is_null(row)))
            .collect();
        self.log_dropped("null", keep.len());
        Ok(self.take_rows(&keep))
    }

    /// Remove rows whose value is exactly zero in any of `subset`.
    pub fn drop_zeros(&self, subset: &[&str]) -> Result<Table> {
        let checked = self.subset_columns(subset)?;
        let keep: Vec<usize> = (0..self.row_count())
            .filter(|&row| checked.iter().all(|c| c.value(row) != Some(0.0)))
            .collect();
        self.log_dropped("zero", keep.len());
        Ok(self.take_rows(&keep))
    }

    /// One row per `delimiter`-separated token of `column`.
    pub fn explode(&self, column: &str, delimiter: char) -> Result<Table> {
        let target = self.column(column)?;
        let target_name = target.name.clone();

        let mut rows = Vec::new();
        let mut tokens: Vec<Option<String>> = Vec::new();
        for row in 0..self.row_count() {
            match target.text(row) {
                Some(text) => {
                    let parts: Vec<&str> = text
                        .split(delimiter)
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .collect();
                    if parts.is_empty() {
                        rows.push(row);
                        tokens.push(None);
                    }
                    for part in parts {
                        rows.push(row);
                        tokens.push(Some(part.to_string()));
                    }
                }
                None => {
                    rows.push(row);
                    tokens.push(None);
                }
            }
        }

        let mut exploded = self.take_rows(&rows);
        for col in &mut exploded.columns {
            if col.name == target_name {
                col.data = ColumnData::Categorical(tokens);
                break;
            }
        }
        Ok(exploded)
    }

    /// Mean of `value` per category of `by`, ordered by category.
    pub fn group_mean(&self, by: &str, value: &str) -> Result<Vec<(String, f64)>> {
        let keys = self.categorical(by)?;
        let values = self.numeric(value)?;

        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (key, v) in keys.into_iter().zip(values) {
            if let (Some(key), Some(v)) = (key, v) {
                let entry = sums.entry(key).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }

        Ok(sums
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect())
    }

    /// Append a derived column.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            let found = column.len();
            return Err(ChartError::LengthMismatch {
                column: column.name,
                expected: self.row_count(),
                found,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    fn subset_columns(&self, subset: &[&str]) -> Result<Vec<&Column>> {
        if subset.is_empty() {
            Ok(self.columns.iter().collect())
        } else {
            subset.iter().map(|n| self.column(n)).collect()
        }
    }

    fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
        }
    }

    fn log_dropped(&self, what: &str, kept: usize) {
        let dropped = self.row_count() - kept;
        if dropped > 0 {
            log::debug!("Dropped {} rows containing {} values", dropped, what);
        }
    }
}

/// Accepts `m/d/yy`, `m/d/yyyy` and ISO `yyyy-mm-dd`.
///
/// Two-digit years follow the POSIX pivot: 69-99 map to 19xx, 00-68 to 20xx.
fn parse_date(s: &str) -> Option<Date> {
    if s.contains('-') {
        return s.parse::<Date>().ok();
    }

    let mut parts = s.split('/');
    let month: i8 = parts.next()?.parse().ok()?;
    let day: i8 = parts.next()?.parse().ok()?;
    let year_str = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let year: i16 = match year_str.len() {
        2 => {
            let yy: i16 = year_str.parse().ok()?;
            if yy >= 69 { 1900 + yy } else { 2000 + yy }
        }
        4 => year_str.parse().ok()?,
        _ => return None,
    };
    Date::new(year, month, day).ok()
}

fn fractional_year(date: Date) -> f64 {
    let day = f64::from(date.day_of_year() - 1);
    f64::from(date.year()) + day / f64::from(date.days_in_year())
}

/// Render a number the way it would be written in a category label.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        let csv = "original_title,budget_adj,revenue_adj,genres,release_date\n\
                   Alpha,100,50,Action|Drama,6/9/15\n\
                   Beta,0,500,Comedy,12/25/14\n\
                   Gamma,300,,Drama,\n";
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_type_inference() {
        let table = make_table();
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("budget_adj").unwrap().column_type(),
            ColumnType::Numeric
        );
        assert_eq!(
            table.column("genres").unwrap().column_type(),
            ColumnType::Categorical
        );
        assert_eq!(
            table.column("release_date").unwrap().column_type(),
            ColumnType::Temporal
        );
    }

    #[test]
    fn test_numeric_keeps_nulls() {
        let table = make_table();
        let revenue = table.numeric("revenue_adj").unwrap();
        assert_eq!(revenue, vec![Some(50.0), Some(500.0), None]);
    }

    #[test]
    fn test_numeric_rejects_categorical() {
        let table = make_table();
        let err = table.numeric("genres").unwrap_err();
        assert!(matches!(err, ChartError::NotNumeric { row: 1, .. }));
    }

    #[test]
    fn test_column_lookup_case_insensitive() {
        let table = make_table();
        assert!(table.column("BUDGET_ADJ").is_ok());
        assert!(matches!(
            table.column("missing"),
            Err(ChartError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_temporal_as_fractional_year() {
        let table = make_table();
        let dates = table.numeric("release_date").unwrap();
        let first = dates[0].unwrap();
        assert!(first > 2015.4 && first < 2015.5);
        assert_eq!(dates[2], None);
    }

    #[test]
    fn test_drop_nulls_and_zeros() {
        let table = make_table();
        let no_nulls = table.drop_nulls(&["revenue_adj"]).unwrap();
        assert_eq!(no_nulls.row_count(), 2);

        let no_zeros = no_nulls.drop_zeros(&["budget_adj", "revenue_adj"]).unwrap();
        assert_eq!(no_zeros.row_count(), 1);
        assert_eq!(
            no_zeros.categorical("original_title").unwrap(),
            vec![Some("Alpha".to_string())]
        );
    }

    #[test]
    fn test_select_and_drop_columns() {
        let table = make_table();
        let selected = table.select(&["genres", "budget_adj"]).unwrap();
        assert_eq!(selected.column_names(), vec!["genres", "budget_adj"]);

        let dropped = table.drop_columns(&["genres"]).unwrap();
        assert_eq!(dropped.column_count(), 4);
        assert!(table.drop_columns(&["nope"]).is_err());
    }

    #[test]
    fn test_explode_genres() {
        let table = make_table();
        let exploded = table.explode("genres", '|').unwrap();
        assert_eq!(exploded.row_count(), 4);
        assert_eq!(
            exploded.categorical("genres").unwrap(),
            vec![
                Some("Action".to_string()),
                Some("Drama".to_string()),
                Some("Comedy".to_string()),
                Some("Drama".to_string()),
            ]
        );
        assert_eq!(
            exploded.categorical("original_title").unwrap()[1],
            Some("Alpha".to_string())
        );
    }

    #[test]
    fn test_group_mean() {
        let table = make_table().explode("genres", '|').unwrap();
        let means = table.group_mean("genres", "budget_adj").unwrap();
        assert_eq!(
            means,
            vec![
                ("Action".to_string(), 100.0),
                ("Comedy".to_string(), 0.0),
                ("Drama".to_string(), 200.0),
            ]
        );
    }

    #[test]
    fn test_from_json() {
        let value = serde_json::json!([
            {"genre": "Drama", "revenue": 10},
            {"genre": "Action", "revenue": 20.5}
        ]);
        let table = Table::from_json(&value).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.numeric("revenue").unwrap(),
            vec![Some(10.0), Some(20.5)]
        );
    }

    #[test]
    fn test_empty_csv() {
        let result = Table::from_reader("a,b\n".as_bytes());
        assert!(matches!(result, Err(ChartError::EmptyData(_))));
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = make_table();
        let err = table
            .push_column(Column::numeric("profit", vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, ChartError::LengthMismatch { expected: 3, .. }));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2015.0), "2015");
        assert_eq!(format_number(2.5), "2.5");
    }
}
