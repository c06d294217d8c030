//! Table and IndexedTable data structures

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use super::value::{DynamicValue, Object, NULL};

/// A row maps column names to cells; absent cells read as null
pub type Row = Object;

/// Name of the synthetic label column produced by [`Table::transposed`]
pub const TRANSPOSE_LABEL: &str = "column";

const TRANSPOSE_ROW_PREFIX: &str = "row_";

/// Ordered columns over ordered, possibly sparse rows
///
/// Every transform returns a new table and leaves the source untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table from column names and rows; repeated names keep their first position
    pub fn new<I, S>(columns: I, rows: Vec<Row>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Create an empty table with no columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a sequence of objects, unioning their keys in first-seen order
    pub fn from_objects(values: &[DynamicValue]) -> Self {
        let mut columns: IndexSet<String> = IndexSet::new();
        let mut rows = Vec::with_capacity(values.len());
        for value in values {
            if let DynamicValue::Object(obj) = value {
                for key in obj.keys() {
                    if !columns.contains(key) {
                        columns.insert(key.clone());
                    }
                }
                rows.push(obj.clone());
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> impl ExactSizeIterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, column), null when the row or the cell is absent
    pub fn cell(&self, row: usize, column: &str) -> &DynamicValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// All values of a column in row order, null-filled
    pub fn column(&self, name: &str) -> Vec<DynamicValue> {
        self.rows
            .iter()
            .map(|row| row.get(name).cloned().unwrap_or_default())
            .collect()
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        let n = n.min(self.rows.len());
        self.with_rows(self.rows[..n].to_vec())
    }

    /// Last `n` rows
    pub fn tail(&self, n: usize) -> Table {
        let n = n.min(self.rows.len());
        self.with_rows(self.rows[self.rows.len() - n..].to_vec())
    }

    /// Keep only the named columns, in the requested order; unknown names are ignored
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let keep: IndexSet<String> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.columns.contains(*name))
            .map(str::to_string)
            .collect();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|name| (name.clone(), row.get(name).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect();
        Table {
            columns: keep,
            rows,
        }
    }

    /// Remove the named columns
    pub fn drop<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let dropped: IndexSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let keep: Vec<&str> = self
            .columns()
            .filter(|name| !dropped.contains(name))
            .collect();
        self.select(&keep)
    }

    /// Rename columns; names missing from the mapping are kept
    pub fn renamed(&self, mapping: &FxHashMap<String, String>) -> Table {
        let rename = |name: &String| mapping.get(name).unwrap_or(name).clone();
        let columns = self.columns.iter().map(rename).collect();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|(k, v)| (rename(k), v.clone())).collect())
            .collect();
        Table { columns, rows }
    }

    /// Keep rows satisfying the predicate
    pub fn filtered<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Row) -> bool,
    {
        self.with_rows(self.rows.iter().filter(|row| predicate(row)).cloned().collect())
    }

    /// Zero-based row number column, prepended unless `name` already exists
    pub fn with_row_number(&self, name: &str) -> Table {
        let columns = if self.columns.contains(name) {
            self.columns.clone()
        } else {
            let mut columns = IndexSet::with_capacity(self.columns.len() + 1);
            columns.insert(name.to_string());
            columns.extend(self.columns.iter().cloned());
            columns
        };
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut out = row.clone();
                out.insert(name.to_string(), DynamicValue::Number(i as f64));
                out
            })
            .collect();
        Table { columns, rows }
    }

    /// Stable sort by one column using the cross-kind total order
    pub fn sorted(&self, by: &str, ascending: bool) -> Table {
        if !self.columns.contains(by) {
            return self.clone();
        }
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let va = a.get(by).unwrap_or(&NULL);
            let vb = b.get(by).unwrap_or(&NULL);
            let ord = va.total_cmp(vb);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        self.with_rows(rows)
    }

    /// Key rows by the rendering of one column's cell; on collision the last row wins
    pub fn index(&self, by: &str) -> IndexedTable {
        let mut rows: IndexMap<String, Row> = IndexMap::new();
        for row in &self.rows {
            let Some(key) = row.get(by).and_then(DynamicValue::render_key) else {
                continue;
            };
            rows.insert(key, row.clone());
        }
        IndexedTable {
            index_column: by.to_string(),
            columns: self.column_names(),
            rows,
        }
    }

    /// Pivot rows into columns
    ///
    /// The result has a `column` label column holding the former column names
    /// and one further column per former row. Former rows are labelled from
    /// their own `column` cell when the source has one, otherwise `row_<i>`.
    /// When the former column names are exactly a synthetic `row_<i>` run the
    /// label column is left out, so transposing twice restores the columns.
    pub fn transposed(&self) -> Table {
        let label_source = self.columns.contains(TRANSPOSE_LABEL);
        let pivoted: Vec<&String> = self
            .columns
            .iter()
            .filter(|name| !(label_source && name.as_str() == TRANSPOSE_LABEL))
            .collect();

        let mut labels: IndexSet<String> = IndexSet::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let mut label = label_source
                .then(|| row.get(TRANSPOSE_LABEL).and_then(DynamicValue::render_key))
                .flatten()
                .filter(|label| !labels.contains(label))
                .unwrap_or_else(|| format!("{TRANSPOSE_ROW_PREFIX}{i}"));
            while labels.contains(&label) {
                label.push('_');
            }
            labels.insert(label);
        }

        let synthetic = pivoted
            .iter()
            .enumerate()
            .all(|(i, name)| **name == format!("{TRANSPOSE_ROW_PREFIX}{i}"));

        let mut columns: IndexSet<String> = IndexSet::with_capacity(labels.len() + 1);
        if !synthetic {
            columns.insert(TRANSPOSE_LABEL.to_string());
        }
        columns.extend(labels.iter().cloned());

        let rows = pivoted
            .iter()
            .map(|name| {
                let mut out = Row::with_capacity(columns.len());
                if !synthetic {
                    out.insert(TRANSPOSE_LABEL.to_string(), DynamicValue::from(name.as_str()));
                }
                for (label, source) in labels.iter().zip(&self.rows) {
                    out.insert(label.clone(), source.get(*name).cloned().unwrap_or_default());
                }
                out
            })
            .collect();

        Table { columns, rows }
    }

    /// Append a row, registering any new column names it introduces
    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.columns.contains(key) {
                self.columns.insert(key.clone());
            }
        }
        self.rows.push(row);
    }

    fn with_rows(&self, rows: Vec<Row>) -> Table {
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Rows keyed by the rendering of one column
#[derive(Debug, Clone)]
pub struct IndexedTable {
    index_column: String,
    columns: Vec<String>,
    rows: IndexMap<String, Row>,
}

impl IndexedTable {
    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Back to a plain table, one row per distinct key
    pub fn to_table(&self) -> Table {
        Table {
            columns: self.columns.iter().cloned().collect(),
            rows: self.rows.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, DynamicValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample() -> Table {
        Table::new(
            ["sym", "px"],
            vec![
                row(&[("sym", "b".into()), ("px", 2.0.into())]),
                row(&[("sym", "a".into())]),
                row(&[("sym", "c".into()), ("px", 1.0.into())]),
            ],
        )
    }

    #[test]
    fn test_column_null_fills() {
        let t = sample();
        assert_eq!(
            t.column("px"),
            vec![2.0.into(), DynamicValue::Null, 1.0.into()]
        );
        assert!(t.cell(1, "px").is_null());
        assert!(t.cell(9, "sym").is_null());
    }

    #[test]
    fn test_head_tail_clamp() {
        let t = sample();
        assert_eq!(t.head(10).row_count(), 3);
        assert_eq!(t.tail(0).row_count(), 0);
        assert_eq!(t.tail(1).rows()[0], t.rows()[2]);
    }

    #[test]
    fn test_sorted_nulls_first_ascending() {
        let t = sample().sorted("px", true);
        assert_eq!(
            t.column("sym"),
            vec![DynamicValue::from("a"), "c".into(), "b".into()]
        );
        let t = sample().sorted("px", false);
        assert_eq!(
            t.column("sym"),
            vec![DynamicValue::from("b"), "c".into(), "a".into()]
        );
    }

    #[test]
    fn test_index_last_wins() {
        let t = Table::new(
            ["k", "v"],
            vec![
                row(&[("k", "x".into()), ("v", 1.0.into())]),
                row(&[("k", "y".into()), ("v", 2.0.into())]),
                row(&[("k", "x".into()), ("v", 3.0.into())]),
                row(&[("v", 4.0.into())]),
            ],
        );
        let idx = t.index("k");
        assert_eq!(idx.keys().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(idx.get("x").and_then(|r| r.get("v")), Some(&DynamicValue::from(3.0)));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_transposed_shape() {
        let t = sample().transposed();
        assert_eq!(
            t.column_names(),
            ["column", "row_0", "row_1", "row_2"]
        );
        assert_eq!(t.column("column"), vec![DynamicValue::from("sym"), "px".into()]);
        assert!(t.cell(1, "row_1").is_null());

        let back = t.transposed();
        assert_eq!(back.column_names(), ["sym", "px"]);
        assert_eq!(back.column("sym"), sample().column("sym"));
    }

    #[test]
    fn test_select_drop_rename() {
        let t = sample();
        assert_eq!(t.select(&["px", "nope"]).column_names(), ["px"]);
        assert_eq!(t.drop(&["px"]).column_names(), ["sym"]);
        let mut mapping = FxHashMap::default();
        mapping.insert("px".to_string(), "Price".to_string());
        let renamed = t.renamed(&mapping);
        assert_eq!(renamed.column_names(), ["sym", "Price"]);
        assert_eq!(renamed.cell(0, "Price"), &DynamicValue::from(2.0));
    }

    #[test]
    fn test_with_row_number_and_filter() {
        let t = sample().with_row_number("index");
        assert_eq!(t.column_names(), ["index", "sym", "px"]);
        assert_eq!(t.cell(2, "index"), &DynamicValue::from(2.0));
        let f = t.filtered(|r| r.get("px").is_some());
        assert_eq!(f.row_count(), 2);
    }

    #[test]
    fn test_with_row_number_keeps_existing_position() {
        let t = Table::new(
            ["a", "index"],
            vec![row(&[("a", 1.0.into()), ("index", "x".into())])],
        );
        let numbered = t.with_row_number("index");
        assert_eq!(numbered.column_names(), ["a", "index"]);
        assert_eq!(numbered.cell(0, "index"), &DynamicValue::from(0.0));
    }
}
