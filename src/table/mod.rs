//! Feature tables
//!
//! A [`FeatureTable`] is the rectangular per-document representation handed to
//! classifiers: one row per document, one column per attribute. Rows are either
//! dense or sparse; a sparse row stores only its non-zero entries.
//!
//! Missing values (for example the class of a document whose author is
//! withheld) are stored as `NaN`.
//!
//! String attributes follow the usual tabular convention: the cell holds an
//! index into the table's string pool.

pub mod arff;

use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

pub use arff::{parse_arff, read_arff, write_arff};

/// Type of an attribute column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Real-valued column
    Numeric,
    /// Categorical column with a fixed label set
    Nominal(Vec<String>),
    /// Free text column (values index the string pool)
    String,
}

/// A named column of a [`FeatureTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    /// Numeric attribute
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    /// Nominal attribute over the given labels
    #[must_use]
    pub fn nominal(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(labels),
        }
    }

    /// String attribute
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::String,
        }
    }

    /// Attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute type
    #[must_use]
    pub const fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// True for numeric attributes
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    /// Labels of a nominal attribute
    #[must_use]
    pub fn labels(&self) -> Option<&[String]> {
        match &self.kind {
            AttributeKind::Nominal(labels) => Some(labels),
            _ => None,
        }
    }

    /// Position of `label` in a nominal attribute
    #[must_use]
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels()?.iter().position(|l| l == label)
    }
}

/// One instance (document) of a [`FeatureTable`]
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Every attribute value, in attribute order
    Dense(Vec<f64>),
    /// `(attribute index, value)` pairs with strictly increasing indices;
    /// absent attributes are zero
    Sparse(Vec<(usize, f64)>),
}

impl Row {
    /// Value of attribute `index`
    #[must_use]
    pub fn value(&self, index: usize) -> f64 {
        match self {
            Self::Dense(values) => values.get(index).copied().unwrap_or(0.0),
            Self::Sparse(entries) => entries
                .binary_search_by_key(&index, |&(i, _)| i)
                .map_or(0.0, |pos| entries[pos].1),
        }
    }

    /// True for sparse rows
    #[must_use]
    pub const fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Build a sparse row from a dense one, dropping zeros
    #[must_use]
    pub fn sparse_from_dense(values: &[f64]) -> Self {
        Self::Sparse(
            values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
        )
    }
}

/// Rectangular collection of feature vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    relation: String,
    attributes: Vec<Attribute>,
    rows: Vec<Row>,
    class_index: Option<usize>,
    strings: Vec<String>,
}

impl FeatureTable {
    /// Create an empty table with the given schema
    #[must_use]
    pub fn new(relation: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            relation: relation.into(),
            attributes,
            rows: Vec::new(),
            class_index: None,
            strings: Vec::new(),
        }
    }

    /// Relation (table) name
    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// All attributes in column order
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attribute at `index`
    #[must_use]
    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    /// Number of columns
    #[must_use]
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Number of rows
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.rows.len()
    }

    /// All rows
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row after validating it against the schema
    ///
    /// # Errors
    /// Returns error if a dense row has the wrong width or a sparse row has
    /// out-of-range or unordered indices
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        let width = self.attributes.len();
        match &row {
            Row::Dense(values) if values.len() != width => {
                return Err(Error::InvalidInput(format!(
                    "Dense row has {} values, table has {width} attributes",
                    values.len()
                )));
            }
            Row::Sparse(entries) => {
                let mut previous: Option<usize> = None;
                for &(index, _) in entries {
                    if index >= width || previous.is_some_and(|p| p >= index) {
                        return Err(Error::InvalidInput(format!(
                            "Sparse row index {index} is out of range or out of order"
                        )));
                    }
                    previous = Some(index);
                }
            }
            Row::Dense(_) => {}
        }
        self.rows.push(row);
        Ok(())
    }

    /// Store `value` in the string pool and return its cell encoding
    #[allow(clippy::cast_precision_loss)]
    pub fn intern_string(&mut self, value: impl Into<String>) -> f64 {
        self.strings.push(value.into());
        (self.strings.len() - 1) as f64
    }

    /// Value at (`row`, `column`)
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.rows.get(row).map_or(f64::NAN, |r| r.value(column))
    }

    /// Text of a string cell
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn string_value(&self, row: usize, column: usize) -> Option<&str> {
        if !matches!(self.attribute(column)?.kind(), AttributeKind::String) {
            return None;
        }
        let cell = self.value(row, column);
        if cell.is_nan() {
            return None;
        }
        self.strings.get(cell as usize).map(String::as_str)
    }

    /// Index of the class attribute, if set
    #[must_use]
    pub const fn class_index(&self) -> Option<usize> {
        self.class_index
    }

    /// Designate the class attribute
    ///
    /// # Errors
    /// Returns error if `index` is out of range or not a nominal attribute
    pub fn set_class_index(&mut self, index: usize) -> Result<()> {
        match self.attributes.get(index) {
            Some(attr) if attr.labels().is_some() => {
                self.class_index = Some(index);
                Ok(())
            }
            Some(attr) => Err(Error::InvalidInput(format!(
                "Class attribute '{}' must be nominal",
                attr.name()
            ))),
            None => Err(Error::InvalidInput(format!(
                "Class index {index} out of bounds (table has {} attributes)",
                self.attributes.len()
            ))),
        }
    }

    /// Labels of the class attribute
    #[must_use]
    pub fn class_labels(&self) -> Option<&[String]> {
        self.attributes.get(self.class_index?)?.labels()
    }

    /// Class label index of `row`, or `None` when missing or no class is set
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn class_value(&self, row: usize) -> Option<usize> {
        let value = self.value(row, self.class_index?);
        if value.is_nan() || value < 0.0 {
            None
        } else {
            Some(value as usize)
        }
    }

    /// Indices of numeric attributes other than the class
    #[must_use]
    pub fn numeric_attribute_indices(&self) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(i, a)| a.is_numeric() && Some(*i) != self.class_index)
            .map(|(i, _)| i)
            .collect()
    }

    /// Dense vector of the numeric attributes of `row`, missing values as zero
    #[must_use]
    pub fn numeric_vector(&self, row: usize) -> Vec<f64> {
        let Some(r) = self.rows.get(row) else {
            return Vec::new();
        };
        self.numeric_attribute_indices()
            .into_iter()
            .map(|i| {
                let v = r.value(i);
                if v.is_nan() {
                    0.0
                } else {
                    v
                }
            })
            .collect()
    }

    /// Project the table onto the attributes in `keep`
    ///
    /// Attributes keep their original relative order; the class index follows
    /// the class attribute if it is kept.
    ///
    /// # Errors
    /// Returns error if any index is out of range
    pub fn select_attributes(&self, keep: &[usize]) -> Result<Self> {
        let mut keep = keep.to_vec();
        keep.sort_unstable();
        keep.dedup();
        if let Some(&bad) = keep.iter().find(|&&i| i >= self.attributes.len()) {
            return Err(Error::InvalidInput(format!(
                "Attribute index {bad} out of bounds (table has {} attributes)",
                self.attributes.len()
            )));
        }

        let attributes = keep.iter().map(|&i| self.attributes[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| match row {
                Row::Dense(_) => Row::Dense(keep.iter().map(|&i| row.value(i)).collect()),
                Row::Sparse(_) => Row::Sparse(
                    keep.iter()
                        .enumerate()
                        .map(|(new, &old)| (new, row.value(old)))
                        .filter(|(_, v)| *v != 0.0)
                        .collect(),
                ),
            })
            .collect();
        let class_index = self
            .class_index
            .and_then(|c| keep.iter().position(|&i| i == c));

        Ok(Self {
            relation: self.relation.clone(),
            attributes,
            rows,
            class_index,
            strings: self.strings.clone(),
        })
    }

    /// Copy of the table holding only the rows in `indices`, in that order
    ///
    /// Out-of-range indices are skipped.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            relation: self.relation.clone(),
            attributes: self.attributes.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
            class_index: self.class_index,
            strings: self.strings.clone(),
        }
    }

    /// Remove `label` from the class attribute along with every row of that
    /// class; later labels shift down by one
    ///
    /// Returns `false` when there is no class attribute or it lacks `label`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn drop_class_label(&mut self, label: &str) -> bool {
        let Some(class_index) = self.class_index else {
            return false;
        };
        let Some(removed) = self.attributes[class_index].label_index(label) else {
            return false;
        };

        let rows = std::mem::take(&mut self.rows);
        for mut row in rows {
            let value = row.value(class_index);
            if value.is_nan() || value < 0.0 || (value as usize) < removed {
                self.rows.push(row);
                continue;
            }
            if value as usize == removed {
                continue;
            }
            let shifted = value - 1.0;
            match &mut row {
                Row::Dense(values) => values[class_index] = shifted,
                Row::Sparse(entries) => {
                    if let Ok(pos) = entries.binary_search_by_key(&class_index, |&(c, _)| c) {
                        if shifted == 0.0 {
                            entries.remove(pos);
                        } else {
                            entries[pos].1 = shifted;
                        }
                    }
                }
            }
            self.rows.push(row);
        }

        if let AttributeKind::Nominal(labels) = &mut self.attributes[class_index].kind {
            labels.remove(removed);
        }
        true
    }

    /// Convert to an Arrow record batch
    ///
    /// Numeric columns become `Float64` (missing as null); nominal and string
    /// columns become `Utf8` holding the label or text.
    ///
    /// # Errors
    /// Returns error if the table has no attributes
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.attributes.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.attributes.len());

        for (col, attr) in self.attributes.iter().enumerate() {
            match attr.kind() {
                AttributeKind::Numeric => {
                    fields.push(Field::new(attr.name(), DataType::Float64, true));
                    let values: Vec<Option<f64>> = (0..self.rows.len())
                        .map(|row| Some(self.value(row, col)).filter(|v| !v.is_nan()))
                        .collect();
                    columns.push(Arc::new(Float64Array::from(values)));
                }
                AttributeKind::Nominal(labels) => {
                    fields.push(Field::new(attr.name(), DataType::Utf8, true));
                    let values: Vec<Option<String>> = (0..self.rows.len())
                        .map(|row| {
                            let v = self.value(row, col);
                            if v.is_nan() {
                                None
                            } else {
                                labels.get(v as usize).cloned()
                            }
                        })
                        .collect();
                    columns.push(Arc::new(StringArray::from(values)));
                }
                AttributeKind::String => {
                    fields.push(Field::new(attr.name(), DataType::Utf8, true));
                    let values: Vec<Option<String>> = (0..self.rows.len())
                        .map(|row| self.string_value(row, col).map(str::to_string))
                        .collect();
                    columns.push(Arc::new(StringArray::from(values)));
                }
            }
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn authors() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string()]
    }

    fn small_table(sparse: bool) -> FeatureTable {
        let mut table = FeatureTable::new(
            "test",
            vec![
                Attribute::string("title"),
                Attribute::numeric("Words{the}"),
                Attribute::numeric("Words{a}"),
                Attribute::nominal("author", authors()),
            ],
        );
        let t0 = table.intern_string("doc-0");
        let t1 = table.intern_string("doc-1");
        let rows = [vec![t0, 3.0, 0.0, 0.0], vec![t1, 0.0, 2.0, 1.0]];
        for values in rows {
            let row = if sparse {
                Row::sparse_from_dense(&values)
            } else {
                Row::Dense(values)
            };
            table.push_row(row).unwrap();
        }
        table.set_class_index(3).unwrap();
        table
    }

    #[test]
    fn test_sparse_and_dense_rows_agree() {
        let dense = small_table(false);
        let sparse = small_table(true);
        for row in 0..2 {
            for col in 0..4 {
                assert_eq!(dense.value(row, col), sparse.value(row, col));
            }
        }
        assert!(sparse.rows()[0].is_sparse());
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = FeatureTable::new("t", vec![Attribute::numeric("x")]);
        let result = table.push_row(Row::Dense(vec![1.0, 2.0]));
        assert!(result.is_err());
        assert!(table
            .push_row(Row::Sparse(vec![(1, 1.0)]))
            .unwrap_err()
            .to_string()
            .contains("out of range"));
    }

    #[test]
    fn test_class_index_must_be_nominal() {
        let mut table = small_table(false);
        assert!(table.set_class_index(1).is_err());
        assert!(table.set_class_index(9).is_err());
        assert_eq!(table.class_index(), Some(3));
        assert_eq!(table.class_value(0), Some(0));
        assert_eq!(table.class_value(1), Some(1));
    }

    #[test]
    fn test_missing_class_value() {
        let mut table = FeatureTable::new(
            "t",
            vec![Attribute::numeric("x"), Attribute::nominal("author", authors())],
        );
        table.push_row(Row::Dense(vec![1.0, f64::NAN])).unwrap();
        table.set_class_index(1).unwrap();
        assert_eq!(table.class_value(0), None);
    }

    #[test]
    fn test_string_values() {
        let table = small_table(true);
        assert_eq!(table.string_value(1, 0), Some("doc-1"));
        assert_eq!(table.string_value(1, 1), None);
    }

    #[test]
    fn test_numeric_vector_skips_class_and_strings() {
        let table = small_table(false);
        assert_eq!(table.numeric_attribute_indices(), vec![1, 2]);
        assert_eq!(table.numeric_vector(0), vec![3.0, 0.0]);
    }

    #[test]
    fn test_select_attributes_remaps_class() {
        let table = small_table(true);
        let projected = table.select_attributes(&[3, 2]).unwrap();
        assert_eq!(projected.num_attributes(), 2);
        assert_eq!(projected.attribute(0).unwrap().name(), "Words{a}");
        assert_eq!(projected.class_index(), Some(1));
        assert_eq!(projected.value(1, 0), 2.0);
        assert_eq!(projected.class_value(1), Some(1));
        assert!(table.select_attributes(&[7]).is_err());
    }

    #[test]
    fn test_select_rows() {
        let table = small_table(true);
        let subset = table.select_rows(&[1, 5]);
        assert_eq!(subset.num_instances(), 1);
        assert_eq!(subset.class_value(0), Some(1));
        assert_eq!(subset.string_value(0, 0), Some("doc-1"));
    }

    #[test]
    fn test_drop_class_label() {
        for sparse in [false, true] {
            let mut table = small_table(sparse);
            assert!(table.drop_class_label("alice"));
            assert_eq!(table.class_labels(), Some(&["bob".to_string()][..]));
            assert_eq!(table.num_instances(), 1);
            assert_eq!(table.class_value(0), Some(0));
            assert_eq!(table.string_value(0, 0), Some("doc-1"));
            assert!(!table.drop_class_label("alice"));
        }
    }

    #[test]
    fn test_drop_last_class_label_keeps_other_rows() {
        let mut table = small_table(true);
        assert!(table.drop_class_label("bob"));
        assert_eq!(table.num_instances(), 1);
        assert_eq!(table.class_value(0), Some(0));
        assert_eq!(table.value(0, 1), 3.0);
    }

    #[test]
    fn test_to_record_batch() {
        let table = small_table(false);
        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        let authors = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(authors.value(1), "bob");
        let titles = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(titles.value(0), "doc-0");
        assert!(!titles.is_null(0));
    }
}
