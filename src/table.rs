// src/table.rs

use arrow::{
    array::{Array, ArrayRef, BooleanArray, Date32Array, StringArray},
    compute::{cast, concat_batches, filter_record_batch},
    datatypes::{DataType, Date32Type, Field, Schema, SchemaRef},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// Column-by-name operations the standardizer needs from a table.
///
/// Every operation consumes the table and returns the transformed one; columns are
/// addressed by name because the column set is decided by partner configuration.
pub trait Tabular: Sized {
    fn column_names(&self) -> Vec<String>;

    fn num_rows(&self) -> usize;

    /// Rename every column called `from`. Renaming an absent column is a no-op.
    fn rename_column(self, from: &str, to: &str) -> Result<Self>;

    /// Replace `column` with `f` applied to each non-null value, as a string column.
    fn map_strings<F>(self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync;

    /// Replace `column` with `f` applied to each non-null value, as a date column.
    fn map_dates<F>(self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<NaiveDate> + Send + Sync;

    /// Set `column` to `value` on every row, adding the column if needed.
    fn with_constant(self, column: &str, value: &str) -> Result<Self>;

    /// Keep the rows for which `keep` returns true on `column`'s value.
    fn filter_rows<P>(self, column: &str, keep: P) -> Result<Self>
    where
        P: Fn(Option<&str>) -> bool + Send + Sync;

    /// Keep exactly `columns`, in that order.
    fn select(self, columns: &[&str]) -> Result<Self>;

    /// Append `other`'s rows, matching columns by name.
    fn union_by_name(self, other: Self) -> Result<Self>;
}

/// An in-memory table backed by a single Arrow `RecordBatch`.
#[derive(Debug, Clone)]
pub struct Frame {
    batch: RecordBatch,
}

impl Frame {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Position of the single column called `name`.
    fn column_index(&self, name: &str) -> Result<usize> {
        let schema = self.batch.schema();
        let mut hits = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name() == name)
            .map(|(i, _)| i);
        match (hits.next(), hits.next()) {
            (Some(i), None) => Ok(i),
            (Some(_), Some(_)) => Err(PipelineError::AmbiguousColumn(name.to_string())),
            (None, _) => Err(PipelineError::MissingColumn {
                column: name.to_string(),
                available: self.column_names(),
            }),
        }
    }

    /// Rebuild with new fields/columns, carrying the row count so zero-column frames survive.
    fn rebuild(&self, fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<Self> {
        let options = RecordBatchOptions::new().with_row_count(Some(self.batch.num_rows()));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
        Ok(Self { batch })
    }

    fn replace_column(self, idx: usize, array: ArrayRef) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let name = fields[idx].name().clone();
        fields[idx] = Field::new(name, array.data_type().clone(), true);
        let mut columns = self.batch.columns().to_vec();
        columns[idx] = array;
        self.rebuild(fields, columns)
    }

    /// `column` viewed as strings; non-string columns are cast.
    fn string_column(&self, idx: usize) -> Result<StringArray> {
        let col = self.batch.column(idx);
        let utf8 = if col.data_type() == &DataType::Utf8 {
            col.clone()
        } else {
            cast(col, &DataType::Utf8)?
        };
        Ok(utf8
            .as_any()
            .downcast_ref::<StringArray>()
            .cloned()
            .unwrap_or_else(|| StringArray::new_null(utf8.len())))
    }

    #[cfg(test)]
    pub(crate) fn from_strings(columns: Vec<(&str, Vec<Option<&str>>)>) -> Result<Self> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .into_iter()
            .map(|(_, values)| Arc::new(StringArray::from(values)) as ArrayRef)
            .collect();
        Ok(Self::new(RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            arrays,
        )?))
    }

    #[cfg(test)]
    pub(crate) fn strings(&self, column: &str) -> Vec<Option<String>> {
        let idx = self.column_index(column).expect("column present");
        let arr = self.string_column(idx).expect("castable to string");
        arr.iter().map(|v| v.map(str::to_string)).collect()
    }
}

impl Tabular for Frame {
    fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn rename_column(self, from: &str, to: &str) -> Result<Self> {
        if from == to || !self.column_names().iter().any(|n| n == from) {
            return Ok(self);
        }
        let fields: Vec<Field> = self
            .batch
            .schema()
            .fields()
            .iter()
            .map(|f| {
                let f = f.as_ref().clone();
                if f.name() == from {
                    f.with_name(to)
                } else {
                    f
                }
            })
            .collect();
        let columns = self.batch.columns().to_vec();
        self.rebuild(fields, columns)
    }

    fn map_strings<F>(self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync,
    {
        let idx = self.column_index(column)?;
        let input = self.string_column(idx)?;
        let values: Vec<Option<String>> = (0..input.len())
            .into_par_iter()
            .map(|i| {
                if input.is_null(i) {
                    None
                } else {
                    f(input.value(i))
                }
            })
            .collect();
        self.replace_column(idx, Arc::new(StringArray::from(values)))
    }

    fn map_dates<F>(self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<NaiveDate> + Send + Sync,
    {
        let idx = self.column_index(column)?;
        let input = self.string_column(idx)?;
        let days: Vec<Option<i32>> = (0..input.len())
            .into_par_iter()
            .map(|i| {
                if input.is_null(i) {
                    None
                } else {
                    f(input.value(i)).map(Date32Type::from_naive_date)
                }
            })
            .collect();
        self.replace_column(idx, Arc::new(Date32Array::from(days)))
    }

    fn with_constant(self, column: &str, value: &str) -> Result<Self> {
        let n = self.batch.num_rows();
        let array: ArrayRef = Arc::new(StringArray::from_iter_values(
            std::iter::repeat(value).take(n),
        ));
        match self.column_index(column) {
            Ok(idx) => self.replace_column(idx, array),
            Err(PipelineError::MissingColumn { .. }) => {
                let schema = self.batch.schema();
                let mut fields: Vec<Field> =
                    schema.fields().iter().map(|f| f.as_ref().clone()).collect();
                fields.push(Field::new(column, DataType::Utf8, true));
                let mut columns = self.batch.columns().to_vec();
                columns.push(array);
                self.rebuild(fields, columns)
            }
            Err(e) => Err(e),
        }
    }

    fn filter_rows<P>(self, column: &str, keep: P) -> Result<Self>
    where
        P: Fn(Option<&str>) -> bool + Send + Sync,
    {
        let idx = self.column_index(column)?;
        let input = self.string_column(idx)?;
        let mask: Vec<bool> = (0..input.len())
            .into_par_iter()
            .map(|i| keep((!input.is_null(i)).then(|| input.value(i))))
            .collect();
        let batch = filter_record_batch(&self.batch, &BooleanArray::from(mask))?;
        Ok(Self { batch })
    }

    fn select(self, columns: &[&str]) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());
        for name in columns {
            let idx = self.column_index(name)?;
            fields.push(schema.field(idx).clone());
            arrays.push(self.batch.column(idx).clone());
        }
        self.rebuild(fields, arrays)
    }

    fn union_by_name(self, other: Self) -> Result<Self> {
        let left = self.batch.schema();
        let right = other.batch.schema();
        if left.fields().len() != right.fields().len() {
            return Err(PipelineError::SchemaMismatch(format!(
                "{:?} vs {:?}",
                self.column_names(),
                other.column_names()
            )));
        }

        // every right name must map to exactly one left column
        for field in right.fields() {
            self.column_index(field.name()).map_err(|_| {
                PipelineError::SchemaMismatch(format!(
                    "column `{}` does not match a single left column (left has {:?})",
                    field.name(),
                    self.column_names()
                ))
            })?;
        }

        let mut aligned = Vec::with_capacity(left.fields().len());
        for field in left.fields() {
            let idx = other.column_index(field.name()).map_err(|_| {
                PipelineError::SchemaMismatch(format!(
                    "column `{}` missing on the right (right has {:?})",
                    field.name(),
                    other.column_names()
                ))
            })?;
            let col = other.batch.column(idx);
            if col.data_type() != field.data_type() {
                return Err(PipelineError::SchemaMismatch(format!(
                    "column `{}` is {} on the left but {} on the right",
                    field.name(),
                    field.data_type(),
                    col.data_type()
                )));
            }
            aligned.push(col.clone());
        }

        let options = RecordBatchOptions::new().with_row_count(Some(other.batch.num_rows()));
        let right_aligned = RecordBatch::try_new_with_options(left.clone(), aligned, &options)?;
        let batch = concat_batches(&left, [&self.batch, &right_aligned])?;
        Ok(Self { batch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn people() -> Result<Frame> {
        Ok(Frame::from_strings(vec![
            ("id", vec![Some("1"), None, Some("3")]),
            ("name", vec![Some("ann"), Some("bob"), None]),
        ])?)
    }

    #[test]
    fn rename_absent_column_is_noop() -> Result<()> {
        let frame = people()?.rename_column("nope", "x")?;
        assert_eq!(frame.column_names(), vec!["id", "name"]);
        let frame = frame.rename_column("id", "external_id")?;
        assert_eq!(frame.column_names(), vec!["external_id", "name"]);
        Ok(())
    }

    #[test]
    fn map_strings_keeps_nulls() -> Result<()> {
        let frame = people()?.map_strings("name", |s| Some(s.to_uppercase()))?;
        assert_eq!(
            frame.strings("name"),
            vec![Some("ANN".into()), Some("BOB".into()), None]
        );
        Ok(())
    }

    #[test]
    fn map_dates_produces_date32() -> Result<()> {
        let frame = Frame::from_strings(vec![("d", vec![Some("1980-01-15"), Some("x"), None])])?
            .map_dates("d", |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
        assert_eq!(frame.schema().field(0).data_type(), &DataType::Date32);
        let days = frame
            .batch()
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .expect("date32");
        assert_eq!(days.value_as_date(0), NaiveDate::from_ymd_opt(1980, 1, 15));
        assert!(days.is_null(1));
        assert!(days.is_null(2));
        Ok(())
    }

    #[test]
    fn missing_column_is_reported() -> Result<()> {
        let err = people()?.map_strings("email", |s| Some(s.into())).unwrap_err();
        match err {
            PipelineError::MissingColumn { column, available } => {
                assert_eq!(column, "email");
                assert_eq!(available, vec!["id", "name"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn duplicate_column_is_ambiguous() -> Result<()> {
        let frame = people()?.rename_column("name", "id")?;
        assert!(matches!(
            frame.select(&["id"]),
            Err(PipelineError::AmbiguousColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn filter_and_constant() -> Result<()> {
        let frame = people()?
            .with_constant("code", "ACME")?
            .filter_rows("id", |v| v.is_some())?;
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.strings("id"), vec![Some("1".into()), Some("3".into())]);
        assert_eq!(
            frame.strings("code"),
            vec![Some("ACME".into()), Some("ACME".into())]
        );
        Ok(())
    }

    #[test]
    fn select_orders_and_drops() -> Result<()> {
        let frame = people()?.with_constant("extra", "x")?.select(&["name", "id"])?;
        assert_eq!(frame.column_names(), vec!["name", "id"]);
        Ok(())
    }

    #[test]
    fn union_matches_by_name_not_position() -> Result<()> {
        let left = people()?;
        let right = Frame::from_strings(vec![
            ("name", vec![Some("cy"), Some("di")]),
            ("id", vec![Some("7"), Some("8")]),
        ])?;
        let unioned = left.union_by_name(right)?;
        assert_eq!(unioned.num_rows(), 5);
        assert_eq!(unioned.column_names(), vec!["id", "name"]);
        assert_eq!(
            unioned.strings("id"),
            vec![
                Some("1".into()),
                None,
                Some("3".into()),
                Some("7".into()),
                Some("8".into())
            ]
        );
        assert_eq!(unioned.strings("name")[3].as_deref(), Some("cy"));
        Ok(())
    }

    #[test]
    fn union_rejects_duplicate_left_names() -> Result<()> {
        let left = people()?.rename_column("name", "id")?;
        let right = Frame::from_strings(vec![
            ("id", vec![Some("7")]),
            ("name", vec![Some("cy")]),
        ])?;
        assert!(matches!(
            left.union_by_name(right),
            Err(PipelineError::SchemaMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn union_rejects_different_columns() -> Result<()> {
        let right = Frame::from_strings(vec![
            ("id", vec![Some("7")]),
            ("other", vec![Some("x")]),
        ])?;
        assert!(matches!(
            people()?.union_by_name(right),
            Err(PipelineError::SchemaMismatch(_))
        ));
        Ok(())
    }
}
