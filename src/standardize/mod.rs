// src/standardize/mod.rs
pub mod date;
pub mod format;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;
use tracing::debug;

use crate::config::PartnerConfig;
use crate::error::Result;
use crate::table::Tabular;

/// Output columns, in output order.
pub const CANONICAL_COLUMNS: [&str; 7] = [
    "external_id",
    "first_name",
    "last_name",
    "dob",
    "email",
    "phone",
    "partner_code",
];

pub fn canonical_schema() -> SchemaRef {
    let fields = CANONICAL_COLUMNS
        .iter()
        .map(|&name| {
            let dt = if name == "dob" {
                DataType::Date32
            } else {
                DataType::Utf8
            };
            Field::new(name, dt, true)
        })
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
}

/// Normalize one partner's raw table into the canonical shape.
///
/// Order matters: renames run first so the later steps and the `external_id`
/// filter see canonical names.
#[tracing::instrument(level = "debug", skip_all, fields(partner_code = %config.partner_code))]
pub fn standardize<T: Tabular>(table: T, config: &PartnerConfig) -> Result<T> {
    let mut table = table;
    for (source, target) in &config.column_mapping {
        table = table.rename_column(source, target)?;
    }

    let pattern = &config.dob_format;
    let policy = config.phone_policy;
    let table = table
        .map_strings("first_name", |s| Some(format::title_case(s)))?
        .map_strings("last_name", |s| Some(format::title_case(s)))?
        .map_strings("email", |s| Some(format::lower_email(s)))?
        .map_dates("dob", |s| pattern.parse(s))?
        .map_strings("phone", |s| format::format_phone(s, policy))?
        .with_constant("partner_code", &config.partner_code)?;

    let before = table.num_rows();
    let table = table.filter_rows("external_id", |v| v.is_some())?;
    debug!(
        rows = table.num_rows(),
        dropped = before - table.num_rows(),
        "filtered rows without external_id"
    );

    table.select(&CANONICAL_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::date::DatePattern;
    use super::*;
    use crate::config::PhonePolicy;
    use crate::error::PipelineError;
    use crate::table::Frame;
    use anyhow::Result;
    use arrow::array::{Array, Date32Array};
    use chrono::NaiveDate;

    fn acme_config() -> PartnerConfig {
        PartnerConfig {
            partner_code: "ACME".into(),
            delimiter: b'|',
            dob_format: DatePattern::compile("MM/dd/yyyy").unwrap(),
            column_mapping: vec![
                ("MBI".into(), "external_id".into()),
                ("FNAME".into(), "first_name".into()),
                ("LNAME".into(), "last_name".into()),
                ("DOB".into(), "dob".into()),
                ("EMAIL".into(), "email".into()),
                ("PHONE".into(), "phone".into()),
            ],
            source_path: None,
            phone_policy: PhonePolicy::PassThrough,
        }
    }

    fn acme_raw() -> Result<Frame> {
        Ok(Frame::from_strings(vec![
            ("PHONE", vec![Some("(555) 123-4567"), Some("12345"), Some("555 000 1111")]),
            ("MBI", vec![Some("A1"), Some("A2"), None]),
            ("FNAME", vec![Some("jOHN"), Some("mary jane"), Some("x")]),
            ("LNAME", vec![Some("DOE"), Some("smith"), Some("y")]),
            ("DOB", vec![Some("01/15/1980"), Some("not-a-date"), Some("02/02/1990")]),
            ("EMAIL", vec![Some("John.Doe@EXAMPLE.com"), None, Some("z@z.z")]),
            ("PLAN", vec![Some("gold"), Some("silver"), Some("bronze")]),
        ])?)
    }

    #[test]
    fn standardizes_acme_rows() -> Result<()> {
        let out = standardize(acme_raw()?, &acme_config())?;

        assert_eq!(out.schema(), canonical_schema());
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.strings("external_id"), vec![Some("A1".into()), Some("A2".into())]);
        assert_eq!(
            out.strings("first_name"),
            vec![Some("John".into()), Some("Mary Jane".into())]
        );
        assert_eq!(out.strings("last_name"), vec![Some("Doe".into()), Some("Smith".into())]);
        assert_eq!(
            out.strings("email"),
            vec![Some("john.doe@example.com".into()), None]
        );
        assert_eq!(
            out.strings("phone"),
            vec![Some("555-123-4567".into()), Some("12345".into())]
        );
        assert_eq!(
            out.strings("partner_code"),
            vec![Some("ACME".into()), Some("ACME".into())]
        );

        let dob = out
            .batch()
            .column(3)
            .as_any()
            .downcast_ref::<Date32Array>()
            .expect("dob is date32");
        assert_eq!(dob.value_as_date(0), NaiveDate::from_ymd_opt(1980, 1, 15));
        assert!(dob.is_null(1), "unparseable dob becomes null, row kept");
        Ok(())
    }

    #[test]
    fn schema_is_canonical_whatever_the_source_names() -> Result<()> {
        let raw = Frame::from_strings(vec![
            ("partner_code", vec![Some("stale")]),
            ("phone", vec![Some("5551234567")]),
            ("email", vec![Some("A@B.C")]),
            ("dob", vec![Some("1980-01-15")]),
            ("last_name", vec![Some("b")]),
            ("first_name", vec![Some("a")]),
            ("external_id", vec![Some("E9")]),
        ])?;
        let config = PartnerConfig {
            column_mapping: Vec::new(),
            dob_format: DatePattern::compile("yyyy-MM-dd").unwrap(),
            ..acme_config()
        };
        let out = standardize(raw, &config)?;
        assert_eq!(out.schema(), canonical_schema());
        assert_eq!(out.strings("partner_code"), vec![Some("ACME".into())]);
        Ok(())
    }

    #[test]
    fn null_phone_policy_drops_malformed_numbers() -> Result<()> {
        let config = PartnerConfig {
            phone_policy: PhonePolicy::Null,
            ..acme_config()
        };
        let out = standardize(acme_raw()?, &config)?;
        assert_eq!(out.strings("phone"), vec![Some("555-123-4567".into()), None]);
        Ok(())
    }

    #[test]
    fn unmapped_required_column_is_missing() -> Result<()> {
        let mut config = acme_config();
        config.column_mapping.retain(|(src, _)| src != "EMAIL");
        match standardize(acme_raw()?, &config) {
            Err(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, "email"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn missing_external_id_column_is_missing() -> Result<()> {
        let mut config = acme_config();
        config.column_mapping.retain(|(src, _)| src != "MBI");
        match standardize(acme_raw()?, &config) {
            Err(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, "external_id"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
        Ok(())
    }
}
