//! The mix pipeline: aggregate ingredient rows from every input, average
//! weights over the total file count, and emit one sorted output table.
//!
//! The pass is deliberately non-streaming: the output column union and the
//! file-count divisor are only known once every input's header has been read,
//! so all rows are funneled into the [`IngredientTable`] before any output is
//! produced. Memory is O(total rows + distinct ingredients).

use std::{
    collections::HashMap,
    io::Read,
    path::Path,
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    cli::MixArgs,
    error::MixError,
    io_utils,
    schema_union::SchemaUnion,
    weight::{self, WeightFormat},
};

/// Header names of the two role columns, taken from the first input's first
/// two header fields. Later inputs use the same roles positionally; their own
/// header text for those positions is not consulted.
#[derive(Debug, Clone)]
pub struct RoleColumns {
    pub ingredient: String,
    pub weight: String,
}

/// Per-run aggregation state, built incrementally while reading inputs and
/// consumed by [`emit_rows`]. Lives exactly one merge invocation.
#[derive(Debug, Default)]
pub struct IngredientTable {
    records: HashMap<String, IngredientRecord>,
}

#[derive(Debug, Default)]
struct IngredientRecord {
    /// One sample per input file containing a row for this ingredient.
    weight_samples: Vec<f64>,
    /// Extra column name -> last value written, across all files.
    extra_values: HashMap<String, String>,
}

impl IngredientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one data row. The ingredient key is the literal first-column
    /// string; no trimming or case folding is applied to it.
    pub fn observe<'a>(
        &mut self,
        ingredient: &str,
        weight_raw: &str,
        extras: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), MixError> {
        let sample = weight::parse_weight(weight_raw)?;
        let record = self.records.entry(ingredient.to_string()).or_default();
        record.weight_samples.push(sample);
        for (column, value) in extras {
            record
                .extra_values
                .insert(column.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct OpenInput<'a> {
    path: &'a Path,
    reader: csv::Reader<Box<dyn Read>>,
    headers: Vec<String>,
}

pub fn execute(args: &MixArgs) -> Result<()> {
    if args.percent && args.percent_nosign {
        return Err(
            MixError::Config("--percent and --percent-nosign cannot be combined".into()).into(),
        );
    }
    let mode = if args.percent {
        WeightFormat::Percent
    } else if args.percent_nosign {
        WeightFormat::PercentNoSign
    } else {
        WeightFormat::Plain
    };
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;

    if args.inputs.is_empty() {
        info!("No input files; nothing to mix");
        return Ok(());
    }

    // Open every input and validate its header before reading any data row.
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, input_encoding)
            .with_context(|| format!("Reading header of {path:?}"))?;
        if headers.len() < 2 {
            return Err(MixError::Schema {
                path: path.clone(),
                found: headers.len(),
            }
            .into());
        }
        inputs.push(OpenInput {
            path,
            reader,
            headers,
        });
    }

    let first = &inputs[0];
    let roles = RoleColumns {
        ingredient: first.headers[0].clone(),
        weight: first.headers[1].clone(),
    };
    debug!(
        "Role columns: ingredient '{}', weight '{}'",
        roles.ingredient, roles.weight
    );
    let union = SchemaUnion::unify(inputs.iter().map(|input| input.headers.as_slice()));

    let mut table = IngredientTable::new();
    for input in &mut inputs {
        read_rows(input, &roles, input_encoding, &mut table)?;
        debug!("✓ Read {:?}", input.path);
    }

    let input_delimiter = io_utils::resolve_input_delimiter(&args.inputs[0], args.delimiter);
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        input_delimiter,
    );
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), output_delimiter)?;
    writer
        .write_record(union.columns())
        .context("Writing output header")?;

    let ingredient_count = table.len();
    let mut sink = |row: Vec<String>| -> Result<()> {
        writer.write_record(&row).context("Writing output row")
    };
    emit_rows(
        table,
        &union,
        &roles,
        inputs.len(),
        mode,
        args.format.as_deref(),
        &mut sink,
    )?;
    writer.flush().context("Flushing output")?;

    info!(
        "Mixed {} input file(s) into {} ingredient row(s)",
        inputs.len(),
        ingredient_count
    );
    Ok(())
}

fn read_rows(
    input: &mut OpenInput<'_>,
    roles: &RoleColumns,
    encoding: &'static Encoding,
    table: &mut IngredientTable,
) -> Result<()> {
    let OpenInput {
        path,
        reader,
        headers,
    } = input;
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        let ingredient = decoded.first().map(String::as_str).unwrap_or("");
        let weight_raw = decoded.get(1).map(String::as_str).unwrap_or("");
        // Extras are resolved against this file's own header; the two role
        // positions and any column shadowing a role name stay out of them.
        let extras = headers
            .iter()
            .zip(decoded.iter())
            .skip(2)
            .filter(|(name, _)| {
                name.as_str() != roles.ingredient && name.as_str() != roles.weight
            })
            .map(|(name, value)| (name.as_str(), value.as_str()));
        table
            .observe(ingredient, weight_raw, extras)
            .with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
    }
    Ok(())
}

/// Averages, formats, sorts, and hands each assembled output row to `sink`.
///
/// The divisor is `file_count`, not the per-ingredient sample count: an
/// ingredient absent from a file contributes an implicit zero for it. A zero
/// `file_count` emits nothing.
pub fn emit_rows(
    table: IngredientTable,
    union: &SchemaUnion,
    roles: &RoleColumns,
    file_count: usize,
    mode: WeightFormat,
    template: Option<&str>,
    sink: &mut dyn FnMut(Vec<String>) -> Result<()>,
) -> Result<()> {
    if file_count == 0 {
        return Ok(());
    }
    let ingredient_pos = union.position(&roles.ingredient);
    let weight_pos = union.position(&roles.weight);

    let averaged = table
        .records
        .into_iter()
        .map(|(name, record)| {
            let sum: f64 = record.weight_samples.iter().sum();
            (name, sum / file_count as f64, record.extra_values)
        })
        .sorted_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
                .then_with(|| a.0.cmp(&b.0))
        });

    for (name, final_weight, extra_values) in averaged {
        let formatted = weight::format_weight(final_weight, mode, template)?;
        let mut row = vec![String::new(); union.len()];
        for (column, value) in extra_values {
            if let Some(pos) = union.position(&column) {
                row[pos] = value;
            }
        }
        if let Some(pos) = ingredient_pos {
            row[pos] = name;
        }
        if let Some(pos) = weight_pos {
            row[pos] = formatted;
        }
        sink(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> RoleColumns {
        RoleColumns {
            ingredient: "ingredient".to_string(),
            weight: "weight".to_string(),
        }
    }

    fn union_of(names: &[&str]) -> SchemaUnion {
        SchemaUnion::unify([names.iter().map(|n| n.to_string()).collect::<Vec<_>>()])
    }

    fn collect_rows(
        table: IngredientTable,
        union: &SchemaUnion,
        file_count: usize,
        mode: WeightFormat,
        template: Option<&str>,
    ) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut sink = |row: Vec<String>| -> Result<()> {
            rows.push(row);
            Ok(())
        };
        emit_rows(table, union, &roles(), file_count, mode, template, &mut sink)
            .expect("emit rows");
        rows
    }

    #[test]
    fn average_divides_by_file_count_not_sample_count() {
        let mut table = IngredientTable::new();
        table.observe("water", "80", []).expect("observe");
        // water appears in 1 of 2 files; the absent file contributes zero.
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight"]),
            2,
            WeightFormat::Plain,
            None,
        );
        assert_eq!(rows, vec![vec!["water".to_string(), "40".to_string()]]);
    }

    #[test]
    fn ties_break_on_case_insensitive_name() {
        let mut table = IngredientTable::new();
        table.observe("Banana", "1", []).expect("observe");
        table.observe("apple", "1", []).expect("observe");
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight"]),
            1,
            WeightFormat::Plain,
            None,
        );
        assert_eq!(rows[0][0], "apple");
        assert_eq!(rows[1][0], "Banana");
    }

    #[test]
    fn later_extras_overwrite_earlier_ones() {
        let mut table = IngredientTable::new();
        table
            .observe("sugar", "15", [("origin", "US")])
            .expect("observe");
        table
            .observe("sugar", "14", [("origin", "FR")])
            .expect("observe");
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight", "origin"]),
            2,
            WeightFormat::Plain,
            None,
        );
        assert_eq!(rows, vec![vec![
            "sugar".to_string(),
            "14.5".to_string(),
            "FR".to_string(),
        ]]);
    }

    #[test]
    fn missing_extras_render_as_empty_cells() {
        let mut table = IngredientTable::new();
        table.observe("salt", "2", []).expect("observe");
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight", "origin", "grade"]),
            1,
            WeightFormat::Plain,
            None,
        );
        assert_eq!(rows, vec![vec![
            "salt".to_string(),
            "2".to_string(),
            String::new(),
            String::new(),
        ]]);
    }

    #[test]
    fn zero_file_count_emits_nothing() {
        let mut table = IngredientTable::new();
        table.observe("water", "80", []).expect("observe");
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight"]),
            0,
            WeightFormat::Plain,
            None,
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn percent_mode_scales_emitted_weights() {
        let mut table = IngredientTable::new();
        table.observe("water", "60%", []).expect("observe");
        let rows = collect_rows(
            table,
            &union_of(&["ingredient", "weight"]),
            1,
            WeightFormat::Percent,
            None,
        );
        assert_eq!(rows[0][1], "60%");
    }

    #[test]
    fn observe_keeps_literal_ingredient_keys() {
        let mut table = IngredientTable::new();
        table.observe(" water ", "1", []).expect("observe");
        table.observe("water", "1", []).expect("observe");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn observe_rejects_bad_weight_cells() {
        let mut table = IngredientTable::new();
        let err = table.observe("water", "a lot", []).unwrap_err();
        assert!(matches!(err, MixError::Parse { .. }));
    }
}
