//! One-vs-one linear classifier encoder
//!
//! Emits one row per class pair, in the pair order of
//! [`one_vs_one_pairs`]. Row `k` carries `intercept[k]` and `coef[k]`
//! unchanged:
//!
//! ```text
//! positive_class,negative_class,intercept,coeff0,coeff1
//! "A","B",0.25,1.0,-1.5
//! "A","C",-0.5,0.0,2.0
//! "B","C",1.0,0.5,0.5
//! ```
//!
//! `positive_class` is the lower-indexed class of the pair and
//! `negative_class` the higher-indexed one; the names are positional.

use std::io::{Read, Write};

use tracing::debug;

use crate::config::ExportConfig;
use crate::errors::{ExportError, Result};
use crate::model::{one_vs_one_pairs, PairwiseLinearModel};
use crate::table::{read_table, Field, TableWriter};

const FIXED_COLUMNS: [&str; 3] = ["positive_class", "negative_class", "intercept"];

/// Header for a model with `feature_count` input features
pub fn pairwise_header(feature_count: usize) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain((0..feature_count).map(|i| format!("coeff{i}")))
        .collect()
}

/// One row of a pairwise table
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPairRecord {
    pub positive_class: String,
    pub negative_class: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl ClassPairRecord {
    fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::with_capacity(3 + self.coefficients.len());
        fields.push(Field::Text(self.positive_class.clone()));
        fields.push(Field::Text(self.negative_class.clone()));
        fields.push(Field::Float(self.intercept));
        fields.extend(self.coefficients.iter().copied().map(Field::Float));
        fields
    }
}

/// Build one row per class pair without writing anything
pub fn pairwise_records(model: &PairwiseLinearModel) -> Result<Vec<ClassPairRecord>> {
    model.validate()?;

    Ok(one_vs_one_pairs(model.classes.len())
        .zip(model.intercept.iter().zip(&model.coef))
        .map(|((i, j), (&intercept, coef))| ClassPairRecord {
            positive_class: model.classes[i].clone(),
            negative_class: model.classes[j].clone(),
            intercept,
            coefficients: coef.clone(),
        })
        .collect())
}

/// Write prepared pair rows and return the header that was used.
///
/// All records must share the same coefficient count.
pub fn write_pairwise_records<W: Write>(
    records: &[ClassPairRecord],
    sink: W,
    config: &ExportConfig,
) -> Result<Vec<String>> {
    let feature_count = records.first().map_or(0, |r| r.coefficients.len());
    let header = pairwise_header(feature_count);

    let mut writer = TableWriter::new(sink, config.quote_escaping);
    writer.write_header(&header)?;
    for record in records {
        writer.write_row(&record.fields())?;
    }
    writer.finish()?;
    Ok(header)
}

/// Encode a fitted one-vs-one model into `sink` and return the header.
///
/// Shapes are validated before the first byte is written.
pub fn write_pairwise<W: Write>(
    model: &PairwiseLinearModel,
    sink: W,
    config: &ExportConfig,
) -> Result<Vec<String>> {
    let records = pairwise_records(model)?;
    let header = write_pairwise_records(&records, sink, config)?;
    debug!(
        classes = model.classes.len(),
        pairs = records.len(),
        features = model.feature_count(),
        "Pairwise table written"
    );
    Ok(header)
}

/// Decode a pairwise table
pub fn read_pairwise<R: Read>(source: R) -> Result<Vec<ClassPairRecord>> {
    let table = read_table(source)?;

    let feature_count = table.header.len().saturating_sub(FIXED_COLUMNS.len());
    table.expect_header(&pairwise_header(feature_count))?;

    let mut records = Vec::with_capacity(table.rows.len());
    for row in 0..table.rows.len() {
        let coefficients = (0..feature_count)
            .map(|k| table.parse_float(row, FIXED_COLUMNS.len() + k))
            .collect::<Result<Vec<_>>>()?;

        records.push(ClassPairRecord {
            positive_class: table.rows[row][0].clone(),
            negative_class: table.rows[row][1].clone(),
            intercept: table.parse_float(row, 2)?,
            coefficients,
        });
    }

    Ok(records)
}

/// Rebuild the source model from decoded rows.
///
/// Classes are recovered from the pair order, so the rows must follow the
/// one-vs-one enumeration exactly.
pub fn model_from_records(records: &[ClassPairRecord]) -> Result<PairwiseLinearModel> {
    let first = records
        .first()
        .ok_or_else(|| ExportError::ShapeMismatch("no class pairs".to_string()))?;

    let mut classes = vec![first.positive_class.clone()];
    classes.extend(
        records
            .iter()
            .take_while(|r| r.positive_class == first.positive_class)
            .map(|r| r.negative_class.clone()),
    );

    let model = PairwiseLinearModel::new(
        classes,
        records.iter().map(|r| r.intercept).collect(),
        records.iter().map(|r| r.coefficients.clone()).collect(),
    );
    model.validate()?;

    for (k, (i, j)) in one_vs_one_pairs(model.classes.len()).enumerate() {
        let record = &records[k];
        if record.positive_class != model.classes[i] || record.negative_class != model.classes[j] {
            return Err(ExportError::ShapeMismatch(format!(
                "row {k} pairs ({}, {}), expected ({}, {})",
                record.positive_class, record.negative_class, model.classes[i], model.classes[j]
            )));
        }
    }

    Ok(model)
}
