//! Delimited-text table codec
//!
//! Tables are comma-delimited UTF-8 text with one `\n`-terminated row per
//! line. The header row is written bare; in data rows numeric fields are
//! bare and text fields are wrapped in double quotes.

use std::io::{Read, Write};

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::config::QuoteEscaping;
use crate::errors::{ExportError, Result};

/// A single typed cell of a data row
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Field {
    /// Render the cell as it appears on disk.
    ///
    /// Floats use the shortest representation that parses back to the same
    /// value and always carry a decimal point or exponent.
    pub fn render(&self, escaping: QuoteEscaping) -> String {
        match self {
            Field::Int(v) => v.to_string(),
            Field::Float(v) => format!("{v:?}"),
            Field::Text(s) => match escaping {
                QuoteEscaping::Double => format!("\"{}\"", s.replace('"', "\"\"")),
                QuoteEscaping::Verbatim => format!("\"{s}\""),
            },
        }
    }
}

/// Row-oriented table writer
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
    escaping: QuoteEscaping,
    width: Option<usize>,
}

impl<W: Write> TableWriter<W> {
    pub fn new(sink: W, escaping: QuoteEscaping) -> Self {
        // Quoting is decided per field by `Field::render`, so csv must not add its own.
        let inner = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(sink);

        Self {
            inner,
            escaping,
            width: None,
        }
    }

    /// Write the bare header row. Must be called once, before any data row.
    pub fn write_header<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if self.width.is_some() {
            return Err(ExportError::ShapeMismatch(
                "header already written".to_string(),
            ));
        }
        self.inner
            .write_record(names.iter().map(|name| name.as_ref()))?;
        self.width = Some(names.len());
        Ok(())
    }

    /// Write one data row
    pub fn write_row(&mut self, fields: &[Field]) -> Result<()> {
        match self.width {
            None => {
                return Err(ExportError::ShapeMismatch(
                    "data row written before header".to_string(),
                ))
            }
            Some(width) if width != fields.len() => {
                return Err(ExportError::ShapeMismatch(format!(
                    "row has {} fields, header has {width}",
                    fields.len()
                )))
            }
            Some(_) => {}
        }

        let escaping = self.escaping;
        self.inner
            .write_record(fields.iter().map(|field| field.render(escaping)))?;
        Ok(())
    }

    /// Flush buffered rows and hand back the sink
    pub fn finish(self) -> Result<W> {
        self.inner.into_inner().map_err(|err| {
            let cause = err.error();
            ExportError::Io(std::io::Error::new(cause.kind(), cause.to_string()))
        })
    }
}

/// A decoded table: header names and unquoted string cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Fail unless the header equals `expected`
    pub fn expect_header<S: AsRef<str>>(&self, expected: &[S]) -> Result<()> {
        let matches = self.header.len() == expected.len()
            && self
                .header
                .iter()
                .zip(expected)
                .all(|(found, want)| found == want.as_ref());

        if matches {
            Ok(())
        } else {
            Err(ExportError::Header {
                expected: expected
                    .iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(","),
                found: self.header.join(","),
            })
        }
    }

    /// Column name at `column`, for error messages
    pub fn column_name(&self, column: usize) -> String {
        self.header
            .get(column)
            .cloned()
            .unwrap_or_else(|| format!("#{column}"))
    }

    pub fn parse_int(&self, row: usize, column: usize) -> Result<i64> {
        let cell = &self.rows[row][column];
        cell.parse::<i64>().map_err(|err| ExportError::Parse {
            row,
            column: self.column_name(column),
            message: format!("'{cell}' is not an integer: {err}"),
        })
    }

    pub fn parse_float(&self, row: usize, column: usize) -> Result<f64> {
        let cell = &self.rows[row][column];
        cell.parse::<f64>().map_err(|err| ExportError::Parse {
            row,
            column: self.column_name(column),
            message: format!("'{cell}' is not a number: {err}"),
        })
    }
}

/// Read a table written by [`TableWriter`]
pub fn read_table<R: Read>(source: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(source);

    let header = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { header, rows })
}
