//! Turns a finished [`ResultSet`] into a downloadable CSV artifact.

use crate::core::config::DEFAULT_EXPORT_FILE_NAME;
use crate::core::error::{AppError, Result};
use crate::core::models::{ResultSet, VerificationResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_MEDIA_TYPE: &str = "text/csv";
const HEADER: [&str; 3] = ["Email", "Reachable", "Error"];

/// How fields are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// Standard CSV quoting: fields holding a comma, quote or newline are quoted.
    #[default]
    Standard,
    /// Unescaped plain comma join; fields are written as-is.
    Legacy,
}

/// A serialized export, ready to be offered as a named download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Writes the artifact into `dir` under its own file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let target = dir.join(&self.file_name);
        fs::write(&target, &self.bytes)?;
        tracing::info!(target: "export", "Wrote {} bytes to {}", self.bytes.len(), target.display());
        Ok(target)
    }
}

/// Encodes `results` with the default file name.
pub fn export_csv(results: &ResultSet, style: QuoteStyle) -> Result<ExportArtifact> {
    export_csv_named(results, style, DEFAULT_EXPORT_FILE_NAME)
}

pub fn export_csv_named(
    results: &ResultSet,
    style: QuoteStyle,
    file_name: &str,
) -> Result<ExportArtifact> {
    let bytes = match style {
        QuoteStyle::Standard => encode_standard(results)?,
        QuoteStyle::Legacy => encode_legacy(results),
    };
    tracing::debug!(target: "export", "Encoded {} rows ({:?})", results.len(), style);
    Ok(ExportArtifact {
        file_name: file_name.to_string(),
        media_type: CSV_MEDIA_TYPE,
        bytes,
    })
}

fn row(result: &VerificationResult) -> [String; 3] {
    let reachable = result.reachable.map(|r| r.to_string()).unwrap_or_default();
    [
        result.email.clone(),
        reachable,
        result.error.clone().unwrap_or_default(),
    ]
}

fn encode_standard(results: &ResultSet) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for result in results {
        writer.write_record(row(result))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

fn encode_legacy(results: &ResultSet) -> Vec<u8> {
    let mut out = HEADER.join(",");
    out.push('\n');
    for result in results {
        out.push_str(&row(result).join(","));
        out.push('\n');
    }
    out.into_bytes()
}
