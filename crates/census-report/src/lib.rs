pub mod csv;
pub mod json;
pub mod summary;
pub mod text;

use census_core::aggregate::AggregationResult;
use census_core::types::{Ecosystem, OutputFormat};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("format '{format}' is not available for {ecosystem} (choose from: {choices})")]
    Unsupported {
        ecosystem: Ecosystem,
        format: OutputFormat,
        choices: String,
    },
    #[error("failed to serialize JSON output")]
    Json(#[from] serde_json::Error),
}

/// Render an aggregation in the requested format.
///
/// An empty result renders as an empty string in every format except CSV,
/// which still carries its header row.
pub fn render(result: &AggregationResult, format: OutputFormat) -> Result<String, RenderError> {
    let ecosystem = result.ecosystem;
    if !ecosystem.supports(format) {
        return Err(RenderError::Unsupported {
            ecosystem,
            format,
            choices: ecosystem
                .supported_formats()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    match format {
        OutputFormat::Csv => Ok(csv::format_csv(result)),
        OutputFormat::PackageJson => json::format_package_json(result),
        OutputFormat::Simple | OutputFormat::Maven | OutputFormat::Gradle | OutputFormat::Npm => {
            Ok(text::format_lines(result, format))
        }
    }
}
