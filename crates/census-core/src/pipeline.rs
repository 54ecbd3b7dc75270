use chrono::{DateTime, Utc};
use tracing::info;

use crate::aggregate::{aggregate_matching, AggregationResult, Mode};
use crate::parser::ArtifactParser;
use crate::types::{ArtifactRecord, Ecosystem};
use crate::window::filter_since;

/// Settings that shape the aggregation.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub mode: Mode,
    /// Restrict the inventory to one package (see `PackageIdentity::matches`).
    pub package: Option<String>,
}

/// The two output channels computed from one aggregation.
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Every cached version with its statistics, whatever the mode or window.
    pub full: AggregationResult,
    /// `full` restricted to the download window, then reduced to the
    /// requested mode.
    pub windowed: AggregationResult,
}

/// Parse, filter and aggregate the records of one repository.
pub struct CensusPipeline {
    parser: Box<dyn ArtifactParser>,
    options: PipelineOptions,
}

impl CensusPipeline {
    pub fn new(parser: Box<dyn ArtifactParser>, options: PipelineOptions) -> Self {
        Self { parser, options }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.parser.ecosystem()
    }

    pub fn parser(&self) -> &dyn ArtifactParser {
        self.parser.as_ref()
    }

    /// Aggregate all records in the requested mode.
    pub fn run(&self, records: &[ArtifactRecord]) -> AggregationResult {
        self.collect(records).with_mode(self.options.mode)
    }

    /// Every version of every selected package. The package filter applies
    /// to parsed identities before versions are grouped.
    fn collect(&self, records: &[ArtifactRecord]) -> AggregationResult {
        let package = self.options.package.as_deref();
        let result = aggregate_matching(records, self.parser.as_ref(), Mode::All, |id| {
            package.map_or(true, |p| id.matches(p))
        });

        info!(
            "parsed {} artifacts into {} packages ({} skipped)",
            records.len(),
            result.package_count(),
            result.skipped
        );
        result
    }

    /// Aggregate once and derive both channels from the same result.
    ///
    /// The window is applied before the latest version is chosen, so a
    /// package whose newest version went unused still shows the newest
    /// version that was downloaded in the window.
    pub fn inventory(
        &self,
        records: &[ArtifactRecord],
        since_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Inventory {
        let full = self.collect(records);
        let windowed = filter_since(&full, since_days, now).with_mode(self.options.mode);
        Inventory { full, windowed }
    }
}
