use crate::error::ParseFailure;
use crate::types::{ArtifactRecord, Ecosystem, PackageVersion};

/// Trait that each ecosystem's path grammar must implement.
pub trait ArtifactParser: Send + Sync {
    /// Ecosystem this parser understands.
    fn ecosystem(&self) -> Ecosystem;

    /// AQL `$match` patterns selecting candidate files (e.g., `&["*.whl"]`).
    fn name_patterns(&self) -> &[&str];

    /// Whether download statistics come from a separate query joined by path
    /// rather than from the item listing itself.
    fn uses_stats_query(&self) -> bool {
        false
    }

    /// Map one cached file to a package version, copying its statistics.
    fn parse(&self, record: &ArtifactRecord) -> Result<PackageVersion, ParseFailure>;
}
