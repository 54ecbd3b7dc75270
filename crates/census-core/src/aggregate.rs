use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::ArtifactParser;
use crate::types::{ArtifactRecord, Ecosystem, PackageIdentity, PackageVersion};
use crate::version;

/// How many versions to keep per package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only the greatest cached version of each package.
    #[default]
    Latest,
    /// Every distinct cached version, ascending.
    All,
}

/// Cached packages grouped by identity, in alphabetical identity order.
///
/// In [`Mode::Latest`] every entry holds exactly one version; in
/// [`Mode::All`] entries hold every distinct version in ascending order.
/// No identity maps to an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub ecosystem: Ecosystem,
    pub mode: Mode,
    pub packages: BTreeMap<PackageIdentity, Vec<PackageVersion>>,
    /// Records that produced no package version.
    pub skipped: usize,
}

impl AggregationResult {
    pub fn empty(ecosystem: Ecosystem, mode: Mode) -> Self {
        Self {
            ecosystem,
            mode,
            packages: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// All package versions, grouped by identity then ascending version.
    pub fn iter(&self) -> impl Iterator<Item = &PackageVersion> {
        self.packages.values().flatten()
    }

    /// Number of package versions (rendered lines).
    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn versions(&self, identity: &PackageIdentity) -> &[PackageVersion] {
        self.packages
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Keep only the versions matching `keep`, dropping packages left empty.
    pub fn retain_versions(&self, mut keep: impl FnMut(&PackageVersion) -> bool) -> Self {
        let packages = self
            .packages
            .iter()
            .filter_map(|(identity, versions)| {
                let kept: Vec<PackageVersion> =
                    versions.iter().filter(|v| keep(v)).cloned().collect();
                (!kept.is_empty()).then(|| (identity.clone(), kept))
            })
            .collect();
        Self {
            ecosystem: self.ecosystem,
            mode: self.mode,
            packages,
            skipped: self.skipped,
        }
    }

    /// Reduce to `mode`. Going from [`Mode::All`] to [`Mode::Latest`] keeps
    /// the greatest remaining version of each package; a latest-only result
    /// cannot be widened again and is returned as is.
    pub fn with_mode(&self, mode: Mode) -> Self {
        if mode == self.mode || mode == Mode::All {
            return self.clone();
        }
        let ecosystem = self.ecosystem;
        let packages = self
            .packages
            .iter()
            .filter_map(|(identity, versions)| {
                select_latest(versions.clone(), ecosystem).map(|v| (identity.clone(), vec![v]))
            })
            .collect();
        Self {
            ecosystem,
            mode,
            packages,
            skipped: self.skipped,
        }
    }
}

/// Combine two representations of the same `(identity, version)`.
///
/// The higher download count wins; on a tie a known download time beats an
/// unknown one, and the later time wins. Because the choice is a maximum over
/// a total key, folding in any order gives the same result.
pub fn merge(a: PackageVersion, b: PackageVersion) -> PackageVersion {
    let rank = |v: &PackageVersion| (v.download_count, v.last_downloaded);
    if rank(&b) > rank(&a) {
        b
    } else {
        a
    }
}

/// Ordering used to sort versions of one package: ecosystem comparison,
/// then the raw string so distinct spellings never tie.
fn version_order(a: &PackageVersion, b: &PackageVersion, ecosystem: Ecosystem) -> Ordering {
    version::compare(&a.version, &b.version, ecosystem).then_with(|| a.version.cmp(&b.version))
}

/// Parse and aggregate every record.
pub fn aggregate(
    records: &[ArtifactRecord],
    parser: &dyn ArtifactParser,
    mode: Mode,
) -> AggregationResult {
    aggregate_matching(records, parser, mode, |_| true)
}

/// Parse records, keep those whose identity satisfies `select`, then group,
/// merge duplicates and reduce per `mode`.
pub fn aggregate_matching(
    records: &[ArtifactRecord],
    parser: &dyn ArtifactParser,
    mode: Mode,
    mut select: impl FnMut(&PackageIdentity) -> bool,
) -> AggregationResult {
    let ecosystem = parser.ecosystem();
    let mut skipped = 0usize;
    let mut groups: BTreeMap<PackageIdentity, BTreeMap<String, PackageVersion>> = BTreeMap::new();

    for record in records {
        let parsed = match parser.parse(record) {
            Ok(v) => v,
            Err(reason) => {
                debug!(path = %record.path, %reason, "skipping artifact");
                skipped += 1;
                continue;
            }
        };
        if !select(&parsed.identity) {
            continue;
        }

        let by_version = groups.entry(parsed.identity.clone()).or_default();
        let merged = match by_version.remove(&parsed.version) {
            Some(existing) => merge(existing, parsed),
            None => parsed,
        };
        by_version.insert(merged.version.clone(), merged);
    }

    let packages = groups
        .into_iter()
        .map(|(identity, by_version)| {
            let mut versions: Vec<PackageVersion> = by_version.into_values().collect();
            versions.sort_by(|a, b| version_order(a, b, ecosystem));
            if mode == Mode::Latest {
                let latest = select_latest(versions, ecosystem);
                versions = latest.into_iter().collect();
            }
            (identity, versions)
        })
        .collect();

    AggregationResult {
        ecosystem,
        mode,
        packages,
        skipped,
    }
}

/// Greatest version; versions the comparator cannot separate go to the one
/// with more downloads.
fn select_latest(versions: Vec<PackageVersion>, ecosystem: Ecosystem) -> Option<PackageVersion> {
    versions.into_iter().max_by(|a, b| {
        version::compare(&a.version, &b.version, ecosystem)
            .then_with(|| a.download_count.cmp(&b.download_count))
            .then_with(|| a.version.cmp(&b.version))
    })
}
