use std::sync::OnceLock;

use regex::Regex;

use census_core::error::ParseFailure;
use census_core::parser::ArtifactParser;
use census_core::types::*;

/// Kind of Python distribution, decided by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Distribution {
    /// `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`
    Wheel,
    /// `{name}-{version}.tar.gz` and friends
    Sdist,
    /// `{name}-{version}(-{python})?.egg`
    Egg,
}

const SUFFIXES: [(&str, Distribution); 5] = [
    (".whl", Distribution::Wheel),
    (".tar.gz", Distribution::Sdist),
    (".tar.bz2", Distribution::Sdist),
    (".zip", Distribution::Sdist),
    (".egg", Distribution::Egg),
];

/// Parser for wheel, sdist and egg file names in a PyPI remote repository.
///
/// Only the file name is inspected; the directory layout differs between
/// Artifactory versions (`packages/<name>/<version>/...`, `simple/<name>/...`).
#[derive(Debug, Default)]
pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactParser for PythonParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn name_patterns(&self) -> &[&str] {
        &["*.whl", "*.tar.gz", "*.tar.bz2", "*.zip", "*.egg"]
    }

    fn parse(&self, record: &ArtifactRecord) -> Result<PackageVersion, ParseFailure> {
        let (name, version) = parse_filename(record.file_name())?;
        Ok(PackageVersion::new(PackageIdentity::python(name), version).with_stats_from(record))
    }
}

/// Split a distribution file name into `(name, version)`.
///
/// The name is returned unnormalized. The version starts at the first
/// dash-separated segment (after the first) that reads as a PEP 440 version,
/// so sdists of projects with dashes in their name still split correctly.
pub fn parse_filename(filename: &str) -> Result<(&str, &str), ParseFailure> {
    let lower = filename.to_ascii_lowercase();
    let (stem, kind) = SUFFIXES
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(suffix, kind)| (&filename[..filename.len() - suffix.len()], *kind))
        .ok_or_else(|| ParseFailure::UnsupportedExtension(filename.to_string()))?;

    let segments: Vec<&str> = stem.split('-').collect();
    let version_index = segments
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, segment)| looks_like_version(segment))
        .map(|(i, _)| i)
        .ok_or_else(|| ParseFailure::MissingVersion(filename.to_string()))?;

    if kind == Distribution::Wheel && version_index + 1 >= segments.len() {
        // A wheel always carries compatibility tags after the version.
        return Err(ParseFailure::MalformedPath(filename.to_string()));
    }

    // Slice the name out of the stem itself so its spelling is kept.
    let name_len: usize = segments[..version_index].iter().map(|s| s.len()).sum::<usize>()
        + (version_index - 1);
    let name = &stem[..name_len];
    Ok((name, segments[version_index]))
}

fn looks_like_version(segment: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)^v?(\d+!)?\d+(\.\d+)*([._]?(a|b|c|rc|alpha|beta|pre|preview|post|dev|r|rev)\.?\d*)*(\+[a-z0-9._]+)?$",
            )
            .expect("version pattern is a valid regex")
        })
        .is_match(segment)
}
