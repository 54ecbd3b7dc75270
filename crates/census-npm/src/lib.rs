use std::sync::OnceLock;

use regex::Regex;

use census_core::error::ParseFailure;
use census_core::parser::ArtifactParser;
use census_core::types::*;

/// Directory Artifactory keeps per-package metadata under.
const METADATA_ROOT: &str = ".npm";

/// Parser for the paths an npm remote repository caches.
///
/// The same `name@version` usually appears twice, once as a tarball and once
/// as metadata; both parse to the same identity and are merged downstream.
///
/// - tarball: `{name}/-/{name}-{version}.tgz`, where the leading directories
///   may be content hashes and scoped tarballs are named either
///   `{bare}-{version}.tgz` or `@{scope}-{bare}-{version}.tgz`
/// - metadata: `.npm/{name}/{name}-{version}.json`
/// - metadata: `{name}/{version}/package.json`
/// - bare `{name}/{version}` items, which the live listing never selects
///   because its name patterns need a `.tgz` or `.json` suffix; they only
///   arrive through saved responses (`--from-json`) of unfiltered searches
#[derive(Debug, Default)]
pub struct NpmParser;

impl NpmParser {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactParser for NpmParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn name_patterns(&self) -> &[&str] {
        &["*.tgz", "*.json"]
    }

    fn uses_stats_query(&self) -> bool {
        true
    }

    fn parse(&self, record: &ArtifactRecord) -> Result<PackageVersion, ParseFailure> {
        let (name, version) = parse_path(&record.path)?;
        Ok(PackageVersion::new(PackageIdentity::npm(name), version).with_stats_from(record))
    }
}

/// Recover `(name, version)` from a cached npm path.
pub fn parse_path(path: &str) -> Result<(String, String), ParseFailure> {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let Some((&filename, dirs)) = segments.split_last() else {
        return Err(ParseFailure::MalformedPath(path.to_string()));
    };

    if let Some(stem) = filename.strip_suffix(".tgz") {
        return parse_tarball(dirs, stem)
            .ok_or_else(|| ParseFailure::MissingVersion(path.to_string()));
    }

    if filename == "package.json" {
        // Only meaningful when it sits in a `{name}/{version}/` directory.
        return match dirs.split_last() {
            Some((&version, name_dirs)) if is_version(version) => {
                name_from_dirs(name_dirs).map(|name| (name, version.to_string()))
            }
            _ => None,
        }
        .ok_or_else(|| ParseFailure::NonArtifact(path.to_string()));
    }

    if let Some(stem) = filename.strip_suffix(".json") {
        return parse_metadata_file(dirs, stem)
            .ok_or_else(|| ParseFailure::MissingVersion(path.to_string()));
    }

    if is_version(filename) {
        return name_from_dirs(dirs)
            .map(|name| (name, filename.to_string()))
            .ok_or_else(|| ParseFailure::MalformedPath(path.to_string()));
    }

    Err(ParseFailure::UnsupportedExtension(path.to_string()))
}

/// `.../{name}/-/{file}.tgz`; falls back to the file name alone when the
/// directories do not name the package.
fn parse_tarball(dirs: &[&str], stem: &str) -> Option<(String, String)> {
    let from_path = match dirs.split_last() {
        Some((&"-", name_dirs)) => name_from_dirs(name_dirs).and_then(|name| {
            version_after_name(stem, &name).map(|version| (name, version.to_string()))
        }),
        _ => None,
    };
    from_path.or_else(|| split_file_stem(stem))
}

/// `.npm/{name}/{anything}-{version}.json`, or a bare `{name}-{version}.json`.
fn parse_metadata_file(dirs: &[&str], stem: &str) -> Option<(String, String)> {
    match dirs.split_first() {
        Some((&METADATA_ROOT, name_dirs)) if !name_dirs.is_empty() => {
            let name = scoped_name(name_dirs)?;
            let (_, version) = split_file_stem(stem)?;
            Some((name, version))
        }
        _ => split_file_stem(stem),
    }
}

/// Name from the directories preceding a version, ignoring the metadata root
/// and any content-hash prefix.
fn name_from_dirs(dirs: &[&str]) -> Option<String> {
    let dirs = match dirs.split_first() {
        Some((&METADATA_ROOT, rest)) => rest,
        _ => dirs,
    };
    scoped_name(dirs)
}

/// Last one or two directories: `@scope/name` or `name`.
fn scoped_name(dirs: &[&str]) -> Option<String> {
    match dirs {
        [.., scope, bare] if scope.starts_with('@') && scope.len() > 1 => {
            Some(format!("{scope}/{bare}"))
        }
        [.., bare] if !bare.starts_with('@') => Some(bare.to_string()),
        _ => None,
    }
}

/// Version part of a tarball stem, given the package name the path claims.
fn version_after_name<'a>(stem: &'a str, name: &str) -> Option<&'a str> {
    let mut prefixes = Vec::with_capacity(2);
    match name.split_once('/') {
        Some((scope, bare)) => {
            prefixes.push(format!("{bare}-"));
            prefixes.push(format!("{scope}-{bare}-"));
        }
        None => prefixes.push(format!("{name}-")),
    }
    prefixes
        .iter()
        .find_map(|prefix| stem.strip_prefix(prefix.as_str()))
        .filter(|version| starts_with_digit(version))
}

/// Split `{name}-{version}` at the first dash followed by a digit. A leading
/// `@scope-name` is turned back into `@scope/name`.
fn split_file_stem(stem: &str) -> Option<(String, String)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)-(\d+[\w.+-]*)$").expect("stem pattern is a valid regex")
    });
    let caps = pattern.captures(stem)?;
    let raw_name = &caps[1];
    let version = caps[2].to_string();

    let name = match raw_name.strip_prefix('@') {
        Some(scoped) => {
            let (scope, bare) = scoped.split_once('-')?;
            if scope.is_empty() || bare.is_empty() {
                return None;
            }
            format!("@{scope}/{bare}")
        }
        None => raw_name.to_string(),
    };
    Some((name, version))
}

fn is_version(segment: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^v?\d+\.\d+\.\d+([-+][0-9A-Za-z.+-]*)?$")
                .expect("semver pattern is a valid regex")
        })
        .is_match(segment)
}

fn starts_with_digit(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_core::aggregate::{aggregate, Mode};

    fn parsed(path: &str) -> (String, String) {
        parse_path(path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    fn owned(name: &str, version: &str) -> (String, String) {
        (name.to_string(), version.to_string())
    }

    #[test]
    fn test_plain_tarball() {
        assert_eq!(parsed("express/-/express-4.18.2.tgz"), owned("express", "4.18.2"));
        assert_eq!(parsed("left-pad/-/left-pad-1.3.0.tgz"), owned("left-pad", "1.3.0"));
    }

    #[test]
    fn test_scoped_tarball() {
        assert_eq!(parsed("@babel/core/-/core-7.23.0.tgz"), owned("@babel/core", "7.23.0"));
        assert_eq!(
            parsed("ab/cd/@babel/core/-/@babel-core-7.23.0.tgz"),
            owned("@babel/core", "7.23.0")
        );
    }

    #[test]
    fn test_hashed_tarball_falls_back_to_file_name() {
        assert_eq!(parsed("3f/9a/-/express-4.18.2.tgz"), owned("express", "4.18.2"));
        assert_eq!(
            parsed("3f/9a/-/@types-node-18.11.9.tgz"),
            owned("@types/node", "18.11.9")
        );
        assert_eq!(parsed("3f/9a/express-4.18.2.tgz"), owned("express", "4.18.2"));
    }

    #[test]
    fn test_prerelease_tarball() {
        assert_eq!(
            parsed("next/-/next-14.0.0-canary.12.tgz"),
            owned("next", "14.0.0-canary.12")
        );
    }

    #[test]
    fn test_metadata_json() {
        assert_eq!(parsed(".npm/express/express-4.18.2.json"), owned("express", "4.18.2"));
        assert_eq!(
            parsed(".npm/@types/node/@types-node-18.11.9.json"),
            owned("@types/node", "18.11.9")
        );
    }

    #[test]
    fn test_name_version_paths() {
        assert_eq!(parsed("express/4.18.2"), owned("express", "4.18.2"));
        assert_eq!(parsed("@types/node/18.11.9"), owned("@types/node", "18.11.9"));
        assert_eq!(parsed(".npm/express/4.18.2"), owned("express", "4.18.2"));
        assert_eq!(
            parsed("@scope/pkg/1.0.0/package.json"),
            owned("@scope/pkg", "1.0.0")
        );
    }

    #[test]
    fn test_listing_patterns_skip_bare_version_items() {
        let parser = NpmParser::new();
        let patterns = parser.name_patterns().to_vec();
        assert!(
            patterns.iter().all(|p| p.starts_with("*.")),
            "every pattern needs a suffix, so `express/4.18.2` is never listed: {patterns:?}"
        );
    }

    #[test]
    fn test_skipped_paths() {
        assert!(matches!(
            parse_path(".npm/express/package.json"),
            Err(ParseFailure::NonArtifact(_))
        ));
        assert!(matches!(
            parse_path("express/README.md"),
            Err(ParseFailure::UnsupportedExtension(_))
        ));
        assert!(matches!(
            parse_path("express/-/express.tgz"),
            Err(ParseFailure::MissingVersion(_))
        ));
        assert!(matches!(parse_path("4.18.2"), Err(ParseFailure::MalformedPath(_))));
        assert!(matches!(parse_path("@scope/1.0.0"), Err(ParseFailure::MalformedPath(_))));
        assert!(matches!(parse_path(""), Err(ParseFailure::MalformedPath(_))));
        assert!(matches!(parse_path("-/@-1.0.0.tgz"), Err(ParseFailure::MissingVersion(_))));
    }

    #[test]
    fn test_tarball_and_metadata_merge_to_higher_count() {
        let records = vec![
            ArtifactRecord::new("express/-/express-4.18.2.tgz").with_stats(None, 10),
            ArtifactRecord::new("express/4.18.2").with_stats(None, 42),
        ];
        let result = aggregate(&records, &NpmParser::new(), Mode::All);
        assert_eq!(result.len(), 1);
        let merged = result.iter().next().unwrap();
        assert_eq!(merged.identity, PackageIdentity::npm("express"));
        assert_eq!(merged.version, "4.18.2");
        assert_eq!(merged.download_count, 42);
    }

    #[test]
    fn test_requests_stats_query() {
        assert!(NpmParser::new().uses_stats_query());
    }
}
