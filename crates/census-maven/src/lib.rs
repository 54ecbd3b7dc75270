use census_core::error::ParseFailure;
use census_core::parser::ArtifactParser;
use census_core::types::*;

/// File extensions that represent a published artifact.
const ARTIFACT_EXTENSIONS: [&str; 5] = ["jar", "pom", "war", "ear", "aar"];

/// Companion files stored next to artifacts.
const COMPANION_SUFFIXES: [&str; 5] = [".md5", ".sha1", ".sha256", ".sha512", ".asc"];

/// Classifiers that duplicate a primary artifact.
const SECONDARY_CLASSIFIERS: [&str; 3] = ["-sources", "-javadoc", "-tests"];

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Parser for the Maven 2 repository layout:
/// `group/segments/artifactId/version/artifactId-version[-classifier].ext`.
#[derive(Debug, Default)]
pub struct MavenParser;

impl MavenParser {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactParser for MavenParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn name_patterns(&self) -> &[&str] {
        &["*.jar", "*.pom", "*.war", "*.ear", "*.aar"]
    }

    fn parse(&self, record: &ArtifactRecord) -> Result<PackageVersion, ParseFailure> {
        let coords = parse_path(&record.path)?;
        let identity = PackageIdentity::maven(coords.group_id, coords.artifact_id);
        Ok(PackageVersion::new(identity, coords.version).with_stats_from(record))
    }
}

/// Coordinates recovered from a repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// Recover `groupId:artifactId:version` from a repository path.
pub fn parse_path(path: &str) -> Result<Coordinates, ParseFailure> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let Some(&filename) = segments.last() else {
        return Err(ParseFailure::MalformedPath(path.to_string()));
    };

    if COMPANION_SUFFIXES.iter().any(|s| filename.ends_with(s)) {
        return Err(ParseFailure::NonArtifact(path.to_string()));
    }
    let Some((stem, extension)) = filename.rsplit_once('.') else {
        return Err(ParseFailure::UnsupportedExtension(path.to_string()));
    };
    if !ARTIFACT_EXTENSIONS.contains(&extension) {
        return Err(ParseFailure::UnsupportedExtension(path.to_string()));
    }
    if SECONDARY_CLASSIFIERS.iter().any(|c| stem.ends_with(c)) {
        return Err(ParseFailure::NonArtifact(path.to_string()));
    }

    // group (at least one segment) / artifactId / version / file
    if segments.len() < 4 || segments.iter().any(|s| s.is_empty()) {
        return Err(ParseFailure::MalformedPath(path.to_string()));
    }
    let n = segments.len();
    let version = segments[n - 2];
    let artifact_id = segments[n - 3];
    let group_id = segments[..n - 3].join(".");

    if !file_matches(stem, artifact_id, version) {
        // Belongs to some other artifact, not this directory's.
        return Err(ParseFailure::NonArtifact(path.to_string()));
    }

    Ok(Coordinates {
        group_id,
        artifact_id: artifact_id.to_string(),
        version: version.to_string(),
    })
}

/// The file stem must be `artifactId-version`, optionally followed by a
/// `-classifier`. Snapshot directories may hold timestamped files
/// (`foo-1.0-20240101.120000-3.jar` inside `1.0-SNAPSHOT/`).
fn file_matches(stem: &str, artifact_id: &str, version: &str) -> bool {
    let Some(rest) = stem
        .strip_prefix(artifact_id)
        .and_then(|r| r.strip_prefix('-'))
    else {
        return false;
    };

    let follows = |tail: &str| tail.is_empty() || tail.starts_with('-');
    if let Some(tail) = rest.strip_prefix(version) {
        if follows(tail) {
            return true;
        }
    }
    if let Some(base) = version.strip_suffix(SNAPSHOT_SUFFIX) {
        if let Some(tail) = rest.strip_prefix(base).and_then(|t| t.strip_prefix('-')) {
            return tail.starts_with(|c: char| c.is_ascii_digit());
        }
    }
    false
}
