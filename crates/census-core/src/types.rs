use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package ecosystem served by a proxy repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Python,
    Maven,
    Npm,
}

impl Ecosystem {
    /// Output formats that make sense for this ecosystem.
    pub fn supported_formats(&self) -> &'static [OutputFormat] {
        match self {
            Ecosystem::Python => &[OutputFormat::Simple, OutputFormat::Csv],
            Ecosystem::Maven => &[
                OutputFormat::Simple,
                OutputFormat::Maven,
                OutputFormat::Gradle,
                OutputFormat::Csv,
            ],
            Ecosystem::Npm => &[
                OutputFormat::Simple,
                OutputFormat::Npm,
                OutputFormat::PackageJson,
                OutputFormat::Csv,
            ],
        }
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        self.supported_formats().contains(&format)
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Python => write!(f, "python"),
            Ecosystem::Maven => write!(f, "maven"),
            Ecosystem::Npm => write!(f, "npm"),
        }
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "pypi" => Ok(Ecosystem::Python),
            "maven" => Ok(Ecosystem::Maven),
            "npm" => Ok(Ecosystem::Npm),
            _ => Err(anyhow::anyhow!("unknown ecosystem: {s}")),
        }
    }
}

/// Rendering selected for the text channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Simple,
    Csv,
    /// `<dependency>` blocks for a Maven POM
    Maven,
    /// `implementation '...'` lines for a Gradle build
    Gradle,
    /// `npm install` commands
    Npm,
    PackageJson,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Simple => write!(f, "simple"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Maven => write!(f, "maven"),
            OutputFormat::Gradle => write!(f, "gradle"),
            OutputFormat::Npm => write!(f, "npm"),
            OutputFormat::PackageJson => write!(f, "package-json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(OutputFormat::Simple),
            "csv" => Ok(OutputFormat::Csv),
            "maven" | "xml" => Ok(OutputFormat::Maven),
            "gradle" => Ok(OutputFormat::Gradle),
            "npm" => Ok(OutputFormat::Npm),
            "package-json" | "package_json" => Ok(OutputFormat::PackageJson),
            _ => Err(anyhow::anyhow!("unknown output format: {s}")),
        }
    }
}

/// One physically cached file as reported by the repository manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Repository-relative path including the file name.
    pub path: String,
    pub size: Option<u64>,
    /// `None` when the file was never downloaded from the cache.
    pub last_downloaded: Option<DateTime<Utc>>,
    #[serde(default)]
    pub download_count: u64,
}

impl ArtifactRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
            last_downloaded: None,
            download_count: 0,
        }
    }

    pub fn with_stats(mut self, last_downloaded: Option<DateTime<Utc>>, download_count: u64) -> Self {
        self.last_downloaded = last_downloaded;
        self.download_count = download_count;
        self
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Ecosystem-specific key of a logical package.
///
/// The derived ordering compares variant first, then fields in declaration
/// order, which gives alphabetical output within a single ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "ecosystem", rename_all = "lowercase")]
pub enum PackageIdentity {
    /// Name is PEP 503 normalized: lowercase, runs of `-`, `_`, `.` folded to `-`.
    Python { name: String },
    Maven {
        group_id: String,
        artifact_id: String,
    },
    /// Name keeps its `@scope/` prefix when scoped.
    Npm { name: String },
}

impl PackageIdentity {
    pub fn python(name: &str) -> Self {
        PackageIdentity::Python {
            name: normalize_python_name(name),
        }
    }

    pub fn maven(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        PackageIdentity::Maven {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn npm(name: impl Into<String>) -> Self {
        PackageIdentity::Npm { name: name.into() }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            PackageIdentity::Python { .. } => Ecosystem::Python,
            PackageIdentity::Maven { .. } => Ecosystem::Maven,
            PackageIdentity::Npm { .. } => Ecosystem::Npm,
        }
    }

    /// Whether a user-supplied `--package` value selects this identity.
    ///
    /// Python compares normalized names, so `Jinja2` and `jinja2` match.
    /// Maven accepts either the artifactId or `groupId:artifactId`. npm is exact.
    pub fn matches(&self, filter: &str) -> bool {
        match self {
            PackageIdentity::Python { name } => *name == normalize_python_name(filter),
            PackageIdentity::Maven {
                group_id,
                artifact_id,
            } => match filter.split_once(':') {
                Some((g, a)) => g == group_id && a == artifact_id,
                None => filter == artifact_id,
            },
            PackageIdentity::Npm { name } => name == filter,
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageIdentity::Python { name } | PackageIdentity::Npm { name } => write!(f, "{name}"),
            PackageIdentity::Maven {
                group_id,
                artifact_id,
            } => write!(f, "{group_id}:{artifact_id}"),
        }
    }
}

/// Lowercase a Python distribution name and collapse separator runs to `-`.
pub fn normalize_python_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// A specific version of a package together with its download statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub identity: PackageIdentity,
    /// Version exactly as it appears in the artifact path.
    pub version: String,
    pub download_count: u64,
    pub last_downloaded: Option<DateTime<Utc>>,
}

impl PackageVersion {
    pub fn new(identity: PackageIdentity, version: impl Into<String>) -> Self {
        Self {
            identity,
            version: version.into(),
            download_count: 0,
            last_downloaded: None,
        }
    }

    /// Copy statistics from the record this version was parsed from.
    pub fn with_stats_from(mut self, record: &ArtifactRecord) -> Self {
        self.download_count = record.download_count;
        self.last_downloaded = record.last_downloaded;
        self
    }
}
