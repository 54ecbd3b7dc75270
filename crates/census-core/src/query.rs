//! AQL query construction and the wire types of its response.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ArtifactRecord;

/// Number of items fetched when sampling the repository in debug mode.
pub const SAMPLE_LIMIT: usize = 100;

const STAT_FIELDS: [&str; 2] = ["stat.downloaded", "stat.downloads"];

/// Base API URL and repository name split out of a user-facing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    /// e.g. `https://example.jfrog.io/artifactory`
    pub base_url: String,
    pub repo: String,
}

impl RepositoryLocator {
    /// Accepts the URL forms package managers are usually configured with:
    ///
    /// - `https://host/artifactory/<repo>`
    /// - `https://host/artifactory/api/pypi/<repo>/simple`
    /// - `https://host/artifactory/api/npm/<repo>`
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let mut trimmed = url.trim().trim_end_matches('/');
        if let Some(stripped) = trimmed.strip_suffix("/simple") {
            trimmed = stripped;
        }

        let (base_url, repo) = if let Some((base, repo)) = trimmed.split_once("/api/pypi/") {
            (base.to_string(), repo)
        } else if let Some((base, repo)) = trimmed.split_once("/api/npm/") {
            (base.to_string(), repo)
        } else if let Some((host, repo)) = trimmed.split_once("/artifactory/") {
            (format!("{host}/artifactory"), repo)
        } else {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        };

        let repo = repo.trim_matches('/');
        if repo.is_empty() || repo.contains('/') {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            base_url,
            repo: repo.to_string(),
        })
    }

    pub fn aql_url(&self) -> String {
        format!("{}/api/search/aql", self.base_url)
    }

    pub fn storage_url(&self) -> String {
        format!("{}/api/storage/{}", self.base_url, self.repo)
    }

    /// Same server, different repository name.
    pub fn with_repo(&self, repo: &str) -> Self {
        Self {
            base_url: self.base_url.clone(),
            repo: repo.to_string(),
        }
    }
}

/// Builder for an `items.find(...)` AQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    repo: String,
    name_patterns: Vec<String>,
    include: Vec<String>,
    limit: Option<usize>,
}

impl ItemQuery {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            name_patterns: Vec::new(),
            include: vec!["name".to_string(), "path".to_string(), "repo".to_string()],
            limit: None,
        }
    }

    /// Listing of candidate files, with statistics inline unless a
    /// separate stats query will supply them.
    pub fn listing(repo: &str, patterns: &[&str], inline_stats: bool) -> Self {
        let query = Self::new(repo)
            .names_matching(patterns)
            .include(&["type", "size"]);
        if inline_stats {
            query.include(&STAT_FIELDS)
        } else {
            query
        }
    }

    /// Auxiliary query returning only path and download statistics.
    pub fn stats_for(repo: &str, patterns: &[&str]) -> Self {
        Self::new(repo).names_matching(patterns).include(&STAT_FIELDS)
    }

    /// Unfiltered look at the first items in the repository.
    pub fn sample(repo: &str) -> Self {
        Self::new(repo)
            .include(&["type", "size"])
            .include(&STAT_FIELDS)
            .limit(SAMPLE_LIMIT)
    }

    pub fn names_matching(mut self, patterns: &[&str]) -> Self {
        self.name_patterns
            .extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    pub fn include(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if !self.include.iter().any(|f| f == field) {
                self.include.push(field.to_string());
            }
        }
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the query in AQL syntax, ready to POST as `text/plain`.
    pub fn to_aql(&self) -> String {
        let mut criteria = format!("\"repo\": {}", quote(&self.repo));
        if !self.name_patterns.is_empty() {
            let alternatives: Vec<String> = self
                .name_patterns
                .iter()
                .map(|p| format!("{{\"name\": {{\"$match\": {}}}}}", quote(p)))
                .collect();
            criteria.push_str(&format!(", \"$or\": [{}]", alternatives.join(", ")));
        }

        let fields: Vec<String> = self.include.iter().map(|f| quote(f)).collect();
        let mut aql = format!(
            "items.find({{{criteria}}}).include({})",
            fields.join(", ")
        );
        if let Some(limit) = self.limit {
            aql.push_str(&format!(".limit({limit})"));
        }
        aql
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Body of an AQL search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AqlResponse {
    #[serde(default)]
    pub results: Vec<AqlItem>,
}

/// One item of an AQL search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AqlItem {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub stats: Vec<ItemStat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemStat {
    #[serde(default)]
    pub downloaded: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
}

impl AqlItem {
    pub fn is_folder(&self) -> bool {
        self.item_type.as_deref() == Some("folder")
    }

    /// Repository-relative path including the file name. AQL reports
    /// root-level items with a path of `.`.
    pub fn full_path(&self) -> String {
        let dir = self.path.trim_matches('/');
        if dir.is_empty() || dir == "." {
            self.name.clone()
        } else {
            format!("{dir}/{}", self.name)
        }
    }

    fn stat(&self) -> (Option<DateTime<Utc>>, u64) {
        match self.stats.first() {
            Some(stat) => (
                stat.downloaded.as_deref().and_then(parse_timestamp),
                stat.downloads.unwrap_or(0),
            ),
            None => (None, 0),
        }
    }

    pub fn to_record(&self) -> ArtifactRecord {
        let (last_downloaded, download_count) = self.stat();
        ArtifactRecord {
            path: self.full_path(),
            size: self.size,
            last_downloaded,
            download_count,
        }
    }
}

impl AqlResponse {
    /// File records in response order; folders are dropped.
    pub fn into_records(self) -> Vec<ArtifactRecord> {
        self.results
            .iter()
            .filter(|item| !item.is_folder())
            .map(AqlItem::to_record)
            .collect()
    }
}

/// Copy statistics from a stats query response onto listing records by path.
/// Records with no matching stats entry keep what they had.
pub fn join_stats(records: Vec<ArtifactRecord>, stats: &AqlResponse) -> Vec<ArtifactRecord> {
    let by_path: HashMap<String, (Option<DateTime<Utc>>, u64)> = stats
        .results
        .iter()
        .filter(|item| !item.is_folder())
        .map(|item| (item.full_path(), item.stat()))
        .collect();

    records
        .into_iter()
        .map(|record| match by_path.get(&record.path) {
            Some(&(last_downloaded, count)) => record.with_stats(last_downloaded, count),
            None => record,
        })
        .collect()
}

/// Parse an Artifactory timestamp. Unparseable input is treated as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
