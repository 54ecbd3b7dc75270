use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use census_core::error::QueryError;
use census_core::parser::ArtifactParser;
use census_core::query::{join_stats, AqlResponse, ItemQuery, RepositoryLocator};
use census_core::types::ArtifactRecord;

use crate::settings::Credentials;

/// Sampled items echoed to the debug log.
const SAMPLE_LOG_ITEMS: usize = 20;

/// Longest error body kept in an error message.
const BODY_EXCERPT: usize = 300;

/// Blocking client for the Artifactory search and storage APIs.
pub struct ArtifactoryClient {
    http: Client,
    locator: RepositoryLocator,
    credentials: Option<Credentials>,
}

impl ArtifactoryClient {
    pub fn new(
        locator: RepositoryLocator,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("cache-census/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            locator,
            credentials,
        })
    }

    /// Name of the repository that physically stores the cached files.
    ///
    /// Remote repositories are often backed by a `<name>-cache` repository.
    /// Falls back to the configured name when the storage API gives no answer.
    pub fn resolve_repo_name(&self) -> String {
        let configured = &self.locator.repo;
        match self.storage_repo() {
            Ok(Some(physical)) if physical != *configured => {
                info!("repository '{configured}' is stored as '{physical}'");
                physical
            }
            Ok(_) => configured.clone(),
            Err(e) => {
                warn!("could not resolve storage name of '{configured}': {e}");
                configured.clone()
            }
        }
    }

    fn storage_repo(&self) -> Result<Option<String>, QueryError> {
        let url = self.locator.storage_url();
        let body = self.send(self.http.get(&url), &url)?;
        let value: Value = serde_json::from_str(&body).map_err(|e| QueryError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(value
            .get("repo")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string))
    }

    /// POST one AQL query.
    pub fn search(&self, query: &ItemQuery) -> Result<AqlResponse, QueryError> {
        let url = self.locator.aql_url();
        let aql = query.to_aql();
        debug!("AQL: {aql}");

        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(aql);
        let body = self.send(request, &url)?;
        serde_json::from_str(&body).map_err(|e| QueryError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Every candidate file in `repo` with its download statistics.
    pub fn fetch_records(
        &self,
        repo: &str,
        parser: &dyn ArtifactParser,
    ) -> Result<Vec<ArtifactRecord>, QueryError> {
        let patterns = parser.name_patterns();
        let inline_stats = !parser.uses_stats_query();

        let listing = self.search(&ItemQuery::listing(repo, patterns, inline_stats))?;
        let mut records = listing.into_records();
        info!("found {} candidate files in '{repo}'", records.len());

        if !inline_stats {
            let stats = self.search(&ItemQuery::stats_for(repo, patterns))?;
            debug!("joining {} statistics entries", stats.results.len());
            records = join_stats(records, &stats);
        }
        Ok(records)
    }

    /// Log the first items of `repo` without any name filter.
    pub fn sample(&self, repo: &str) -> Result<(), QueryError> {
        let response = self.search(&ItemQuery::sample(repo))?;
        debug!(
            "sample of '{repo}' returned {} items",
            response.results.len()
        );
        for item in response.results.iter().take(SAMPLE_LOG_ITEMS) {
            debug!(
                "  {} ({})",
                item.full_path(),
                item.item_type.as_deref().unwrap_or("file")
            );
        }
        Ok(())
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<String, QueryError> {
        let request = match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        };

        let response = request.send().map_err(|e| QueryError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(QueryError::Unauthorized {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| QueryError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(QueryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(BODY_EXCERPT).collect(),
            });
        }
        Ok(body)
    }
}
