use thiserror::Error;

/// Why an artifact path produced no package version. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(String),

    /// Checksums, signatures, source/javadoc jars and other companion files.
    #[error("not a package artifact: {0}")]
    NonArtifact(String),

    #[error("path does not match the repository layout: {0}")]
    MalformedPath(String),

    #[error("no version found in {0}")]
    MissingVersion(String),
}

/// Failure talking to the repository manager. Fatal for the invocation.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("authentication rejected by {url} (HTTP {status}); check username and password")]
    Unauthorized { url: String, status: u16 },

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Invalid combination of settings, detected before any query is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot parse repository URL '{0}'; expected https://host/artifactory/<repo>")]
    InvalidUrl(String),

    #[error("output format '{format}' is not available for {ecosystem} (choose from: {choices})")]
    UnsupportedFormat {
        ecosystem: String,
        format: String,
        choices: String,
    },

    #[error("--username and --password must be provided together")]
    IncompleteCredentials,
}
