use census_core::aggregate::AggregationResult;
use census_core::types::{OutputFormat, PackageIdentity, PackageVersion};

/// One entry per package version, newline terminated.
///
/// `format` must be one of the line formats (simple, maven, gradle, npm).
/// Only Maven identities get a `<dependency>` block; any other identity
/// keeps its plain coordinate.
pub fn format_lines(result: &AggregationResult, format: OutputFormat) -> String {
    let mut out = String::new();
    for pv in result.iter() {
        let line = match (format, &pv.identity) {
            (
                OutputFormat::Maven,
                PackageIdentity::Maven {
                    group_id,
                    artifact_id,
                },
            ) => maven_dependency(group_id, artifact_id, &pv.version),
            (OutputFormat::Gradle, _) => format!("implementation '{}'", coordinate(pv)),
            (OutputFormat::Npm, _) => format!("npm install {}", coordinate(pv)),
            _ => coordinate(pv),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// The ecosystem's own spelling of a pinned version:
/// `name==1.0`, `group:artifact:1.0` or `name@1.0`.
pub fn coordinate(pv: &PackageVersion) -> String {
    match &pv.identity {
        PackageIdentity::Python { name } => format!("{name}=={}", pv.version),
        PackageIdentity::Maven {
            group_id,
            artifact_id,
        } => format!("{group_id}:{artifact_id}:{}", pv.version),
        PackageIdentity::Npm { name } => format!("{name}@{}", pv.version),
    }
}

fn maven_dependency(group_id: &str, artifact_id: &str, version: &str) -> String {
    format!(
        "<dependency>\n  <groupId>{}</groupId>\n  <artifactId>{}</artifactId>\n  <version>{}</version>\n</dependency>",
        escape_xml(group_id),
        escape_xml(artifact_id),
        escape_xml(version)
    )
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
