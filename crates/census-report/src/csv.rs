use chrono::SecondsFormat;

use census_core::aggregate::AggregationResult;
use census_core::types::{Ecosystem, PackageIdentity, PackageVersion};

use crate::text::coordinate;

const PACKAGE_HEADER: &str = "package,version,package_version,last_downloaded,download_count";
const MAVEN_HEADER: &str = "groupId,artifactId,version,package_version,last_downloaded,download_count";

/// Header row followed by one row per package version.
pub fn format_csv(result: &AggregationResult) -> String {
    let mut out = String::new();
    out.push_str(header(result.ecosystem));
    out.push('\n');
    for pv in result.iter() {
        let row = row(pv);
        let fields: Vec<String> = row.iter().map(|f| escape_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub fn header(ecosystem: Ecosystem) -> &'static str {
    match ecosystem {
        Ecosystem::Maven => MAVEN_HEADER,
        Ecosystem::Python | Ecosystem::Npm => PACKAGE_HEADER,
    }
}

fn row(pv: &PackageVersion) -> Vec<String> {
    let mut fields = match &pv.identity {
        PackageIdentity::Maven {
            group_id,
            artifact_id,
        } => vec![group_id.clone(), artifact_id.clone()],
        PackageIdentity::Python { name } | PackageIdentity::Npm { name } => vec![name.clone()],
    };
    fields.push(pv.version.clone());
    fields.push(coordinate(pv));
    fields.push(
        pv.last_downloaded
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default(),
    );
    fields.push(pv.download_count.to_string());
    fields
}

/// Quote a field if it contains a comma, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_core::aggregate::Mode;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_python_rows() {
        let identity = PackageIdentity::python("flask");
        let when = Utc.with_ymd_and_hms(2025, 9, 1, 8, 30, 0).unwrap();
        let mut result = AggregationResult::empty(Ecosystem::Python, Mode::All);
        let mut downloaded = PackageVersion::new(identity.clone(), "3.1.2");
        downloaded.last_downloaded = Some(when);
        downloaded.download_count = 7;
        result.packages.insert(
            identity.clone(),
            vec![PackageVersion::new(identity, "3.1.1"), downloaded],
        );

        let out = format_csv(&result);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], PACKAGE_HEADER);
        assert_eq!(lines[1], "flask,3.1.1,flask==3.1.1,,0", "missing timestamp stays empty");
        assert_eq!(lines[2], "flask,3.1.2,flask==3.1.2,2025-09-01T08:30:00.000Z,7");
    }

    #[test]
    fn test_maven_rows() {
        let identity = PackageIdentity::maven("junit", "junit");
        let mut result = AggregationResult::empty(Ecosystem::Maven, Mode::Latest);
        result
            .packages
            .insert(identity.clone(), vec![PackageVersion::new(identity, "4.13.2")]);
        assert_eq!(
            format_csv(&result),
            format!("{MAVEN_HEADER}\njunit,junit,4.13.2,junit:junit:4.13.2,,0\n")
        );
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
