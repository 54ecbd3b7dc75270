use serde_json::{Map, Value};

use census_core::aggregate::AggregationResult;

use crate::RenderError;

/// `{"dependencies": {name: version}}`, pretty printed.
///
/// With several versions of one package the last in version order wins, so
/// the file pins the newest cached version.
pub fn format_package_json(result: &AggregationResult) -> Result<String, RenderError> {
    if result.is_empty() {
        return Ok(String::new());
    }

    let mut dependencies = Map::new();
    for pv in result.iter() {
        dependencies.insert(pv.identity.to_string(), Value::String(pv.version.clone()));
    }
    let mut document = Map::new();
    document.insert("dependencies".to_string(), Value::Object(dependencies));

    let mut out = serde_json::to_string_pretty(&Value::Object(document))?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_core::aggregate::Mode;
    use census_core::types::{Ecosystem, PackageIdentity, PackageVersion};

    #[test]
    fn test_package_json_last_version_wins() {
        let express = PackageIdentity::npm("express");
        let scoped = PackageIdentity::npm("@types/node");
        let mut result = AggregationResult::empty(Ecosystem::Npm, Mode::All);
        result.packages.insert(
            express.clone(),
            vec![
                PackageVersion::new(express.clone(), "4.17.1"),
                PackageVersion::new(express, "4.18.2"),
            ],
        );
        result
            .packages
            .insert(scoped.clone(), vec![PackageVersion::new(scoped, "18.11.9")]);

        let out = format_package_json(&result).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["dependencies"]["express"], "4.18.2");
        assert_eq!(parsed["dependencies"]["@types/node"], "18.11.9");
        assert_eq!(parsed["dependencies"].as_object().unwrap().len(), 2);
        assert!(out.ends_with("}\n"));
    }
}
