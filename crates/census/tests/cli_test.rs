use std::path::Path;
use std::process::{Command, Output};

use chrono::{Duration, SecondsFormat, Utc};

fn fixture(name: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    format!("{manifest_dir}/tests/fixtures/{name}")
}

/// Runs in `dir` so no `.census.toml` from the checkout is picked up.
fn census(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_census"))
        .args(args)
        .current_dir(dir)
        .env_remove("CENSUS_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run census")
}

fn assert_success(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "census failed: stdout={stdout}, stderr={stderr}"
    );
    stdout
}

#[test]
fn test_python_latest_simple() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &["python", "--from-json", &fixture("python-remote.json")],
    );
    let stdout = assert_success(&output);
    assert_eq!(stdout, "certifi==2025.7.14\nflask==3.1.2\njinja2==3.1.6\n");
}

#[test]
fn test_python_package_filter_normalizes_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "python",
            "--from-json",
            &fixture("python-remote.json"),
            "--package",
            "Jinja2",
        ],
    );
    assert_eq!(assert_success(&output), "jinja2==3.1.6\n");
}

#[test]
fn test_maven_all_versions_simple() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "maven",
            "--from-json",
            &fixture("java-remote.json"),
            "--all-versions",
        ],
    );
    assert_eq!(
        assert_success(&output),
        "junit:junit:4.13.2\norg.springframework:spring-core:5.3.1\norg.springframework:spring-core:5.3.2\n"
    );
}

#[test]
fn test_maven_gradle_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("deps.gradle");
    let output = census(
        dir.path(),
        &[
            "maven",
            "--from-json",
            &fixture("java-remote.json"),
            "--format",
            "gradle",
            "-o",
            out.to_str().unwrap(),
        ],
    );
    assert_eq!(assert_success(&output), "", "text went to the file");

    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        content,
        "implementation 'junit:junit:4.13.2'\nimplementation 'org.springframework:spring-core:5.3.2'\n"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("deps.gradle"), "summary names the file: {stderr}");
}

#[test]
fn test_maven_xml_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "maven",
            "--from-json",
            &fixture("java-remote.json"),
            "--package",
            "junit",
            "--format",
            "maven",
        ],
    );
    assert_eq!(
        assert_success(&output),
        "<dependency>\n  <groupId>junit</groupId>\n  <artifactId>junit</artifactId>\n  <version>4.13.2</version>\n</dependency>\n"
    );
}

#[test]
fn test_npm_package_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "npm",
            "--from-json",
            &fixture("npm-remote.json"),
            "--format",
            "package-json",
        ],
    );
    let stdout = assert_success(&output);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["dependencies"]["express"], "4.18.2");
    assert_eq!(parsed["dependencies"]["@types/node"], "18.11.9");
}

#[test]
fn test_npm_csv_merges_tarball_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("npm.csv");
    let output = census(
        dir.path(),
        &[
            "npm",
            "--from-json",
            &fixture("npm-remote.json"),
            "--csv-output",
            csv.to_str().unwrap(),
        ],
    );
    assert_eq!(
        assert_success(&output),
        "",
        "csv-only runs print no text channel"
    );

    let content = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "package,version,package_version,last_downloaded,download_count"
    );
    assert!(
        lines.contains(&"express,4.18.2,express@4.18.2,2025-09-12T12:00:00.000Z,42"),
        "{content}"
    );
    assert!(
        lines.contains(&"@types/node,18.11.9,@types/node@18.11.9,2025-08-01T06:30:00.000Z,7"),
        "{content}"
    );
}

#[test]
fn test_csv_lists_every_version_in_both_modes() {
    for mode_flag in [None, Some("--all-versions")] {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("java.csv");
        let fixture_path = fixture("java-remote.json");
        let mut args = vec![
            "maven",
            "--from-json",
            fixture_path.as_str(),
            "--csv-output",
            csv.to_str().unwrap(),
        ];
        args.extend(mode_flag);
        assert_success(&census(dir.path(), &args));

        let content = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(
            content.lines().count(),
            4,
            "header plus three versions with {mode_flag:?}: {content}"
        );
        assert!(
            content.contains(
                "org.springframework,spring-core,5.3.1,org.springframework:spring-core:5.3.1,2025-05-02T10:00:01.000Z,6"
            ),
            "pom and jar merge to the higher count: {content}"
        );
    }
}

#[test]
fn test_since_days_picks_latest_downloaded_version() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let stamp = |days: i64| (now - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let response = serde_json::json!({
        "results": [
            {
                "path": "ab/cd",
                "name": "flask-3.1.1-py3-none-any.whl",
                "type": "file",
                "stats": [{ "downloaded": stamp(3), "downloads": 9 }]
            },
            {
                "path": "ef/01",
                "name": "flask-3.1.2-py3-none-any.whl",
                "type": "file",
                "stats": [{ "downloaded": stamp(60), "downloads": 2 }]
            }
        ]
    });
    let saved = dir.path().join("flask.json");
    std::fs::write(&saved, response.to_string()).unwrap();
    let csv = dir.path().join("flask.csv");

    let output = census(
        dir.path(),
        &[
            "python",
            "--from-json",
            saved.to_str().unwrap(),
            "--since-days",
            "30",
            "-o",
            dir.path().join("requirements.txt").to_str().unwrap(),
            "--csv-output",
            csv.to_str().unwrap(),
        ],
    );
    assert_success(&output);

    assert_eq!(
        std::fs::read_to_string(dir.path().join("requirements.txt")).unwrap(),
        "flask==3.1.1\n"
    );
    let csv_content = std::fs::read_to_string(&csv).unwrap();
    assert!(csv_content.contains("flask,3.1.1,flask==3.1.1,"), "{csv_content}");
    assert!(csv_content.contains("flask,3.1.2,flask==3.1.2,"), "{csv_content}");
}

#[test]
fn test_since_days_filters_text_but_not_csv() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let stamp = |days: i64| (now - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let response = serde_json::json!({
        "results": [
            {
                "path": "ab/cd",
                "name": "flask-3.1.2-py3-none-any.whl",
                "type": "file",
                "stats": [{ "downloaded": stamp(45), "downloads": 4 }]
            },
            {
                "path": "ef/01",
                "name": "jinja2-3.1.6-py3-none-any.whl",
                "type": "file",
                "stats": [{ "downloaded": stamp(2), "downloads": 1 }]
            }
        ]
    });
    let saved = dir.path().join("recent.json");
    std::fs::write(&saved, response.to_string()).unwrap();
    let text = dir.path().join("requirements.txt");
    let csv = dir.path().join("requirements.csv");

    let output = census(
        dir.path(),
        &[
            "python",
            "--from-json",
            saved.to_str().unwrap(),
            "--since-days",
            "30",
            "--output",
            text.to_str().unwrap(),
            "--csv-output",
            csv.to_str().unwrap(),
        ],
    );
    assert_success(&output);

    assert_eq!(std::fs::read_to_string(&text).unwrap(), "jinja2==3.1.6\n");
    let csv_content = std::fs::read_to_string(&csv).unwrap();
    assert!(csv_content.contains("flask,3.1.2,flask==3.1.2,"), "{csv_content}");
    assert!(csv_content.contains("jinja2,3.1.6,jinja2==3.1.6,"), "{csv_content}");
}

#[test]
fn test_config_file_supplies_format() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".census.toml"),
        "[output]\nformat = \"npm\"\n",
    )
    .unwrap();
    let output = census(
        dir.path(),
        &["npm", "--from-json", &fixture("npm-remote.json")],
    );
    assert_eq!(
        assert_success(&output),
        "npm install @types/node@18.11.9\nnpm install express@4.18.2\n"
    );
}

#[test]
fn test_empty_response_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(dir.path(), &["npm", "--from-json", &fixture("empty.json")]);
    assert_eq!(assert_success(&output), "");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no cached npm packages"), "{stderr}");
}

#[test]
fn test_unsupported_format_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "python",
            "--from-json",
            &fixture("python-remote.json"),
            "--format",
            "gradle",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "{stderr}");
    assert!(stderr.contains("gradle"), "{stderr}");
}

#[test]
fn test_missing_url_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(dir.path(), &["maven"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--url"));
}

#[test]
fn test_invalid_url_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(dir.path(), &["maven", "--url", "https://example.com/repo"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot parse repository URL"));
}

#[test]
fn test_username_without_password_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(
        dir.path(),
        &[
            "npm",
            "--url",
            "https://example.jfrog.io/artifactory/api/npm/npm-remote",
            "--username",
            "reader",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("together"));
}

#[test]
fn test_unreadable_saved_response_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "<html>login</html>").unwrap();
    let output = census(dir.path(), &["python", "--from-json", bad.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not an AQL search response"));
}

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = census(dir.path(), &["init"]);
    assert_success(&output);

    let config_path = dir.path().join(".census.toml");
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[server]"), "{content}");
    assert!(content.contains("[output]"), "{content}");

    let again = census(dir.path(), &["init"]);
    assert_eq!(again.status.code(), Some(2), "refuses to overwrite");
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    let forced = census(dir.path(), &["init", "--force"]);
    assert_success(&forced);
}
