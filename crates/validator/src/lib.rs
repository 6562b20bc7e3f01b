// Checks a built snapshot tree against the configuration that produced it

use pagesnap_core::{API_DIR, ERROR_PAGE_FILE, HOST_MARKER_FILE, INDEX_FILE, SnapshotConfig};
use pagesnap_generator::INTERCEPT_SHIM;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix the build uses for placeholder error messages
const PLACEHOLDER_PREFIX: &str = "Failed to fetch data:";

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate the snapshot rooted at `root`.
///
/// Missing or inconsistent files are errors; placeholder API responses and
/// an index that no longer loads the shim are warnings.
pub fn validate_snapshot(root: &Path, config: &SnapshotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !root.is_dir() {
        report
            .errors
            .push(format!("Snapshot directory not found: {}", root.display()));
        return report;
    }

    let index = read_required(root, INDEX_FILE, &mut report);
    check_error_page(root, index.as_deref(), &mut report);
    check_marker(root, &mut report);
    check_shim(root, config, &mut report);
    if let Some(index) = &index {
        check_index(index, config, &mut report);
    }
    check_api(root, config, &mut report);
    summarize(root, &mut report);

    report
}

fn read_required(root: &Path, name: &str, report: &mut ValidationReport) -> Option<Vec<u8>> {
    match fs::read(root.join(name)) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            report.errors.push(format!("{} unreadable: {}", name, e));
            None
        }
    }
}

fn check_error_page(root: &Path, index: Option<&[u8]>, report: &mut ValidationReport) {
    let Some(page) = read_required(root, ERROR_PAGE_FILE, report) else {
        return;
    };
    if let Some(index) = index
        && page != index
    {
        report
            .errors
            .push(format!("{} differs from {}", ERROR_PAGE_FILE, INDEX_FILE));
    }
}

fn check_marker(root: &Path, report: &mut ValidationReport) {
    match fs::metadata(root.join(HOST_MARKER_FILE)) {
        Ok(meta) if meta.len() == 0 => {}
        Ok(meta) => report.warnings.push(format!(
            "{} should be empty but has {} bytes",
            HOST_MARKER_FILE,
            meta.len()
        )),
        Err(_) => report
            .errors
            .push(format!("{} is missing", HOST_MARKER_FILE)),
    }
}

fn check_shim(root: &Path, config: &SnapshotConfig, report: &mut ValidationReport) {
    let shim = &config.paths.shim_file;
    match fs::read_to_string(root.join(shim)) {
        Ok(content) if content == INTERCEPT_SHIM => {}
        Ok(_) => report.warnings.push(format!(
            "{} differs from the generated interception shim",
            shim.display()
        )),
        Err(_) => report
            .errors
            .push(format!("Interception shim {} is missing", shim.display())),
    }
}

fn check_index(index: &[u8], config: &SnapshotConfig, report: &mut ValidationReport) {
    let html = String::from_utf8_lossy(index);
    let shim_src = format!(
        "./{}",
        config.paths.shim_file.to_string_lossy().replace('\\', "/")
    );

    match html.matches(shim_src.as_str()).count() {
        0 => report
            .warnings
            .push(format!("{} does not load {}", INDEX_FILE, shim_src)),
        1 => {}
        n => report
            .warnings
            .push(format!("{} loads {} {} times", INDEX_FILE, shim_src, n)),
    }

    if html.contains("=\"/static/") {
        report.warnings.push(format!(
            "{} still references absolute /static/ paths",
            INDEX_FILE
        ));
    }
}

fn check_api(root: &Path, config: &SnapshotConfig, report: &mut ValidationReport) {
    let api_dir = root.join(API_DIR);
    let mut expected = HashSet::new();
    let mut captured = 0;

    for endpoint in &config.endpoints {
        let file = endpoint.output_file();
        let display = Path::new(API_DIR).join(&file);
        expected.insert(api_dir.join(&file));

        let content = match fs::read(api_dir.join(&file)) {
            Ok(content) => content,
            Err(_) => {
                report.errors.push(format!(
                    "{} for {} is missing",
                    display.display(),
                    endpoint.path
                ));
                continue;
            }
        };

        match serde_json::from_slice::<serde_json::Value>(&content) {
            Ok(value) => match placeholder_error(&value) {
                Some(message) => report.warnings.push(format!(
                    "{} is a placeholder for {}: {}",
                    display.display(),
                    endpoint.path,
                    message
                )),
                None => captured += 1,
            },
            Err(e) => report.errors.push(format!(
                "{} is not valid JSON: {}",
                display.display(),
                e
            )),
        }
    }

    report.info.push(format!(
        "{} of {} endpoints captured",
        captured,
        config.endpoints.len()
    ));

    for extra in json_files(&api_dir)
        .into_iter()
        .filter(|path| !expected.contains(path))
    {
        let relative = extra.strip_prefix(root).unwrap_or(&extra);
        report
            .info
            .push(format!("{} is not a configured endpoint", relative.display()));
    }
}

/// The error message of a build placeholder, if `value` is one
fn placeholder_error(value: &serde_json::Value) -> Option<&str> {
    let object = value.as_object()?;
    if object.get("success")?.as_bool()? {
        return None;
    }
    object.get("timestamp")?.as_str()?;
    let error = object.get("error")?.as_str()?;
    error.starts_with(PLACEHOLDER_PREFIX).then_some(error)
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

fn summarize(root: &Path, report: &mut ValidationReport) {
    let (files, bytes) = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0u64, 0u64), |(files, bytes), meta| {
            (files + 1, bytes + meta.len())
        });
    report
        .info
        .push(format!("{} files, {} bytes", files, bytes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INDEX: &str = "<html><head>    <script src=\"./js/demo-mode.js\"></script>\n</head></html>";

    /// A tree shaped like a successful default build
    fn build_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::create_dir_all(root.join("js")).unwrap();
        fs::write(root.join("index.html"), INDEX).unwrap();
        fs::write(root.join("404.html"), INDEX).unwrap();
        fs::write(root.join(".nojekyll"), "").unwrap();
        fs::write(root.join("js/demo-mode.js"), INTERCEPT_SHIM).unwrap();
        fs::write(root.join("api/check-adb.json"), r#"{"success": true}"#).unwrap();
        fs::write(root.join("api/devices.json"), r#"{"devices": []}"#).unwrap();
        fs::write(root.join("api/categories.json"), "[]").unwrap();
        dir
    }

    #[test]
    fn test_complete_tree_is_valid() {
        let dir = build_tree();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.is_ok(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
        assert!(report.info.contains(&"3 of 3 endpoints captured".to_string()));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let report = validate_snapshot(&dir.path().join("build"), &SnapshotConfig::default());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("not found"));
    }

    #[test]
    fn test_error_page_must_match_index() {
        let dir = build_tree();
        fs::write(dir.path().join("404.html"), "<html>stale</html>").unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.errors.iter().any(|e| e.contains("404.html differs")));
    }

    #[test]
    fn test_marker_missing_or_non_empty() {
        let dir = build_tree();
        fs::write(dir.path().join(".nojekyll"), "x").unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("should be empty")));

        fs::remove_file(dir.path().join(".nojekyll")).unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.errors.iter().any(|e| e.contains(".nojekyll is missing")));
    }

    #[test]
    fn test_placeholder_is_a_warning() {
        let dir = build_tree();
        fs::write(
            dir.path().join("api/devices.json"),
            r#"{
  "success": false,
  "error": "Failed to fetch data: connection refused",
  "timestamp": "2025-01-01T00:00:00.000Z"
}"#,
        )
        .unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("api/devices.json is a placeholder"));
        assert!(report.info.contains(&"2 of 3 endpoints captured".to_string()));
    }

    #[test]
    fn test_server_reported_failure_is_not_a_placeholder() {
        let value = serde_json::json!({"success": false, "error": "adb not found"});
        assert_eq!(placeholder_error(&value), None);
    }

    #[test]
    fn test_missing_and_invalid_api_files() {
        let dir = build_tree();
        fs::remove_file(dir.path().join("api/categories.json")).unwrap();
        fs::write(dir.path().join("api/devices.json"), "<html>").unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
        assert!(report.errors.iter().any(|e| e.contains("categories.json for /api/categories is missing")));
        assert!(report.errors.iter().any(|e| e.contains("devices.json is not valid JSON")));
    }

    #[test]
    fn test_index_without_shim_or_with_absolute_paths() {
        let dir = build_tree();
        let html = r#"<html><head><link href="/static/css/style.css"></head></html>"#;
        fs::write(dir.path().join("index.html"), html).unwrap();
        fs::write(dir.path().join("404.html"), html).unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("does not load ./js/demo-mode.js")));
        assert!(report.warnings.iter().any(|w| w.contains("absolute /static/")));
    }

    #[test]
    fn test_extra_api_files_are_reported() {
        let dir = build_tree();
        fs::write(dir.path().join("api/stale.json"), "{}").unwrap();
        let report = validate_snapshot(dir.path(), &SnapshotConfig::default());
        assert!(report.info.iter().any(|i| i.contains("stale.json is not a configured endpoint")));
    }
}
