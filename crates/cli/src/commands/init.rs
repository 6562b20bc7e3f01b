use anyhow::{Context, Result};
use pagesnap_core::CONFIG_FILE;
use std::fs;
use std::path::PathBuf;

/// Starting point for snapshot.toml. Every value shown is the built-in default.
const CONFIG_TEMPLATE: &str = r##"# pagesnap configuration
# Every value below is the default; delete what you don't need to change.

[source]
# Running server to snapshot
base_url = "http://localhost:8765"
# Give up if the server has not answered 200 within this many seconds
ready_timeout_secs = 30
probe_timeout_secs = 5
poll_interval_ms = 1000
# Timeout for the main page and each API endpoint
request_timeout_secs = 10

[paths]
static_dir = "static"
# Deleted and recreated on every build
output_dir = "build"
asset_dirs = ["css", "js"]
shim_file = "js/demo-mode.js"

[fetch]
# 1 fetches endpoints one at a time
concurrency = 1

# Listing any [[endpoint]] replaces the default list.
# `file` is optional; without it /api/a/b is saved as api/a_b.json
[[endpoint]]
path = "/api/check-adb"
file = "check-adb.json"

[[endpoint]]
path = "/api/devices"
file = "devices.json"

[[endpoint]]
path = "/api/categories"
file = "categories.json"

# Literal replacements applied to index.html in order.
# Listing any [[rewrite]] replaces the default list.
[[rewrite]]
find = 'href="/static/css/style.css"'
replace = 'href="./css/style.css"'

[[rewrite]]
find = 'src="/static/js/app.js"'
replace = 'src="./js/app.js"'

[[rewrite]]
find = "</head>"
replace = """    <script src="./js/demo-mode.js"></script>
</head>"""

[[rewrite]]
find = "<title>adb-turbo"
replace = "<title>adb-turbo (Demo)"

[[rewrite]]
find = '<meta name="description" content="A friendly web-based tool for Android performance optimization via ADB. 43 commands across 13 categories.">'
replace = '<meta name="description" content="Demo: A friendly web-based tool for Android performance optimization via ADB. 43 commands across 13 categories. Run locally for full functionality.">'
"##;

/// Write a default snapshot.toml into `path`
pub async fn run(path: PathBuf, force: bool) -> Result<()> {
    let target = path.join(CONFIG_FILE);

    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists\nUse --force to overwrite it",
            target.display()
        );
    }

    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    fs::write(&target, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("✅ Created {}", target.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit base_url and the endpoint list");
    println!("  2. Start your server");
    println!("  3. Run: pagesnap build --config {}", target.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesnap_core::{SnapshotConfig, parse_snapshot_toml, parse_snapshot_toml_str};
    use tempfile::TempDir;

    #[test]
    fn test_template_matches_defaults() {
        let config = parse_snapshot_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, SnapshotConfig::default());
    }

    #[tokio::test]
    async fn test_init_writes_config() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("site");

        run(project.clone(), false).await.unwrap();

        let config = parse_snapshot_toml(project.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.endpoints.len(), 3);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "# mine").unwrap();

        let result = run(dir.path().to_path_buf(), false).await;
        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            "# mine"
        );

        run(dir.path().to_path_buf(), true).await.unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            CONFIG_TEMPLATE
        );
    }
}
