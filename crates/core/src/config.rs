use crate::error::{Error, Result};
use crate::types::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when none is named
pub const CONFIG_FILE: &str = "snapshot.toml";

/// Raw TOML configuration structure.
/// Every table is optional; anything left out keeps its default.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    source: RawSource,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    fetch: RawFetch,
    #[serde(default)]
    endpoint: Vec<RawEndpoint>,
    #[serde(default)]
    rewrite: Vec<RawRewrite>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    base_url: Option<String>,
    ready_timeout_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPaths {
    static_dir: Option<String>,
    output_dir: Option<String>,
    asset_dirs: Option<Vec<String>>,
    shim_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFetch {
    concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    path: String,
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRewrite {
    find: String,
    replace: String,
}

/// Parse snapshot.toml from a file path
pub fn parse_snapshot_toml<P: AsRef<Path>>(path: P) -> Result<SnapshotConfig> {
    let content = fs::read_to_string(path)?;
    parse_snapshot_toml_str(&content)
}

/// Parse snapshot.toml from a string (useful for testing)
pub fn parse_snapshot_toml_str(content: &str) -> Result<SnapshotConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let defaults = SnapshotConfig::default();

    let source = SourceConfig {
        base_url: raw.source.base_url.unwrap_or(defaults.source.base_url),
        ready_timeout: raw
            .source
            .ready_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.source.ready_timeout),
        probe_timeout: raw
            .source
            .probe_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.source.probe_timeout),
        poll_interval: raw
            .source
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.source.poll_interval),
        request_timeout: raw
            .source
            .request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.source.request_timeout),
    };

    let paths = PathsConfig {
        static_dir: raw
            .paths
            .static_dir
            .map(PathBuf::from)
            .unwrap_or(defaults.paths.static_dir),
        output_dir: raw
            .paths
            .output_dir
            .map(PathBuf::from)
            .unwrap_or(defaults.paths.output_dir),
        asset_dirs: raw
            .paths
            .asset_dirs
            .map(|dirs| dirs.into_iter().map(PathBuf::from).collect())
            .unwrap_or(defaults.paths.asset_dirs),
        shim_file: raw
            .paths
            .shim_file
            .map(PathBuf::from)
            .unwrap_or(defaults.paths.shim_file),
    };

    let fetch = FetchConfig {
        concurrency: raw.fetch.concurrency.unwrap_or(defaults.fetch.concurrency),
    };

    // A non-empty list replaces the defaults wholesale
    let endpoints = if raw.endpoint.is_empty() {
        defaults.endpoints
    } else {
        raw.endpoint
            .into_iter()
            .map(|e| Endpoint {
                path: e.path,
                file: e.file.map(PathBuf::from),
            })
            .collect()
    };

    // Default rules follow a relocated shim
    let rewrites = if raw.rewrite.is_empty() {
        default_rewrites(&paths.shim_file)
    } else {
        raw.rewrite
            .into_iter()
            .map(|r| Rewrite::new(r.find, r.replace))
            .collect()
    };

    let config = SnapshotConfig {
        source,
        paths,
        fetch,
        endpoints,
        rewrites,
    };
    config.validate()?;
    Ok(config)
}

impl SnapshotConfig {
    /// Check the configuration before anything touches the network or disk.
    ///
    /// The output directory is deleted at the start of every build, so it
    /// must name a real subdirectory that does not contain the static source.
    pub fn validate(&self) -> Result<()> {
        let base = &self.source.base_url;
        let host = base
            .strip_prefix("http://")
            .or_else(|| base.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.trim_matches('/').is_empty() => {}
            _ => {
                return Err(Error::ConfigParse(format!(
                    "source.base_url must be an http:// or https:// URL, got '{}'",
                    base
                )));
            }
        }

        for (value, field) in [
            (self.source.ready_timeout, "source.ready_timeout_secs"),
            (self.source.probe_timeout, "source.probe_timeout_secs"),
            (self.source.poll_interval, "source.poll_interval_ms"),
            (self.source.request_timeout, "source.request_timeout_secs"),
        ] {
            if value.is_zero() {
                return Err(Error::ConfigParse(format!("{} must be non-zero", field)));
            }
        }

        if self.fetch.concurrency == 0 {
            return Err(Error::ConfigParse(
                "fetch.concurrency must be at least 1".to_string(),
            ));
        }

        self.check_output_dir()?;

        for dir in &self.paths.asset_dirs {
            check_relative(dir, "paths.asset_dirs")?;
        }
        check_relative(&self.paths.shim_file, "paths.shim_file")?;

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoint.path.starts_with('/') {
                return Err(Error::ConfigParse(format!(
                    "endpoint.path must start with '/': '{}'",
                    endpoint.path
                )));
            }
            let file = endpoint.output_file();
            check_relative(&file, "endpoint.file")?;
            if !seen.insert(file.clone()) {
                return Err(Error::ConfigParse(format!(
                    "Two endpoints write the same file: api/{}",
                    file.display()
                )));
            }
        }

        if self.rewrites.iter().any(|r| r.find.is_empty()) {
            return Err(Error::ConfigParse(
                "rewrite.find must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The output directory is removed recursively. Paths are compared in
    /// normalized form so aliases such as `./static` or `site/.` are caught.
    fn check_output_dir(&self) -> Result<()> {
        let output = &self.paths.output_dir;

        if output.components().any(|c| c == Component::ParentDir) {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in 'paths.output_dir': '{}'",
                output.display()
            )));
        }
        if !output
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::ConfigParse(format!(
                "paths.output_dir must name a subdirectory, got '{}'",
                output.display()
            )));
        }

        let static_dir = &self.paths.static_dir;
        let mut contains_static = normalize(static_dir).starts_with(normalize(output));
        // Symlinks only show up once both directories exist
        if let (Ok(static_real), Ok(output_real)) =
            (fs::canonicalize(static_dir), fs::canonicalize(output))
        {
            contains_static |= static_real.starts_with(output_real);
        }
        if contains_static {
            return Err(Error::ConfigParse(format!(
                "paths.output_dir '{}' contains paths.static_dir '{}' and would be deleted by the build",
                output.display(),
                static_dir.display()
            )));
        }

        Ok(())
    }
}

/// Absolute form of `path` with `.` dropped and `..` folded, without
/// touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Check a path that is joined onto the output tree.
///
/// It must be relative, free of `..`, and name at least one entry. The field
/// name is included in the error message.
fn check_relative(path: &Path, field: &str) -> Result<()> {
    let mut named = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(Error::ConfigParse(format!(
                    "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
                    field,
                    path.display()
                )));
            }
            Component::ParentDir => {
                return Err(Error::ConfigParse(format!(
                    "Parent directory references (..) not allowed in '{}': '{}'",
                    field,
                    path.display()
                )));
            }
            Component::Normal(name) => named |= !name.to_string_lossy().trim().is_empty(),
            Component::CurDir => {}
        }
    }

    if !named {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field
        )));
    }

    Ok(())
}
