use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use pagesnap_core::{Endpoint, PathsConfig, Rewrite, SnapshotConfig};
use pagesnap_generator::{INTERCEPT_SHIM, RewriteReport, apply_rewrites};
use pagesnap_origin::{FetchFailure, HttpOrigin, Origin, fetch_json, wait_until_ready};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Command-line overrides for values in snapshot.toml
#[derive(Debug, Default, clap::Args)]
pub struct BuildOverrides {
    /// Base URL of the running server
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory holding css/, js/ and other static files
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Output directory (deleted and recreated on every build)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seconds to wait for the server to become ready
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of API endpoints fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl BuildOverrides {
    pub fn apply(self, config: &mut SnapshotConfig) {
        if let Some(base_url) = self.base_url {
            config.source.base_url = base_url;
        }
        if let Some(static_dir) = self.static_dir {
            config.paths.static_dir = static_dir;
        }
        if let Some(output) = self.output {
            config.paths.output_dir = output;
        }
        if let Some(timeout) = self.timeout {
            config.source.ready_timeout = Duration::from_secs(timeout);
        }
        if let Some(concurrency) = self.concurrency {
            config.fetch.concurrency = concurrency;
        }
    }
}

/// Result of one best-effort step
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Ok,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: &'static str,
    pub status: StepStatus,
}

/// What ended up on disk for an endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// The server's JSON was written
    Saved,
    /// The fetch failed and the placeholder was written instead
    Placeholder(String),
    /// Nothing could be written
    Unwritten(String),
}

#[derive(Debug, Clone)]
pub struct EndpointOutcome {
    pub path: String,
    pub file: PathBuf,
    pub capture: Capture,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub steps: Vec<StepOutcome>,
    pub endpoints: Vec<EndpointOutcome>,
    pub rewrites: RewriteReport,
}

impl BuildReport {
    fn record(&mut self, step: &'static str, result: Result<()>) {
        let status = match result {
            Ok(()) => StepStatus::Ok,
            Err(e) => {
                println!("   ✗ Failed to {}: {:#}", step, e);
                StepStatus::Failed(format!("{:#}", e))
            }
        };
        self.steps.push(StepOutcome { step, status });
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    fn print_summary(&self, output: &Path) {
        let saved = self
            .endpoints
            .iter()
            .filter(|e| e.capture == Capture::Saved)
            .count();
        let failed = self.failed_steps().count();

        println!("{}", "=".repeat(60));
        if failed == 0 {
            println!("✅ Build completed successfully!");
        } else {
            println!("⚠️  Build completed with {} failed step(s)", failed);
            for step in self.failed_steps() {
                if let StepStatus::Failed(message) = &step.status {
                    println!("   ✗ {}: {}", step.step, message);
                }
            }
        }
        println!(
            "   Endpoints: {} of {} captured",
            saved,
            self.endpoints.len()
        );
        println!(
            "   Rewrite rules: {} applied, {} not found",
            self.rewrites.applied(),
            self.rewrites.missed().count()
        );
        for endpoint in &self.endpoints {
            match &endpoint.capture {
                Capture::Saved => {}
                Capture::Placeholder(message) | Capture::Unwritten(message) => println!(
                    "   ⚠ {} ({}): {}",
                    endpoint.path,
                    endpoint.file.display(),
                    message
                ),
            }
        }
        println!("📦 Static site generated in '{}'", output.display());
        println!("{}", "=".repeat(60));
    }
}

/// Snapshot the running server into a static site
pub async fn run(config_path: Option<PathBuf>, overrides: BuildOverrides) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    println!("{}", "=".repeat(60));
    println!("📸 Building static snapshot");
    println!("   Source: {}", config.source.base_url);
    println!("   Static: {}", config.paths.static_dir.display());
    println!("   Output: {}", config.paths.output_dir.display());
    println!("{}", "=".repeat(60));
    println!();

    let origin = HttpOrigin::new(&config.source)?;
    let report = build_snapshot(&config, &origin).await?;
    report.print_summary(&config.paths.output_dir);

    Ok(())
}

/// Run the pipeline against `origin`.
///
/// Only an unready server or an output directory that cannot be recreated
/// abort the build. Every later step is recorded in the report and the
/// pipeline moves on.
pub async fn build_snapshot(config: &SnapshotConfig, origin: &dyn Origin) -> Result<BuildReport> {
    let paths = &config.paths;

    println!("⏳ Waiting for server at {}...", origin.base_url());
    if !wait_until_ready(origin, &config.source).await {
        println!(
            "   ✗ Server failed to start within {}s",
            config.source.ready_timeout.as_secs_f32()
        );
        println!();
        println!("❌ Build failed: Server is not running");
        println!("   Start the server at {} and run the build again", origin.base_url());
        anyhow::bail!(
            "Server at {} did not become ready within {:?}",
            origin.base_url(),
            config.source.ready_timeout
        );
    }
    println!("   ✓ Server is ready!");
    println!();

    create_output_tree(paths).context("Failed to create output directory")?;
    println!();

    let mut report = BuildReport::default();

    println!("📁 Copying static files...");
    report.record("copy static files", copy_static_files(paths));
    println!();

    println!("📄 Capturing main page...");
    report.record("capture main page", capture_main_page(origin, config).await);
    println!();

    println!("🔌 Fetching API endpoints...");
    report.endpoints = snapshot_endpoints(origin, config).await;
    println!();

    println!("🎭 Creating interception script...");
    report.record("write interception script", write_shim(paths));
    println!();

    println!("💉 Rewriting main page...");
    let rewritten = rewrite_index(paths, &config.rewrites).map(|rewrites| {
        report.rewrites = rewrites;
    });
    report.record("rewrite main page", rewritten);
    println!();

    println!("📋 Creating 404 page...");
    report.record("create 404 page", create_error_page(paths));
    println!();

    println!("🚫 Creating {} file...", pagesnap_core::HOST_MARKER_FILE);
    report.record("create host marker", create_host_marker(paths));
    println!();

    Ok(report)
}

/// Delete the output directory and recreate its skeleton
fn create_output_tree(paths: &PathsConfig) -> Result<()> {
    let output = &paths.output_dir;

    if output.exists() {
        println!("🗑  Removing existing {} directory...", output.display());
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to remove {}", output.display()))?;
    }

    println!("📁 Creating {} directory...", output.display());
    fs::create_dir_all(paths.api_dir()).context("Failed to create api directory")?;
    for dir in &paths.asset_dirs {
        let target = output.join(dir);
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
    }
    if let Some(parent) = paths.shim_path().parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    Ok(())
}

/// Copy asset directories recursively, then every top-level file.
///
/// A failed item is reported and the rest are still copied; the step fails
/// if anything was left behind.
fn copy_static_files(paths: &PathsConfig) -> Result<()> {
    let source = &paths.static_dir;
    if !source.is_dir() {
        anyhow::bail!("Static directory not found: {}", source.display());
    }

    let mut failures = Vec::new();

    for dir in &paths.asset_dirs {
        let from = source.join(dir);
        if !from.is_dir() {
            debug!(dir = %from.display(), "asset directory not present, skipping");
            continue;
        }
        match copy_tree(&from, &paths.output_dir.join(dir)) {
            Ok(copied) => println!("   ✓ {} copied ({} files)", dir.display(), copied),
            Err(e) => {
                println!("   ✗ {}: {:#}", dir.display(), e);
                failures.push(dir.display().to_string());
            }
        }
    }

    let mut files: Vec<PathBuf> = fs::read_dir(source)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    files.sort();

    for file in files.iter().filter(|p| p.is_file()) {
        let Some(name) = file.file_name() else {
            continue;
        };
        match fs::copy(file, paths.output_dir.join(name)) {
            Ok(_) => println!("   ✓ {} copied", name.to_string_lossy()),
            Err(e) => {
                println!("   ✗ {}: {}", name.to_string_lossy(), e);
                failures.push(name.to_string_lossy().into_owned());
            }
        }
    }

    if !failures.is_empty() {
        anyhow::bail!("Could not copy {}", failures.join(", "));
    }

    Ok(())
}

/// Copy a directory tree, overwriting existing files. Returns the file count.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(from).follow_links(true).min_depth(1) {
        let entry = entry?;
        let target = to.join(entry.path().strip_prefix(from)?);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Save the root document as served. A failed request leaves no file.
async fn capture_main_page(origin: &dyn Origin, config: &SnapshotConfig) -> Result<()> {
    let page = origin.get("", config.source.request_timeout).await?;
    if !page.is_ok() {
        warn!(status = page.status, "main page answered with non-200 status");
    }

    let target = config.paths.index_file();
    fs::write(&target, &page.body)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("   ✓ Main page saved to {}", target.display());

    Ok(())
}

async fn snapshot_endpoints(origin: &dyn Origin, config: &SnapshotConfig) -> Vec<EndpointOutcome> {
    let api_dir = config.paths.api_dir();
    let api_dir = api_dir.as_path();
    let timeout = config.source.request_timeout;

    stream::iter(&config.endpoints)
        .map(move |endpoint| snapshot_endpoint(origin, endpoint, api_dir, timeout))
        .buffered(config.fetch.concurrency.max(1))
        .collect()
        .await
}

/// Capture one endpoint into `api_dir`.
///
/// Any fetch or parse failure is written as a placeholder so the file always
/// exists; only a failing disk write leaves it absent.
pub async fn snapshot_endpoint(
    origin: &dyn Origin,
    endpoint: &Endpoint,
    api_dir: &Path,
    timeout: Duration,
) -> EndpointOutcome {
    let file = endpoint.output_file();
    let target = api_dir.join(&file);

    println!("   Fetching {}...", endpoint.path);
    let (rendered, capture) = match fetch_json(origin, &endpoint.path, timeout).await {
        Ok(value) => (serde_json::to_string_pretty(&value), Capture::Saved),
        Err(e) => {
            println!("   ✗ Failed to fetch {}: {}", endpoint.path, e);
            let failure = FetchFailure::new(&e);
            let rendered = serde_json::to_string_pretty(&failure);
            (rendered, Capture::Placeholder(failure.error))
        }
    };

    let written = rendered
        .map_err(anyhow::Error::from)
        .and_then(|json| write_file(&target, escape_non_ascii(&json).as_bytes()));

    let capture = match written {
        Ok(()) => {
            if capture == Capture::Saved {
                println!("   ✓ Saved to {}", target.display());
            }
            capture
        }
        Err(e) => {
            println!("   ✗ Failed to write {}: {:#}", target.display(), e);
            Capture::Unwritten(format!("{:#}", e))
        }
    };

    EndpointOutcome {
        path: endpoint.path.clone(),
        file,
        capture,
    }
}

/// Escape every non-ASCII character as `\uXXXX` (UTF-16 units).
///
/// JSON syntax outside strings is pure ASCII, so this only touches string
/// contents and the result parses to the same value.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }

    let mut escaped = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            escaped.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

fn write_shim(paths: &PathsConfig) -> Result<()> {
    let target = paths.shim_path();
    write_file(&target, INTERCEPT_SHIM.as_bytes())?;
    println!("   ✓ Interception script saved to {}", target.display());
    Ok(())
}

fn rewrite_index(paths: &PathsConfig, rules: &[Rewrite]) -> Result<RewriteReport> {
    let index = paths.index_file();
    let html = fs::read_to_string(&index)
        .with_context(|| format!("Failed to read {}", index.display()))?;

    let (html, report) = apply_rewrites(&html, rules);
    for rule in report.missed() {
        debug!(find = %rule.find, "rewrite target not found");
    }

    fs::write(&index, html).with_context(|| format!("Failed to write {}", index.display()))?;
    println!(
        "   ✓ Applied {} of {} rewrite rules",
        report.applied(),
        rules.len()
    );

    Ok(report)
}

/// Copy the rewritten index byte-for-byte to 404.html
fn create_error_page(paths: &PathsConfig) -> Result<()> {
    let target = paths.error_page_file();
    fs::copy(paths.index_file(), &target)
        .with_context(|| format!("Failed to copy index to {}", target.display()))?;
    println!("   ✓ 404 page created at {}", target.display());
    Ok(())
}

fn create_host_marker(paths: &PathsConfig) -> Result<()> {
    let target = paths.marker_file();
    fs::write(&target, b"").with_context(|| format!("Failed to write {}", target.display()))?;
    println!("   ✓ {} created", target.display());
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
