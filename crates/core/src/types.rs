use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root document written into the output tree
pub const INDEX_FILE: &str = "index.html";
/// Fallback page the static host serves for unknown paths
pub const ERROR_PAGE_FILE: &str = "404.html";
/// Empty marker that turns off the host's template preprocessing
pub const HOST_MARKER_FILE: &str = ".nojekyll";
/// Directory holding captured API responses
pub const API_DIR: &str = "api";

/// Complete snapshot configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub source: SourceConfig,
    pub paths: PathsConfig,
    pub fetch: FetchConfig,
    pub endpoints: Vec<Endpoint>,
    pub rewrites: Vec<Rewrite>,
}

/// The running server being snapshotted
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub base_url: String,
    /// Overall budget for the readiness wait
    pub ready_timeout: Duration,
    /// Per-attempt timeout while polling for readiness
    pub probe_timeout: Duration,
    /// Fixed sleep between readiness attempts
    pub poll_interval: Duration,
    /// Timeout for the page and API captures
    pub request_timeout: Duration,
}

impl SourceConfig {
    /// Absolute URL for a path on the source server.
    ///
    /// An empty path addresses the base URL itself.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Subdirectories of `static_dir` copied recursively
    pub asset_dirs: Vec<PathBuf>,
    /// Where the interception shim lands, relative to `output_dir`
    pub shim_file: PathBuf,
}

impl PathsConfig {
    pub fn api_dir(&self) -> PathBuf {
        self.output_dir.join(API_DIR)
    }

    pub fn index_file(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILE)
    }

    pub fn error_page_file(&self) -> PathBuf {
        self.output_dir.join(ERROR_PAGE_FILE)
    }

    pub fn marker_file(&self) -> PathBuf {
        self.output_dir.join(HOST_MARKER_FILE)
    }

    pub fn shim_path(&self) -> PathBuf {
        self.output_dir.join(&self.shim_file)
    }
}

/// API capture settings
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Number of endpoint fetches in flight at once (1 = strictly sequential)
    pub concurrency: usize,
}

/// An API path captured into `api/`
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub path: String,
    /// Explicit output filename; derived from `path` when absent
    pub file: Option<PathBuf>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn with_file(path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Some(file.into()),
        }
    }

    /// Filename under `api/` that receives this endpoint's JSON
    pub fn output_file(&self) -> PathBuf {
        match &self.file {
            Some(file) => file.clone(),
            None => PathBuf::from(derive_api_filename(&self.path)),
        }
    }
}

/// Derive an output filename from an endpoint path.
///
/// Every `/api/` segment is dropped, remaining slashes become underscores and
/// `.json` is appended: `/api/profiles/list` → `profiles_list.json`.
pub fn derive_api_filename(path: &str) -> String {
    format!("{}.json", path.replace("/api/", "").replace('/', "_"))
}

/// A literal substring substitution applied to the captured root document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub find: String,
    pub replace: String,
}

impl Rewrite {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

/// Script tag inserted into the document head for a given shim location
pub fn shim_script_tag(shim_file: &Path) -> String {
    let src = shim_file.to_string_lossy().replace('\\', "/");
    format!("<script src=\"./{}\"></script>", src)
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let paths = PathsConfig {
            static_dir: PathBuf::from("static"),
            output_dir: PathBuf::from("build"),
            asset_dirs: vec![PathBuf::from("css"), PathBuf::from("js")],
            shim_file: PathBuf::from("js/demo-mode.js"),
        };
        let rewrites = default_rewrites(&paths.shim_file);

        Self {
            source: SourceConfig {
                base_url: "http://localhost:8765".to_string(),
                ready_timeout: Duration::from_secs(30),
                probe_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(1000),
                request_timeout: Duration::from_secs(10),
            },
            paths,
            fetch: FetchConfig { concurrency: 1 },
            endpoints: default_endpoints(),
            rewrites,
        }
    }
}

/// Endpoints captured when the config names none
pub fn default_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::with_file("/api/check-adb", "check-adb.json"),
        Endpoint::with_file("/api/devices", "devices.json"),
        Endpoint::with_file("/api/categories", "categories.json"),
    ]
}

/// Rewrite rules applied when the config names none, in application order
pub fn default_rewrites(shim_file: &Path) -> Vec<Rewrite> {
    vec![
        Rewrite::new(r#"href="/static/css/style.css""#, r#"href="./css/style.css""#),
        Rewrite::new(r#"src="/static/js/app.js""#, r#"src="./js/app.js""#),
        Rewrite::new(
            "</head>",
            format!("    {}\n</head>", shim_script_tag(shim_file)),
        ),
        Rewrite::new("<title>adb-turbo", "<title>adb-turbo (Demo)"),
        Rewrite::new(
            r#"<meta name="description" content="A friendly web-based tool for Android performance optimization via ADB. 43 commands across 13 categories.">"#,
            r#"<meta name="description" content="Demo: A friendly web-based tool for Android performance optimization via ADB. 43 commands across 13 categories. Run locally for full functionality.">"#,
        ),
    ]
}
