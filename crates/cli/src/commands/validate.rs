use anyhow::Result;
use pagesnap_validator::validate_snapshot;
use std::path::PathBuf;

/// Check a built snapshot against the configuration
pub async fn run(path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let root = path.unwrap_or_else(|| config.paths.output_dir.clone());

    println!("🔍 Validating snapshot at: {}", root.display());

    let report = validate_snapshot(&root, &config);

    for info in &report.info {
        println!("   {}", info);
    }
    for warning in &report.warnings {
        println!("   ⚠ {}", warning);
    }
    for error in &report.errors {
        println!("   ✗ {}", error);
    }

    if !report.is_ok() {
        anyhow::bail!("Snapshot has {} error(s)", report.errors.len());
    }

    println!("✓ Snapshot valid");
    Ok(())
}
