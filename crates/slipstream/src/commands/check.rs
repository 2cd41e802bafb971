//! Check command

use std::path::Path;

use anyhow::Result;

use crate::cli::CheckArgs;
use crate::output;

pub async fn run(args: CheckArgs, config_path: Option<&Path>) -> Result<()> {
    let manager = super::manager_for(config_path)?;
    let info = manager.check_for_update().await?;

    if args.json {
        let payload = serde_json::json!({
            "installed": info
                .currently_installed
                .as_ref()
                .map(|e| e.version.to_string()),
            "available": info.future_release.version.to_string(),
            "up_to_date": info.is_up_to_date(),
            "packages": info
                .releases_to_apply
                .iter()
                .map(|e| e.filename.clone())
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    match info.currently_installed.as_ref() {
        Some(local) => output::kv("installed", &local.version.to_string()),
        None => output::kv("installed", "none"),
    }

    if info.is_up_to_date() {
        output::success("already up to date");
    } else {
        output::info(&format!(
            "update available: {} ({} package(s) to download)",
            info.future_release.version,
            info.releases_to_apply.len()
        ));
        for entry in &info.releases_to_apply {
            output::kv(&entry.filename, &format!("{} bytes", entry.file_size));
        }
    }

    Ok(())
}
