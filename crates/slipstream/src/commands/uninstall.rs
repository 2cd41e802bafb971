//! Uninstall command

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

use crate::cli::UninstallArgs;
use crate::output;

pub async fn run(args: UninstallArgs, config_path: Option<&Path>) -> Result<()> {
    let manager = super::manager_for(config_path)?;
    let root = manager.config().root_dir.clone();

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove {} and all installed versions?",
                root.display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("uninstall cancelled");
            return Ok(());
        }
    }

    manager.full_uninstall().await?;
    output::success(&format!("removed {}", root.display()));
    Ok(())
}
