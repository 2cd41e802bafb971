//! Apply command

use std::path::Path;

use anyhow::Result;

use crate::cli::ApplyArgs;
use crate::output;

pub async fn run(args: ApplyArgs, config_path: Option<&Path>) -> Result<()> {
    let manager = super::manager_for(config_path)?;
    let info = manager.check_for_update().await?;

    if !info.is_up_to_date() {
        let bar = output::percent_bar("downloading");
        manager
            .download_releases(&info, super::bar_progress(&bar))
            .await?;
        bar.finish_and_clear();
    }

    let bar = output::percent_bar("installing");
    let version = manager
        .apply_releases(&info, args.silent, super::bar_progress(&bar))
        .await?;
    bar.finish_and_clear();

    output::success(&format!("now on version {version}"));
    Ok(())
}
