//! Download command

use std::path::Path;

use anyhow::Result;

use crate::cli::DownloadArgs;
use crate::output;

pub async fn run(_args: DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let manager = super::manager_for(config_path)?;
    let info = manager.check_for_update().await?;

    if info.is_up_to_date() {
        output::success("already up to date, nothing to download");
        return Ok(());
    }

    let bar = output::percent_bar("downloading");
    manager
        .download_releases(&info, super::bar_progress(&bar))
        .await?;
    bar.finish_and_clear();

    output::success(&format!(
        "downloaded {} package(s) for {}",
        info.releases_to_apply.len(),
        info.future_release.version
    ));
    Ok(())
}
