//! Version command

use anyhow::Result;

use crate::cli::VersionArgs;

pub fn run(args: VersionArgs) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    if args.json {
        let payload = serde_json::json!({
            "name": "slipstream",
            "version": version,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("slipstream {version}");
    }

    Ok(())
}
