//! Config CLI command

use crate::config::paths::SyncPaths;
use crate::config::settings::Settings;
use crate::error::SyncResult;

/// Show resolved paths and settings, optionally writing a default file
pub fn handle_config_command(
    paths: &SyncPaths,
    settings: &Settings,
    init: bool,
) -> SyncResult<()> {
    if init {
        if paths.is_configured() {
            println!(
                "Settings file already exists: {}",
                paths.settings_file().display()
            );
        } else {
            settings.save(paths)?;
            println!("Wrote default settings to {}", paths.settings_file().display());
            println!("Set graph_path, remote_url and recipients before the first backup.");
        }
        println!();
    }

    println!("cryptsync Configuration");
    println!("=======================");
    println!("Home directory:  {}", paths.base_dir().display());
    println!("Settings file:   {}", paths.settings_file().display());
    println!("Logs directory:  {}", paths.logs_dir().display());
    println!("Lock directory:  {}", paths.lock_dir().display());
    println!();
    println!("Settings:");
    println!(
        "  Graph path:    {}",
        settings
            .graph_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!(
        "  Remote URL:    {}",
        settings.remote_url.as_deref().unwrap_or("(not set)")
    );
    if settings.recipients.is_empty() {
        println!("  Recipients:    (none)");
    } else {
        println!("  Recipients:    {}", settings.recipients.join(", "));
    }
    println!("  Remote name:   {}", settings.remote_name);
    println!("  Branch:        {}", settings.branch);
    println!(
        "  Author:        {} <{}>",
        settings.author_name, settings.author_email
    );
    println!(
        "  Log retention: {} day(s)",
        settings.log_retention.max_age_days
    );

    if let Err(err) = settings.to_context(paths) {
        println!();
        println!("Not ready for backup: {}", err);
    }

    Ok(())
}
