//! Cache management CLI commands.

use clap::Subcommand;
use gallerystream::cache::{DiskEntryStore, EntryStore};
use gallerystream::config::{format_size, ConfigFile};

use crate::error::CliError;
use crate::runner::runtime;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the disk cache, removing all cached images
    Clear,
    /// Show disk cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let cache_dir = &config.cache.directory;
    let store =
        DiskEntryStore::open(cache_dir).map_err(|e| CliError::CacheOpen(e.to_string()))?;
    let rt = runtime()?;

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", cache_dir.display());

            let result = rt.block_on(async {
                let before = store.stats().await?;
                store.clear().await?;
                Ok::<_, gallerystream::cache::CacheError>(before)
            });
            match result {
                Ok(before) => {
                    println!(
                        "Deleted {} entries, freed {}",
                        before.entry_count,
                        format_size(before.size_bytes as usize)
                    );
                    Ok(())
                }
                Err(e) => Err(CliError::CacheClear(e.to_string())),
            }
        }
        CacheAction::Stats => {
            println!("Disk cache: {}", cache_dir.display());

            let result = rt.block_on(async {
                let stats = store.stats().await?;
                let version = store.read_version().await?;
                Ok::<_, gallerystream::cache::CacheError>((stats, version))
            });
            match result {
                Ok((stats, version)) => {
                    println!("  Entries: {}", stats.entry_count);
                    println!("  Size:    {}", format_size(stats.size_bytes as usize));
                    println!(
                        "  Version: {}",
                        version.as_deref().unwrap_or("(not initialized)")
                    );
                    if version.as_deref() != Some(config.cache.version.as_str()) {
                        println!(
                            "  Note: will be wiped on next start (expected version {})",
                            config.cache.version
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(CliError::CacheStats(e.to_string())),
            }
        }
    }
}
