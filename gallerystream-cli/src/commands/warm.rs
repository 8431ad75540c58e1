//! Warm command - fetch image URLs into the disk cache.
//!
//! Runs a real streaming session so downloads go through the same queues,
//! concurrency limits and failure handling a gallery would use.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::warn;

use gallerystream::cache::DiskEntryStore;
use gallerystream::config::format_size;
use gallerystream::fetch::HttpFetcher;
use gallerystream::quality::QualityTier;
use gallerystream::session::StreamingSession;

use crate::error::CliError;
use crate::runner::{runtime, CliRunner};

/// Arguments for the warm command.
#[derive(Debug, Args)]
pub struct WarmArgs {
    /// Image URLs to fetch
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line
    #[arg(short = 'f', long)]
    from_file: Option<PathBuf>,

    /// Quality tier the URLs belong to (thumbnail, medium, high)
    #[arg(short, long, default_value = "thumbnail")]
    tier: QualityTier,
}

/// Collects URLs from arguments and the optional list file.
fn collect_urls(args: &WarmArgs) -> Result<Vec<String>, CliError> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.from_file {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read URL list {}: {}", path.display(), e))
        })?;
        urls.extend(parse_url_list(&contents));
    }
    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    Ok(urls)
}

/// One URL per line; blank lines and `#` comments are skipped.
fn parse_url_list(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Run the warm command.
pub fn run(args: WarmArgs, verbose: bool) -> Result<(), CliError> {
    let urls = collect_urls(&args)?;
    if urls.is_empty() {
        return Err(CliError::Config(
            "No URLs given. Pass URLs as arguments or use --from-file.".to_string(),
        ));
    }

    let runner = CliRunner::new(verbose)?;
    runner.log_startup("warm");
    let config = runner.config();

    let streaming = config
        .to_streaming_config()
        .map_err(|e| CliError::Config(e.to_string()))?;
    let store = DiskEntryStore::open(&config.cache.directory)
        .map_err(|e| CliError::CacheOpen(e.to_string()))?;
    let fetcher = HttpFetcher::with_timeout(config.fetch_timeout())
        .map_err(|e| CliError::Config(e.to_string()))?;

    println!(
        "Warming {} {} image(s) into {}",
        urls.len(),
        args.tier,
        config.cache.directory.display()
    );

    let rt = runtime()?;
    rt.block_on(async {
        let session =
            StreamingSession::start(streaming, Arc::new(store), Arc::new(fetcher)).await?;

        let progress = ProgressBar::new(urls.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .map_err(|e| CliError::Config(e.to_string()))?
                .progress_chars("=> "),
        );

        let mut loads = JoinSet::new();
        for url in &urls {
            let load = session.load(url, args.tier);
            let url = url.clone();
            loads.spawn(async move { (url, load.await) });
        }

        let mut warmed = 0usize;
        let mut failed = 0usize;
        let mut bytes = 0usize;
        while let Some(joined) = loads.join_next().await {
            match joined {
                Ok((_, Ok(resource))) => {
                    warmed += 1;
                    bytes += resource.len();
                }
                Ok((url, Err(e))) => {
                    failed += 1;
                    progress.println(format!("  failed: {} ({})", url, e));
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "Warm task aborted");
                }
            }
            progress.inc(1);
        }
        progress.finish_with_message("done");

        session.shutdown().await;
        let stats = session
            .cache()
            .stats()
            .await
            .map_err(|e| CliError::CacheStats(e.to_string()))?;

        println!();
        println!("Warm Summary");
        println!("────────────");
        println!("  Warmed:        {} ({} failed)", warmed, failed);
        println!("  Cache hits:    {}", stats.hits);
        println!("  Transferred:   {}", format_size(bytes));
        println!(
            "  Cache size:    {} in {} entries",
            format_size(stats.size_bytes as usize),
            stats.entry_count
        );

        if warmed == 0 {
            return Err(CliError::Warm(format!("all {} URLs failed", failed)));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list_skips_comments_and_blanks() {
        let contents = "# gallery A\nhttps://a/t.webp\n\n  https://a/m.webp  \n#https://skip\n";
        let urls: Vec<String> = parse_url_list(contents).collect();
        assert_eq!(urls, vec!["https://a/t.webp", "https://a/m.webp"]);
    }

    #[test]
    fn test_collect_urls_merges_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, "https://a/2.webp\n").unwrap();

        let args = WarmArgs {
            urls: vec!["https://a/1.webp".to_string()],
            from_file: Some(list),
            tier: QualityTier::Thumbnail,
        };
        assert_eq!(
            collect_urls(&args).unwrap(),
            vec!["https://a/1.webp", "https://a/2.webp"]
        );
    }

    #[test]
    fn test_missing_url_file() {
        let args = WarmArgs {
            urls: vec![],
            from_file: Some(PathBuf::from("/nonexistent/urls.txt")),
            tier: QualityTier::Medium,
        };
        assert!(matches!(collect_urls(&args), Err(CliError::Config(_))));
    }
}
