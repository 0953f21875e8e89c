use std::path::PathBuf;

use clap::Parser;

use rsl_fetch_browser::ViewerSession;
use rsl_fetch_core::config::Config;
use rsl_fetch_core::download::{DownloadOptions, Downloader, PageLimit, RunSummary};
use rsl_fetch_core::types::BookId;

mod logging;

#[derive(Parser)]
#[command(
    name = "rsl-fetch",
    about = "Download page images of a digitized book from the RSL online viewer",
    version
)]
struct Cli {
    /// Viewer URL of the book (must contain an rsl<digits> ID)
    url: String,

    /// Maximum number of pages to download (default: 20)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Download every page the viewer lists (stops early on repeated failures)
    #[arg(long)]
    all: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    show_browser: bool,

    /// Directory to create the book folder in (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to the Chrome/Chromium binary
    #[arg(long)]
    chrome_path: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn page_limit(&self, default_pages: usize) -> PageLimit {
        if self.all {
            PageLimit::All
        } else {
            PageLimit::Count(self.pages.map(|p| p as usize).unwrap_or(default_pages))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let mut config = Config::load(&config_path)?;

    logging::init(config.logging.as_ref(), cli.verbose)?;

    // Command-line flags override the config file
    let mut browser = config.browser();
    if cli.show_browser {
        browser.headless = false;
    }
    if let Some(path) = &cli.chrome_path {
        browser.chrome_path = Some(path.clone());
    }
    config.browser = Some(browser);

    let (warnings, errors) = config.validate();
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    if !errors.is_empty() {
        anyhow::bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }

    let Some(book_id) = BookId::from_url(&cli.url) else {
        println!("Could not extract a book ID from URL: {}", cli.url);
        return Ok(());
    };

    let fetch = config.fetch();
    let limit = cli.page_limit(fetch.default_pages);
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| config.output_dir());

    tracing::info!(book_id = %book_id, ?limit, dir = %output_dir.join(book_id.as_str()).display(), "Starting download");

    let session = ViewerSession::launch(&config.browser(), book_id.clone(), fetch.viewer_base.clone()).await?;
    let options = DownloadOptions::from_config(&fetch, limit, output_dir);
    let summary = Downloader::new(session, book_id, options).run().await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.saved == 0 {
        println!("No images could be extracted for {}", summary.book_id);
        return;
    }

    println!("Done: saved {} images", summary.saved);
    println!("Folder: {}", summary.dir.display());
    println!("Size: {:.1} MB", summary.bytes_written as f64 / (1024.0 * 1024.0));

    if let Some(info) = &summary.info {
        if let Some(title) = &info.title {
            println!("Book: {title}");
            if let Some(author) = &info.author {
                println!("Author: {author}");
            }
            println!("Description saved to description.txt");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_limit() {
        let cli = Cli::try_parse_from(["rsl-fetch", "https://viewer.rsl.ru/ru/rsl01001234567"]).unwrap();
        assert_eq!(cli.page_limit(20), PageLimit::Count(20));
        assert!(!cli.show_browser);
    }

    #[test]
    fn test_pages_flag() {
        let cli = Cli::try_parse_from(["rsl-fetch", "rsl1", "--pages", "10"]).unwrap();
        assert_eq!(cli.page_limit(20), PageLimit::Count(10));
    }

    #[test]
    fn test_all_flag_wins() {
        let cli = Cli::try_parse_from(["rsl-fetch", "rsl1", "--pages", "10", "--all"]).unwrap();
        assert_eq!(cli.page_limit(20), PageLimit::All);
    }

    #[test]
    fn test_zero_pages_rejected() {
        assert!(Cli::try_parse_from(["rsl-fetch", "rsl1", "--pages", "0"]).is_err());
    }

    #[test]
    fn test_url_required() {
        assert!(Cli::try_parse_from(["rsl-fetch", "--all"]).is_err());
    }

    #[test]
    fn test_show_browser_and_output_dir() {
        let cli = Cli::try_parse_from(["rsl-fetch", "rsl1", "--show-browser", "-o", "books"]).unwrap();
        assert!(cli.show_browser);
        assert_eq!(cli.output_dir, Some(PathBuf::from("books")));
    }
}
