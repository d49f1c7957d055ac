mod auth;
mod config;
mod db;
mod error;
mod media;
mod models;
mod page;
mod pipeline;
mod scrape;
#[cfg(test)]
mod testing;

use config::Config;
use db::Repository;
use error::{AppError, Result};
use media::HttpFetcher;
use page::ChromePage;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (progress for this crate, warnings for dependencies)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
                .add_directive("creator_archiver=info".parse().map_err(anyhow::Error::from)?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = Config::load()?;

    if config.authors.is_empty() {
        tracing::warn!(
            "No authors configured; add [[authors]] entries to {:?}",
            Config::config_path()
        );
        return Ok(());
    }

    let credentials = config.credentials.clone().ok_or_else(|| {
        AppError::Config(format!(
            "Missing [credentials] in {:?}",
            Config::config_path()
        ))
    })?;

    let repository = Repository::new(&config.db_path).await?;
    let fetcher = HttpFetcher::new(&config.browser.user_agent, config.timing.download_timeout())?;
    let page = ChromePage::launch(&config.browser).await?;

    match auth::login(&page, &credentials, &config).await {
        Ok(()) => {}
        Err(AppError::LoginTimeout(timeout)) => {
            tracing::error!("Login was not confirmed within {:?}, giving up", timeout);
            page.close().await;
            return Ok(());
        }
        Err(e) => {
            page.close().await;
            return Err(e);
        }
    }

    let report = Pipeline::new(&page, &repository, &fetcher, &config).run().await;
    tracing::info!(
        "Done: {} author(s), {} post(s) processed, {} failed, {} file(s) downloaded",
        report.authors,
        report.posts_processed,
        report.posts_failed,
        report.media_downloaded
    );

    page.close().await;
    Ok(())
}
