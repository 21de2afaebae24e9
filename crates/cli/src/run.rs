//! One collection run: session, collection, output.

use cachesnap_client::{
    BrowserOptions, BrowserSession, CacheSnapshotCollector, CacheSource, CollectOptions, DevToolsSource, ScriptSource,
    canonicalize, origin_of,
};
use cachesnap_core::{AppConfig, ConfigError, Error, SnapshotSummary, Surface, write_snapshot};
use url::Url;

/// Collect the target page's caches and write them to `output_path`.
///
/// The browser session is released before this returns, whatever the
/// outcome.
pub async fn run(config: &AppConfig) -> Result<SnapshotSummary, Error> {
    let target = canonicalize(&config.target_url).map_err(|e| invalid_target(&e))?;
    let origin = origin_of(&target).map_err(|e| invalid_target(&e))?;

    let session = BrowserSession::open(&BrowserOptions::from(config)).await?;
    if let Err(e) = session.navigate(&target, config.settle()).await {
        if let Err(release_err) = session.release().await {
            tracing::warn!("failed to release session: {release_err}");
        }
        return Err(e.into());
    }

    let source: Box<dyn CacheSource> = match config.surface {
        Surface::Devtools => Box::new(DevToolsSource::new(session, origin).measure_bodies(config.measure_bodies)),
        Surface::Script => Box::new(ScriptSource::new(session)),
    };

    let collector = CacheSnapshotCollector::new(collect_options(config, &target));
    let snapshot = collector
        .collect_and_release(source.as_ref(), config.timeout())
        .await?;

    write_snapshot(&config.output_path, &snapshot)?;
    Ok(snapshot.summary())
}

fn collect_options(config: &AppConfig, target: &Url) -> CollectOptions {
    CollectOptions {
        page_size: config.page_size,
        path_filter: config.path_filter.clone().filter(|f| !f.is_empty()),
        same_origin: config.same_origin_only.then(|| target.clone()),
    }
}

fn invalid_target(err: &dyn std::fmt::Display) -> ConfigError {
    ConfigError::Invalid { field: "target_url".into(), reason: err.to_string() }
}
