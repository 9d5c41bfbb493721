//! Cache command - inspect cached artifact sets

use crate::cache::{format_bytes, ArtifactStore, CacheEntry, CacheState};
use crate::catalog::Catalog;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::LogprepResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> LogprepResult<()> {
    match args.action {
        CacheAction::List { dataset, format } => list_caches(config, dataset, format).await,
    }
}

/// List cache entries for one dataset or all of them
async fn list_caches(
    config: &Config,
    dataset: Option<String>,
    format: OutputFormat,
) -> LogprepResult<()> {
    let storage = &config.storage;
    let catalog = Catalog::new(&storage.data_dir, config.defaults.clone());
    let store = ArtifactStore::new(&storage.data_dir, storage.artifact_extension.clone());

    let datasets = match dataset {
        Some(name) => vec![catalog.locate(&name).await?.name],
        None => catalog.datasets().await?,
    };

    let mut caches = Vec::new();
    for name in &datasets {
        caches.extend(store.list_entries(name).await?);
    }

    if caches.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cached artifacts found");
            }
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_cache_table(&caches),
        OutputFormat::Json => print_cache_json(&caches)?,
        OutputFormat::Plain => print_cache_plain(&caches),
    }

    Ok(())
}

fn print_cache_table(caches: &[CacheEntry]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Cached artifacts");

    println!(
        "{:<20} {:<6} {:<34} {:<10} {:<10} {:<17}",
        style("DATASET").bold(),
        style("MIN").bold(),
        style("FINGERPRINT").bold(),
        style("STATE").bold(),
        style("SIZE").bold(),
        style("MODIFIED").bold()
    );
    println!("{}", "-".repeat(100));

    for cache in caches {
        let state_display = match cache.state() {
            CacheState::Complete => style("complete").green().to_string(),
            CacheState::Partial => style("partial").yellow().to_string(),
        };
        let modified = cache
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<20} {:<6} {:<34} {:<10} {:<10} {:<17}",
            cache.dataset,
            cache.min_suffix,
            cache.fingerprint,
            state_display,
            format_bytes(cache.size_bytes),
            modified
        );
    }

    println!();
    let total: u64 = caches.iter().map(|c| c.size_bytes).sum();
    println!(
        "Total: {} cache(s), {}",
        caches.len(),
        format_bytes(total)
    );
}

fn print_cache_json(caches: &[CacheEntry]) -> LogprepResult<()> {
    #[derive(serde::Serialize)]
    struct CacheJson<'a> {
        dataset: &'a str,
        result_name: &'a str,
        min_suffix: u32,
        fingerprint: String,
        state: CacheState,
        kinds: Vec<&'static str>,
        size_bytes: u64,
        modified: Option<String>,
    }

    let json: Vec<CacheJson> = caches
        .iter()
        .map(|c| CacheJson {
            dataset: &c.dataset,
            result_name: &c.result_name,
            min_suffix: c.min_suffix,
            fingerprint: c.fingerprint.to_hex(),
            state: c.state(),
            kinds: c.kinds.iter().map(|k| k.label()).collect(),
            size_bytes: c.size_bytes,
            modified: c.modified.map(|m| m.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_cache_plain(caches: &[CacheEntry]) {
    for cache in caches {
        println!(
            "{}\t{}\t{}\t{}",
            cache.dataset,
            cache.min_suffix,
            cache.fingerprint,
            cache.state()
        );
    }
}
