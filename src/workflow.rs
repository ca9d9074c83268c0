//! Command handlers wiring config, lock, dataset and pipeline together.
use crate::cli::{RunArgs, StatusArgs};
use crate::config::{self, ConfigOverrides, EnrichConfig, ResolvedConfig};
use crate::history::{self, RunHistoryEntry, RunReport, HISTORY_SCHEMA_VERSION};
use crate::http::HttpClient;
use crate::inspector::HttpImageInspector;
use crate::pipeline::{
    install_interrupt_handler, validate_range, EnrichmentPipeline, PipelineOptions, RunStatus,
    RunSummary,
};
use crate::search::FallbackChain;
use crate::status::DatasetStatus;
use crate::store::{self, now_epoch_ms, DatasetLock, JsonFileStore};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

pub fn run_enrich(args: RunArgs) -> Result<()> {
    let started_at_epoch_ms = now_epoch_ms();
    let result = load_settings(&args).and_then(|settings| {
        let summary = enrich_dataset(&args, &settings)?;
        Ok((settings, summary))
    });

    if let Some(path) = args.history.as_deref() {
        let finished_at_epoch_ms = now_epoch_ms();
        let entry = match &result {
            Ok((_, summary)) => RunHistoryEntry::completed(
                &args.dataset,
                started_at_epoch_ms,
                finished_at_epoch_ms,
                summary,
            ),
            Err(err) => RunHistoryEntry::failed(
                &args.dataset,
                started_at_epoch_ms,
                finished_at_epoch_ms,
                error_chain_message(err),
            ),
        };
        if let Err(err) = history::append_history(path, &entry) {
            tracing::warn!(
                history = %path.display(),
                error = %error_chain_message(&err),
                "run history not recorded"
            );
        }
    }
    let (settings, summary) = result?;

    if let Some(path) = args.report.as_deref() {
        let report = RunReport {
            schema_version: HISTORY_SCHEMA_VERSION,
            generated_at_epoch_ms: now_epoch_ms(),
            dataset: args.dataset.clone(),
            providers: settings
                .providers
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            summary: summary.clone(),
        };
        history::write_report(path, &report)?;
        if args.verbose {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
        println!("{text}");
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

fn load_settings(args: &RunArgs) -> Result<ResolvedConfig> {
    let file_config = match args.config.as_deref() {
        Some(path) => {
            let loaded = config::load_config(path)?;
            config::validate_config(&loaded)
                .with_context(|| format!("invalid config {}", path.display()))?;
            loaded
        }
        None => EnrichConfig::default(),
    };
    let overrides = ConfigOverrides {
        providers: args.providers.clone(),
        max_candidates: args.max_candidates,
        timeout_secs: args.timeout_secs,
    };
    config::resolve(&file_config, &overrides)
}

fn enrich_dataset(args: &RunArgs, settings: &ResolvedConfig) -> Result<RunSummary> {
    let range = validate_range(args.start, args.end, store::load(&args.dataset)?.len())?;
    let _lock = DatasetLock::acquire(&args.dataset, args.force_unlock)?;
    // Reload under the lock; a run that finished in between may have written.
    let mut records = store::load(&args.dataset)?;
    let range = validate_range(*range.start(), Some(*range.end()), records.len())?;
    tracing::info!(
        dataset = %args.dataset.display(),
        records = records.len(),
        providers = ?settings.providers,
        max_candidates = settings.max_candidates,
        "dataset loaded"
    );

    let client = HttpClient::new(
        Duration::from_secs(settings.timeout_secs),
        &settings.user_agent,
    );
    let provider = FallbackChain::from_kinds(&settings.providers, &client);
    let inspector = HttpImageInspector::new(client);
    let store = JsonFileStore::new(&args.dataset);
    let cancel = install_interrupt_handler();

    let mut pipeline = EnrichmentPipeline::new(provider, inspector, store, cancel).with_options(
        PipelineOptions {
            max_candidates: settings.max_candidates,
            backfill_colors: args.backfill_colors,
        },
    );
    let summary = pipeline
        .run(&mut records, *range.start(), *range.end())
        .with_context(|| format!("enrich {}", args.dataset.display()))?;
    Ok(summary)
}

fn render_summary(summary: &RunSummary) -> String {
    let mut text = format!(
        "{}: {} found, {} lost over records {}..={} ({} written)\n",
        summary.status, summary.found, summary.lost, summary.start, summary.end, summary.writes
    );
    if summary.backfilled > 0 {
        text.push_str(&format!("colors backfilled: {}\n", summary.backfilled));
    }
    if summary.status == RunStatus::Interrupted {
        text.push_str(&format!(
            "resume with --start {}\n",
            summary.last_index.max(summary.start - 1) + 1
        ));
    }
    text
}

pub fn run_status(args: StatusArgs) -> Result<()> {
    let status = dataset_status(&args.dataset)?;
    if args.json {
        let text = serde_json::to_string_pretty(&status).context("serialize status")?;
        println!("{text}");
    } else {
        print!("{}", status.render_text());
    }
    Ok(())
}

fn dataset_status(dataset: &Path) -> Result<DatasetStatus> {
    let records = store::load(dataset)?;
    let mut status = DatasetStatus::from_records(dataset.to_path_buf(), &records);
    status.locked_by_pid = DatasetLock::inspect(dataset).map(|info| info.pid);
    Ok(status)
}

fn error_chain_message(err: &anyhow::Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
