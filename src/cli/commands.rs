//! CLI command implementations

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::cli::args::ConfigCommand;
use crate::config::Settings;
use crate::embedding::build_embedding_provider;
use crate::segment::SemanticSegmenter;
use crate::summary::SummaryPipeline;
use crate::RecapError;

/// Summarize a transcript file (or stdin) and print or save the result
pub async fn summarize_transcript(
    settings: &Settings,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    percentile: Option<f64>,
) -> Result<()> {
    let transcript = read_transcript(input.as_deref())?;
    let settings = with_percentile(settings, percentile);

    let pipeline = SummaryPipeline::from_settings(&settings)?.with_progress(Box::new(
        |step, total| {
            eprintln!("Summarized chunk {}/{}", step, total);
        },
    ));

    let cancel = CancellationToken::new();
    let watcher = spawn_ctrl_c_watcher(cancel.clone());
    let result = pipeline.run(&transcript, &cancel).await;
    watcher.abort();

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            report_partial(&err);
            return Err(err.into());
        }
    };

    match output {
        Some(path) => {
            write_output(&path, &summary.text)?;
            println!(
                "Summary of {} chunk(s) written to: {}",
                summary.chunk_count,
                path.display()
            );
        }
        None => println!("{}", summary.text),
    }

    Ok(())
}

/// Print the chunks a transcript would be summarized in
pub async fn show_chunks(
    settings: &Settings,
    input: Option<PathBuf>,
    percentile: Option<f64>,
) -> Result<()> {
    let transcript = read_transcript(input.as_deref())?;
    let settings = with_percentile(settings, percentile);
    settings.validate()?;

    let embedder = build_embedding_provider(&settings)?;
    let chunks = SemanticSegmenter::from_settings(&settings)
        .segment(&transcript, embedder.as_ref())
        .await?;

    println!("{} chunk(s)", chunks.len());
    for chunk in &chunks {
        println!();
        println!(
            "== Chunk {} (sentences {}-{}, {} chars) ==",
            chunk.index + 1,
            chunk.spans.start + 1,
            chunk.spans.end,
            chunk.text.chars().count()
        );
        println!("{}", chunk.text);
    }

    Ok(())
}

/// Configuration commands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(&redacted(settings))?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
        ConfigCommand::Set { key, value } => {
            let path = Settings::config_path()?;
            // Start from the file itself so env overrides are not persisted.
            let current = if path.exists() {
                Settings::load_from(&path)?
            } else {
                Settings::default()
            };

            let updated = current.with_value(&key, &value)?;
            updated.validate()?;
            updated.write_to(&path)?;
            println!("Set {} = {} in {}", key, value, path.display());
        }
    }

    Ok(())
}

fn read_transcript(input: Option<&Path>) -> Result<String> {
    let transcript = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript: {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read transcript from stdin")?;
            buf
        }
    };

    if transcript.trim().is_empty() {
        anyhow::bail!("No transcript available: input is empty");
    }
    Ok(transcript)
}

fn with_percentile(settings: &Settings, percentile: Option<f64>) -> Settings {
    let mut settings = settings.clone();
    if let Some(p) = percentile {
        settings.segmenter.threshold_percentile = p;
    }
    settings
}

fn spawn_ctrl_c_watcher(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current chunk...");
            cancel.cancel();
        }
    })
}

fn report_partial(err: &RecapError) {
    if let Some(partial) = err.partial_summary() {
        eprintln!("Partial summary (incomplete):");
        eprintln!();
        eprintln!("{}", partial);
        eprintln!();
    }
}

fn write_output(path: &Path, summary: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", summary))
        .with_context(|| format!("Failed to write summary: {}", path.display()))
}

fn redacted(settings: &Settings) -> Settings {
    let mut settings = settings.clone();
    for key in [&mut settings.llm.api_key, &mut settings.embedding.api_key] {
        if !key.is_empty() {
            *key = "********".to_string();
        }
    }
    settings
}
