//! aigis-patcher binary entry point.
//!
//! A thin wrapper around the aigis-patcher library that parses arguments,
//! initializes logging and runs one subcommand.

use aigis_formats::{PatchContext, TranslationSource, legacy, patch, serialize};
use aigis_patcher::{Cli, Command, DirectorySource, Summary, verify_bytes};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.validate()?;

    match &cli.command {
        Command::Inspect { file, json } => inspect(&cli, file, *json).await,
        Command::Patch {
            input,
            output,
            translations,
            ..
        } => run_patch(&cli, input, output, translations).await,
        Command::DecodeXml { input, output } => decode_xml(input, output.as_deref()).await,
        Command::Verify { files } => verify(&cli, files).await,
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn inspect(cli: &Cli, file: &Path, json: bool) -> Result<()> {
    let data = read(file).await?;
    let object = aigis_formats::parse_with(&data, &cli.parse_options())
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let summary = Summary::of(&object);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

async fn run_patch(cli: &Cli, input: &Path, output: &Path, translations: &Path) -> Result<()> {
    let name = cli.command.patch_name()?;
    let policy = cli.command.failure_policy();
    let data = read(input).await?;

    let source: Arc<dyn TranslationSource> = Arc::new(DirectorySource::new(translations));
    let context = PatchContext::resolve(&source, &name, policy).await?;
    if context.is_identity() {
        tracing::warn!("no translations for {name} in {}", translations.display());
    }

    let object = aigis_formats::parse_with(&data, &cli.parse_options())
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let patched = patch(&object, &context)
        .await
        .with_context(|| format!("failed to patch {name}"))?;
    let bytes = serialize(&patched)?;

    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(
        "wrote {} ({} -> {} bytes)",
        output.display(),
        data.len(),
        bytes.len()
    );
    Ok(())
}

async fn decode_xml(input: &Path, output: Option<&Path>) -> Result<()> {
    let data = read(input).await?;
    let document = legacy::decode_xml(&data)
        .with_context(|| format!("failed to decode {}", input.display()))?;

    match output {
        Some(path) => tokio::fs::write(path, document.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{document}"),
    }
    Ok(())
}

async fn verify(cli: &Cli, files: &[std::path::PathBuf]) -> Result<()> {
    let options = cli.parse_options();
    let mut failed = 0usize;
    for file in files {
        let data = read(file).await?;
        match verify_bytes(&data, &options) {
            Ok(object) => println!("ok    {} ({})", file.display(), object.magic().as_str()),
            Err(e) => {
                println!("FAIL  {}: {e}", file.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files did not round-trip", files.len());
    }
    Ok(())
}
