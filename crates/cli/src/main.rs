use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salecast_core::ingest::{CanonicalField, ColumnMap, RawTable};
use salecast_core::model::{DemandModel, LagBaselineModel};

#[derive(Debug, Parser)]
#[command(name = "salecast_cli")]
struct Args {
    /// Raw point-of-sale CSV export.
    #[arg(long)]
    input: PathBuf,

    /// Write JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit the feature table and skip the model.
    #[arg(long)]
    features_only: bool,

    /// Use the lag baseline even when MODEL_SERVER_URL is set.
    #[arg(long)]
    baseline: bool,

    /// Extra column synonym, e.g. `--alias Product=item_name`. Repeatable.
    #[arg(long = "alias", value_parser = parse_alias)]
    aliases: Vec<(String, CanonicalField)>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = salecast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&args, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        if let Some(pipeline_err) = err.downcast_ref::<salecast_core::pipeline::PipelineError>() {
            tracing::error!(
                kind = pipeline_err.kind(),
                field = pipeline_err.field(),
                "input rejected"
            );
        }
    }
    result
}

async fn run(args: &Args, settings: &salecast_core::config::Settings) -> anyhow::Result<()> {
    let columns = args
        .aliases
        .iter()
        .fold(ColumnMap::default(), |map, (label, field)| {
            map.with_synonym(label.clone(), *field)
        });

    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("open {} failed", args.input.display()))?;
    let table = RawTable::from_csv_reader(std::io::BufReader::new(file))?;

    let json = if args.features_only {
        let features = salecast_core::pipeline::run(&table, &columns)?;
        serde_json::to_string_pretty(&features).context("serialize feature table failed")?
    } else {
        let model: Arc<dyn DemandModel> = if args.baseline {
            Arc::new(LagBaselineModel)
        } else {
            salecast_core::model::from_settings(settings)?
        };
        let report =
            salecast_core::forecast::predict_table(&table, &columns, model.as_ref()).await?;
        serde_json::to_string_pretty(&report).context("serialize prediction report failed")?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("write {} failed", path.display()))?;
            tracing::info!(output = %path.display(), "wrote report");
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn parse_alias(raw: &str) -> Result<(String, CanonicalField), String> {
    let (label, field) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=FIELD, got {raw:?}"))?;
    let field = CanonicalField::from_name(field).ok_or_else(|| {
        let known: Vec<_> = CanonicalField::ALL.iter().map(|f| f.as_str()).collect();
        format!("unknown field {field:?}; expected one of {}", known.join(", "))
    })?;
    let label = label.trim();
    if label.is_empty() {
        return Err("alias label must be non-empty".to_string());
    }
    Ok((label.to_string(), field))
}

fn init_sentry(settings: &salecast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alias_pairs() {
        let (label, field) = parse_alias("Product=item_name").unwrap();
        assert_eq!(label, "Product");
        assert_eq!(field, CanonicalField::ItemName);
    }

    #[test]
    fn rejects_unknown_alias_fields() {
        assert!(parse_alias("Product=sku").is_err());
        assert!(parse_alias("Product").is_err());
        assert!(parse_alias(" =amount").is_err());
    }

    #[test]
    fn accepts_minimal_invocation() {
        let args = Args::try_parse_from(["salecast_cli", "--input", "sales.csv"]).unwrap();
        assert_eq!(args.input, PathBuf::from("sales.csv"));
        assert!(!args.features_only);
        assert!(args.aliases.is_empty());
    }
}
