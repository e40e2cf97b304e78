use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ent_triage_lib::pipeline::validation::{
    generate_synthetic_eval, load_eval_records, run_validation, write_eval_records,
    SummarySource, SyntheticConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Source {
    Reference,
    Api,
}

#[derive(Parser, Debug)]
#[command(
    about = "Validate triage summaries (correctness, faithfulness, relevance)",
    version
)]
struct Args {
    /// JSONL eval file (transcript, reference_summary, urgency).
    #[arg(long = "eval-file", value_name = "FILE", default_value = "data/synthetic_eval.jsonl")]
    eval_file: PathBuf,

    /// Score the file's reference summaries or fetch summaries from the triage API.
    #[arg(long = "summary-source", value_enum, default_value_t = Source::Reference)]
    summary_source: Source,

    /// Triage API base URL (e.g. http://localhost:8100) when --summary-source=api.
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Print per-sample scores.
    #[arg(long)]
    verbose: bool,

    /// Generate synthetic eval data to --eval-file, then run validation.
    #[arg(long)]
    generate: bool,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let source = match (args.summary_source, &args.api_url) {
        (Source::Reference, _) => SummarySource::Reference,
        (Source::Api, Some(url)) => SummarySource::Api { url: url.clone() },
        (Source::Api, None) => bail!("--api-url is required when --summary-source=api"),
    };

    if args.generate {
        let records = generate_synthetic_eval(SyntheticConfig::default());
        let path = write_eval_records(&args.eval_file, &records)
            .with_context(|| format!("Failed to write {}", args.eval_file.display()))?;
        eprintln!("Wrote {} synthetic records to {}", records.len(), path.display());
    }

    if !args.eval_file.exists() {
        bail!(
            "Eval file not found: {}. Run with --generate first.",
            args.eval_file.display()
        );
    }

    let records = load_eval_records(&args.eval_file)?;
    let report = run_validation(&records, &source)?;

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        print!("{}", report.render_text(args.verbose));
    }
    Ok(())
}
