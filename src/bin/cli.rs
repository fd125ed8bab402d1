use anyhow::{anyhow, Context, Result};
use colored::*;
use revenue_extractor::{
    core::{
        config::{parse_keywords, ExtractorConfig, LlmConfig},
        init,
        service::ExtractionService,
    },
    edgar::{
        filing,
        parsing::{canonicalize, TableLocator},
        tickers, DocumentSource, FileDocumentSource, ReportType, Ticker,
    },
    extract::Extraction,
    refine::ExtractionInstruction,
    to_text_grid,
    utils::{dirs, progress::ProgressTracker},
};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "revenue-cli",
    about = "Extract revenue breakdown tables from inline XBRL filings"
)]
struct Opt {
    /// Local inline XBRL document
    #[structopt(long, parse(from_os_str), conflicts_with_all = &["url", "ticker"])]
    file: Option<PathBuf>,

    /// Document URL
    #[structopt(long, conflicts_with = "ticker")]
    url: Option<String>,

    /// Ticker symbol, resolved to its latest filing on EDGAR
    #[structopt(long)]
    ticker: Option<String>,

    /// Form type used with --ticker
    #[structopt(long, default_value = "10-K")]
    form: ReportType,

    /// Comma-separated tag keywords (defaults to EXTRACTOR_KEYWORDS)
    #[structopt(long)]
    keywords: Option<String>,

    /// Print candidate tables as text grids without calling the model
    #[structopt(long)]
    grid: bool,

    /// Custom prompt template containing {table_content}
    #[structopt(long, parse(from_os_str))]
    prompt: Option<PathBuf>,

    /// Where to write the JSON result
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Overall refinement deadline in seconds
    #[structopt(long)]
    timeout: Option<u64>,

    /// Disable the progress spinner
    #[structopt(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::debug!("Logger initialized");

    let opt = Opt::from_args();
    let config = ExtractorConfig::from_env()?;

    let label = opt
        .ticker
        .clone()
        .or_else(|| {
            opt.file
                .as_ref()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "filing".to_string());
    let progress = if opt.quiet {
        ProgressTracker::hidden(&label)
    } else {
        ProgressTracker::new(&label)
    };

    let work = async {
        match &opt.file {
            Some(path) => {
                let locator = path.to_string_lossy().to_string();
                run(&opt, &config, FileDocumentSource::new(), locator, &progress).await
            }
            None => {
                let source = init::initialize_document_source(&config)?;
                let locator = resolve_locator(&opt, &source, &progress).await?;
                run(&opt, &config, source, locator, &progress).await
            }
        }
    };

    tokio::select! {
        result = work => {
            if result.is_err() {
                progress.abandon("Failed");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            progress.abandon("Interrupted");
            println!("\nReceived Ctrl+C!");
            Ok(())
        }
    }
}

async fn resolve_locator<S: DocumentSource>(
    opt: &Opt,
    source: &S,
    progress: &ProgressTracker,
) -> Result<String> {
    if let Some(url) = &opt.url {
        return Ok(url.clone());
    }

    let symbol = opt
        .ticker
        .clone()
        .ok_or_else(|| anyhow!("One of --file, --url or --ticker is required"))?;
    let ticker = Ticker::new(symbol)?;

    progress.stage(&format!("Resolving latest {} for {}", opt.form, ticker));
    let cik = tickers::resolve_cik(source, &ticker).await?;
    let latest = filing::latest_filing(source, &cik, &opt.form).await?;
    println!(
        "{} {} filed {}",
        ticker.as_str().cyan().bold(),
        latest.report_type,
        latest.filing_date.to_string().yellow()
    );
    Ok(latest.document_url())
}

async fn run<S: DocumentSource>(
    opt: &Opt,
    config: &ExtractorConfig,
    source: S,
    locator: String,
    progress: &ProgressTracker,
) -> Result<()> {
    let keywords = match &opt.keywords {
        Some(raw) => parse_keywords(raw),
        None => config.keywords.clone(),
    };

    if opt.grid {
        progress.stage("Fetching filing");
        let markup = source.fetch(&locator).await?;
        progress.finish("Located tables");
        print_grids(&markup, config, &keywords);
        return Ok(());
    }

    let llm = LlmConfig::from_env()?;
    let instruction = match &opt.prompt {
        Some(path) => ExtractionInstruction::from_template_file(path)
            .with_context(|| format!("Failed to read prompt template {:?}", path))?,
        None => ExtractionInstruction::default(),
    };

    let extractor = init::initialize_extractor(config, &llm)?;
    let service = ExtractionService::new(source, extractor, keywords)
        .with_instruction(instruction)
        .with_timeout(opt.timeout.map(Duration::from_secs));

    progress.stage("Fetching and refining tables");
    let extraction = service.extract_from(&locator).await?;
    progress.finish("Done");

    print_summary(&extraction);

    let output = match (&opt.output, &opt.ticker) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(ticker)) => Some(dirs::output_path(&ticker.to_uppercase())?),
        (None, None) => None,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, serde_json::to_string_pretty(&extraction)?)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Saved results to {}", path.display().to_string().green());
        }
        None => println!(
            "{}",
            serde_json::to_string_pretty(&extraction.into_revenue_tables())?
        ),
    }

    Ok(())
}

fn print_grids(markup: &str, config: &ExtractorConfig, keywords: &[String]) {
    let located = TableLocator::new(config.tag_prefix.clone()).locate(markup, keywords);
    println!(
        "{} tag(s) discovered, {} retained, {} table(s)",
        located.tags_discovered,
        located.tags_retained(),
        located.table_count()
    );

    for table in located.into_tables() {
        println!(
            "\n{} {}",
            format!("#{}", table.ordinal).cyan().bold(),
            table.tag.to_string().yellow()
        );
        let canonical = canonicalize(&table);
        match to_text_grid(&canonical.markup) {
            Some(grid) => println!("{}", grid),
            None => println!("{}", "(no rows)".dimmed()),
        }
    }
}

fn print_summary(extraction: &Extraction) {
    let report = &extraction.report;
    println!(
        "\n{} tag(s) discovered, {} retained, {} table(s) located",
        report.tags_discovered, report.tags_retained, report.tables_located
    );
    println!(
        "{} accepted, {} rejected, {} failed",
        report.accepted.to_string().green(),
        report.rejected.to_string().yellow(),
        report.failed.to_string().red()
    );
    if report.timed_out {
        println!(
            "{}",
            format!("Timed out, {} table(s) skipped", report.skipped()).red()
        );
    }
    for failure in &report.failures {
        println!(
            "  {} #{} {}: {}",
            "failed".red(),
            failure.ordinal,
            failure.tag,
            failure.message
        );
    }

    for extracted in &extraction.tables {
        let table = &extracted.table;
        println!("\n{}", table.table_title.bold());
        for item in &table.items {
            let title = if item.is_subtotal {
                item.title.bold()
            } else {
                item.title.normal()
            };
            println!("  {:<50} {:>12.1}", title, item.amount);
        }
        println!("  {:<50} {:>12.1}", "Total".bold(), table.table_total);
        let discrepancy = table.total_discrepancy();
        if discrepancy.abs() > 0.5 {
            println!(
                "  {}",
                format!("Line items differ from total by {:.1}", discrepancy).yellow()
            );
        }
    }
}
