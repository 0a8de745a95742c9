use anyhow::{Context, Result};
use aviation_dash::api::{DateRange, DataSource, FileSource};
use aviation_dash::config::ApiConfig;
use aviation_dash::dashboard::{PrepareContext, View, ViewData, ViewParams, render_view};
use aviation_dash::geo::FeatureCollection;
use aviation_dash::interaction::ActiveSet;
use aviation_dash::layout::Size;
use aviation_dash::models::parse_accident_date;
use aviation_dash::scales::ScaleRegistry;
use aviation_dash::stats::{self, BinSpec, PeriodMode};
use aviation_dash::viz::{LineMode, util::NumberFormat, write_svg};
use aviation_dash::{Client, views};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "avdash",
    version,
    about = "Summarize and chart aviation accident statistics"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one dashboard view to SVG.
    Render(RenderArgs),
    /// Print box-plot summaries of people aboard per group.
    Summary(SummaryArgs),
    /// Print headline, survival and severity statistics from the raw rows.
    Stats(StatsArgs),
    /// List the available views.
    Views,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Read payloads from a fixture directory instead of the API.
    #[arg(long, conflicts_with = "api")]
    data_dir: Option<PathBuf>,
    /// API base URL (default: $AVDASH_API_URL or http://localhost:5000).
    #[arg(long)]
    api: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PeriodArg {
    Yearly,
    Decade,
    Seasonal,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LineArg {
    Lines,
    Area,
    Stacked,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// View name (see `avdash views`).
    view: View,
    #[command(flatten)]
    source: SourceArgs,
    /// Output SVG path.
    #[arg(short, long)]
    out: PathBuf,
    #[arg(long, default_value_t = 800)]
    width: u32,
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Number formatting locale (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
    /// Manufacturer share year.
    #[arg(long)]
    year: Option<i32>,
    /// Manufacturer totals year range (YYYY:YYYY).
    #[arg(long)]
    years: Option<String>,
    /// Manufacturer totals: number of manufacturers shown.
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Comma-separated manufacturers for the trend lines.
    #[arg(long)]
    manufacturers: Option<String>,
    /// Country for the cluster pie.
    #[arg(long)]
    country: Option<String>,
    /// Comma-separated active clusters (default: all).
    #[arg(long)]
    clusters: Option<String>,
    #[arg(long, value_enum, default_value = "yearly")]
    mode: PeriodArg,
    #[arg(long, default_value_t = false)]
    cumulative: bool,
    #[arg(long, value_enum, default_value = "lines")]
    lines: LineArg,
    /// Operator-country range start (YYYY-MM-DD).
    #[arg(long, requires = "end_date")]
    start_date: Option<String>,
    /// Operator-country range end (YYYY-MM-DD).
    #[arg(long, requires = "start_date")]
    end_date: Option<String>,
    /// Country boundaries (GeoJSON) for the choropleth.
    #[arg(long)]
    geojson: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Also bin each group's values into this many bins.
    #[arg(long)]
    bins: Option<usize>,
    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_list(s: &str) -> BTreeSet<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_years(s: &str) -> Option<(i32, i32)> {
    let (a, b) = s.split_once(':')?;
    let (a, b) = (a.trim().parse::<i32>().ok()?, b.trim().parse::<i32>().ok()?);
    Some((a.min(b), a.max(b)))
}

fn open_source(args: &SourceArgs) -> Result<Box<dyn DataSource>> {
    if let Some(dir) = &args.data_dir {
        anyhow::ensure!(dir.is_dir(), "data directory {} not found", dir.display());
        return Ok(Box::new(FileSource::new(dir)));
    }
    let mut cfg = ApiConfig::from_env();
    if let Some(url) = &args.api {
        cfg = cfg.with_base_url(url);
    }
    Ok(Box::new(Client::new(cfg)?))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Summary(args) => cmd_summary(args),
        Command::Stats(args) => cmd_stats(args),
        Command::Views => {
            for v in View::ALL {
                println!("{:<22} {}", v.name(), v.title());
            }
            Ok(())
        }
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let source = open_source(&args.source)?;
    let date_range = match (&args.start_date, &args.end_date) {
        (Some(a), Some(b)) => {
            let start = parse_accident_date(a).with_context(|| format!("invalid --start-date {a}"))?;
            let end = parse_accident_date(b).with_context(|| format!("invalid --end-date {b}"))?;
            Some(DateRange::new(start, end))
        }
        _ => None,
    };
    let year_range = match &args.years {
        Some(s) => Some(parse_years(s).context("invalid --years, expected YYYY:YYYY")?),
        None => None,
    };
    let mut params = ViewParams {
        year: args.year,
        year_range,
        top_n: args.top,
        manufacturers: args.manufacturers.as_deref().map(parse_list),
        country: args.country.clone(),
        period: match args.mode {
            PeriodArg::Yearly => PeriodMode::Yearly,
            PeriodArg::Decade => PeriodMode::Decade,
            PeriodArg::Seasonal => PeriodMode::Seasonal,
        },
        cumulative: args.cumulative,
        line_mode: match args.lines {
            LineArg::Lines => LineMode::Lines,
            LineArg::Area => LineMode::Area,
            LineArg::Stacked => LineMode::StackedArea,
        },
        clusters: None,
        date_range,
        locale: args.locale.clone(),
    };

    let data = args
        .view
        .fetch(source.as_ref(), &params)
        .with_context(|| format!("fetch {} from {}", args.view, source.describe()))?;

    if args.view.uses_clusters()
        && let Some(list) = &args.clusters
        && let ViewData::Clusters(d) = &data
    {
        let mut set = ActiveSet::all(views::cluster_universe(d));
        set.clear_all();
        for key in parse_list(list) {
            set.toggle(&key);
        }
        params.clusters = Some(set);
    }

    let features = match &args.geojson {
        Some(p) => Some(Arc::new(FeatureCollection::from_path(p)?)),
        None => None,
    };
    let registry = ScaleRegistry::new();
    let ctx = PrepareContext {
        registry: &registry,
        features,
        params: &params,
    };
    let size = Size::new(args.width as f64, args.height as f64);
    let scene = render_view(args.view, &data, &ctx, size);
    write_svg(&scene, &args.out)?;
    eprintln!("Wrote {} to {}", args.view, args.out.display());
    Ok(())
}

fn cmd_summary(args: SummaryArgs) -> Result<()> {
    let source = open_source(&args.source)?;
    let groups = source
        .aboard_distribution()
        .with_context(|| format!("fetch aboard distribution from {}", source.describe()))?;
    let records = stats::summarize_groups(&groups);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    let fmt = NumberFormat::default();
    for r in &records {
        let s = &r.summary;
        println!(
            "{}  count={} excluded={}  min={} q1={} median={} q3={} max={} mean={} outliers={}",
            r.key,
            s.count,
            s.excluded_count,
            fmt.decimal(s.min, 2),
            fmt.decimal(s.q1, 2),
            fmt.decimal(s.median, 2),
            fmt.decimal(s.q3, 2),
            fmt.decimal(s.max, 2),
            fmt.decimal(s.mean, 2),
            s.outliers.len()
        );
        if let Some(n) = args.bins
            && let Some(values) = groups.get(&r.key)
        {
            let hist = stats::bin_values(values, &BinSpec::Count(n))?;
            for b in &hist.bins {
                println!(
                    "    [{}, {})  {}",
                    fmt.decimal(b.bin_start, 1),
                    fmt.decimal(b.bin_end, 1),
                    b.count
                );
            }
        }
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> Result<()> {
    let source = open_source(&args.source)?;
    let rows = source
        .accidents()
        .with_context(|| format!("fetch accident data from {}", source.describe()))?;
    let headline = stats::headline_stats(&rows);
    let survival = stats::survival_stats(&rows);
    let severity = stats::severity_buckets(&rows);
    if args.json {
        let out = serde_json::json!({
            "headline": headline,
            "survival": survival,
            "severity": severity,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    let fmt = NumberFormat::default();
    println!("accidents:   {}", fmt.count(headline.total_accidents as f64));
    println!("fatalities:  {}", fmt.count(headline.total_fatalities as f64));
    if let Some((y, n)) = headline.peak_year {
        println!("peak year:   {y} ({} accidents)", fmt.count(n as f64));
    }
    if let Some((lo, hi)) = headline.year_range {
        println!("years:       {lo}-{hi}");
    }
    println!(
        "survival:    {} of {} aboard ({} accidents with data)",
        fmt.percent(survival.survival_rate),
        fmt.count(survival.total_aboard as f64),
        survival.accidents_with_data
    );
    for (title, list) in [
        ("top countries", &headline.top_countries),
        ("top aircraft", &headline.top_aircraft),
        ("top operators", &headline.top_operators),
    ] {
        println!("{title}:");
        for kv in list {
            println!("    {:<40} {}", kv.key, fmt.count(kv.value));
        }
    }
    println!("fatality ranges:");
    for kv in &severity {
        println!("    {:<8} {}", kv.key, fmt.count(kv.value));
    }
    Ok(())
}
