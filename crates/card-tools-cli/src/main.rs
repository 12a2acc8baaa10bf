use anyhow::{Context, Result, bail};
use card_async_runtime::{BatchCommand, BatchJob, BatchUpdate, WorkerSources, spawn_worker};
use card_impose::{
    BatchOptions, BatchStatistics, BatchSummary, Orientation, PageMode, PaperSize, SheetMargins,
    SideSelection, SourceFetcher,
};
use card_records::{PhotoArchive, RecordSet, load_from_csv, load_stored_records};
use card_template::{PhotoIndex, Side, Template, extract_photo_fields, extract_variables};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cardt", about = "Variable-data card tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how many cards fit per page and how many pages a batch needs
    Plan {
        /// Template JSON file
        #[arg(short, long)]
        template: PathBuf,

        /// Number of records to plan for
        #[arg(short = 'n', long, default_value = "1")]
        records: usize,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// List the fields a template expects
    Variables {
        /// Template JSON file
        #[arg(short, long)]
        template: PathBuf,
    },

    /// Generate the print-ready PDF for every record
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output PDF file (defaults to <template>_Batch_<timestamp>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Render the first page of a batch to a temporary PDF
    Preview {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Template JSON file
    #[arg(short, long)]
    template: PathBuf,

    /// Records: a CSV export, or stored records as JSON
    #[arg(short, long)]
    input: PathBuf,

    /// ZIP archive of photos matched by file name
    #[arg(long)]
    photos: Option<PathBuf>,

    /// Only use the first N records
    #[arg(long)]
    limit: Option<usize>,
}

/// Flags that override values from `--config`
#[derive(Args)]
struct LayoutArgs {
    /// Batch options JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Output orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// One page per card instead of packing a sheet
    #[arg(long)]
    single_card: bool,

    /// Which sides to generate
    #[arg(long, value_enum)]
    sides: Option<SidesArg>,

    /// Sheet margin in mm (uniform on all sides)
    #[arg(long)]
    sheet_margin: Option<f32>,

    /// Gap between cards in mm
    #[arg(long)]
    spacing: Option<f32>,

    /// Bleed around each card in mm
    #[arg(long)]
    bleed: Option<f32>,

    /// Fixed number of columns
    #[arg(long)]
    columns: Option<usize>,

    /// Fixed number of rows
    #[arg(long)]
    rows: Option<usize>,

    /// Don't mirror back-side columns
    #[arg(long)]
    no_mirror: bool,

    /// Leave out crop marks
    #[arg(long)]
    no_crop_marks: bool,

    /// Leave out "Page N of M"
    #[arg(long)]
    no_page_numbers: bool,

    /// Leave out serial numbers
    #[arg(long)]
    no_serials: bool,

    /// Serial number prefix
    #[arg(long)]
    serial_prefix: Option<String>,

    /// First serial number
    #[arg(long)]
    serial_start: Option<usize>,

    /// Export resolution
    #[arg(long)]
    dpi: Option<f32>,

    /// Origin that relative photo paths are served from
    #[arg(long)]
    backend: Option<String>,

    /// Project whose photo folder bare photo names live in
    #[arg(long)]
    project: Option<String>,

    /// TrueType font for rasterized text
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    Letter,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum SidesArg {
    Front,
    Back,
    Both,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::Letter => Self::Letter,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<SidesArg> for SideSelection {
    fn from(arg: SidesArg) -> Self {
        match arg {
            SidesArg::Front => Self::Front,
            SidesArg::Back => Self::Back,
            SidesArg::Both => Self::Both,
        }
    }
}

impl LayoutArgs {
    /// Loaded config (or defaults) with command-line overrides applied
    async fn options(&self) -> Result<BatchOptions> {
        let mut options = match &self.config {
            Some(path) => BatchOptions::load(path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
            None => BatchOptions::default(),
        };

        if self.single_card {
            options.page_mode = PageMode::SingleCard;
        } else if let Some(paper) = self.paper {
            options.page_mode = PageMode::Sheet(paper.into());
        }
        if let Some(orientation) = self.orientation {
            options.orientation = orientation.into();
        }
        if let Some(sides) = self.sides {
            options.sides = sides.into();
        }
        if let Some(margin) = self.sheet_margin {
            options.margins = SheetMargins::uniform(margin);
        }
        if let Some(spacing) = self.spacing {
            options.card_spacing_mm = spacing;
        }
        if let Some(bleed) = self.bleed {
            options.bleed_mm = bleed;
        }
        if self.columns.is_some() {
            options.cards_per_row = self.columns;
        }
        if self.rows.is_some() {
            options.cards_per_column = self.rows;
        }
        if self.no_mirror {
            options.mirror_back = false;
        }
        if self.no_crop_marks {
            options.marks.crop_marks = false;
        }
        if self.no_page_numbers {
            options.marks.page_numbers = false;
        }
        if self.no_serials {
            options.marks.serial_numbers = false;
        }
        if let Some(prefix) = &self.serial_prefix {
            options.marks.serial_prefix = prefix.clone();
        }
        if let Some(start) = self.serial_start {
            options.marks.serial_start = start;
        }
        if let Some(dpi) = self.dpi {
            options.render.export_dpi = dpi;
        }
        if let Some(backend) = &self.backend {
            options.render.backend_origin = backend.clone();
        }
        if let Some(project) = &self.project {
            options.render.project_id = Some(project.clone());
        }
        if let Some(font) = &self.font {
            options.render.font_path = Some(font.clone());
        }

        options.validate()?;
        Ok(options)
    }
}

async fn load_template(path: &Path) -> Result<Template> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading template {}", path.display()))?;
    Template::from_json(&json).with_context(|| format!("parsing template {}", path.display()))
}

async fn load_records(path: &Path, options: &BatchOptions) -> Result<RecordSet> {
    let stored = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let records = if stored {
        load_stored_records(path, &options.render.photo_resolver()).await?
    } else {
        load_from_csv(path).await?
    };
    Ok(records)
}

async fn worker_sources(photos: Option<&Path>) -> Result<WorkerSources> {
    let fetcher = SourceFetcher::new()?;
    let Some(path) = photos else {
        return Ok(WorkerSources::new(Arc::new(fetcher)));
    };

    let archive = PhotoArchive::load(path)
        .await
        .with_context(|| format!("reading photo archive {}", path.display()))?;
    println!("Indexed {} photos from {}", archive.len(), path.display());
    let index: PhotoIndex = archive.index().clone();
    Ok(WorkerSources::new(Arc::new(fetcher.with_archive(archive))).with_photo_index(index))
}

/// `<template>_Batch_<timestamp>.pdf`, next to the working directory
fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cards".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{}_Batch_{}.pdf", stem, timestamp))
}

fn print_statistics(stats: &BatchStatistics) {
    println!("Batch Statistics:");
    println!("  Records: {}", stats.records);
    println!(
        "  Cards per page: {} ({} x {})",
        stats.cards_per_page, stats.cards_per_row, stats.cards_per_column
    );
    println!("  Front pages: {}", stats.front_pages);
    if stats.back_pages > 0 {
        println!("  Back pages: {}", stats.back_pages);
    }
    println!("  Total pages: {}", stats.total_pages);
    if stats.overflows {
        println!("  Warning: card plus bleed is larger than the printable area");
    }
}

fn print_fields(label: &str, side: &Side) {
    let variables: Vec<String> = extract_variables(side).into_iter().collect();
    let photos: Vec<String> = extract_photo_fields(side).into_iter().collect();
    println!("{}:", label);
    println!("  Text fields: {}", variables.join(", "));
    if !photos.is_empty() {
        println!("  Photo fields: {}", photos.join(", "));
    }
}

/// Read everything a batch needs and build the job
async fn prepare_job(source: &SourceArgs, layout: &LayoutArgs) -> Result<(BatchJob, WorkerSources)> {
    let options = layout.options().await?;
    let template = load_template(&source.template).await?;
    let mut records = load_records(&source.input, &options).await?;
    if let Some(limit) = source.limit {
        records.truncate(limit);
    }
    if records.is_empty() {
        bail!("No records in {}", source.input.display());
    }

    let sources = worker_sources(source.photos.as_deref()).await?;
    Ok((BatchJob::new(template, records.records, options), sources))
}

/// Run one command on the worker, stopping after the current card on Ctrl-C
async fn run_on_worker(command: BatchCommand, sources: WorkerSources) -> Result<(PathBuf, BatchSummary)> {
    let (handle, mut updates) = spawn_worker(sources);

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current card...");
            stopper.stop();
        }
    });

    handle.send(command)?;

    while let Some(update) = updates.recv().await {
        match update {
            BatchUpdate::Progress(progress) => {
                log::debug!(
                    "{:?}: {}/{}",
                    progress.state,
                    progress.completed,
                    progress.total
                );
            }
            BatchUpdate::StatsCalculated { stats } => print_statistics(&stats),
            BatchUpdate::Complete { path, summary }
            | BatchUpdate::PreviewGenerated { path, summary } => return Ok((path, summary)),
            BatchUpdate::Error { message } => bail!(message),
            BatchUpdate::ConfigLoaded { .. } | BatchUpdate::RecordsLoaded { .. } => {}
        }
    }

    bail!("Worker stopped before finishing")
}

fn print_summary(summary: &BatchSummary) {
    println!("{}", summary);
    for report in &summary.issues {
        println!("  record {}: {}", report.record + 1, report.issue);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            template,
            records,
            layout,
        } => {
            let options = layout.options().await?;
            let template = load_template(&template).await?;
            let stats = card_impose::calculate_statistics(&template, &options, records)?;
            print_statistics(&stats);
        }

        Commands::Variables { template } => {
            let template = load_template(&template).await?;
            print_fields("Front", &template.front.side);
            for page in &template.front.pages {
                print_fields(&page.name, &page.design);
            }
            if let Some(back) = &template.back {
                print_fields("Back", back);
            }
        }

        Commands::Generate {
            source,
            output,
            layout,
        } => {
            let (job, sources) = prepare_job(&source, &layout).await?;
            let output_path = output.unwrap_or_else(|| default_output_path(&source.template));
            let stats =
                card_impose::calculate_statistics(&job.template, &job.options, job.records.len())?;
            print_statistics(&stats);

            let (path, summary) = run_on_worker(
                BatchCommand::Generate {
                    job,
                    output_path,
                },
                sources,
            )
            .await?;
            print_summary(&summary);
            println!("Generated {} page(s) → {}", summary.pages, path.display());
        }

        Commands::Preview { source, layout } => {
            let (job, sources) = prepare_job(&source, &layout).await?;
            let (path, summary) =
                run_on_worker(BatchCommand::GeneratePreview { job }, sources).await?;
            print_summary(&summary);
            println!("Preview → {}", path.display());
        }
    }

    Ok(())
}
