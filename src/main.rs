use cazloci::options::ClusterOptions;
use cazloci::reader::{HeaderMap, TfList};
use cazloci::CazLoci;
use clap::Parser;
use peak_alloc::PeakAlloc;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

/// Call CAZyme gene clusters from a genome-wide functional annotation
/// table and write them as a genomic track.
#[derive(Debug, Parser)]
#[command(name = "cazloci", version, about)]
struct Cli {
    /// The annotation table (tab-separated, plain or gzipped)
    #[arg(short, long)]
    input: PathBuf,

    /// The track file to write
    #[arg(short, long)]
    output: PathBuf,

    /// The line-oriented transcription-factor signature list
    #[arg(short, long)]
    tf_list: PathBuf,

    /// The raw header of the CAZyme column in the annotation table
    #[arg(long, default_value = "dbCAN")]
    cazyme_column: String,

    /// The minimum CAZyme-gene count of an accepted cluster
    #[arg(long, default_value_t = 3)]
    min_caz: u32,

    /// How many non-signature genes a candidate cluster may absorb
    #[arg(long, default_value_t = 2)]
    max_non_signature: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    let header_map = HeaderMap::default().with_cazyme_column(&cli.cazyme_column);
    let tf_list = TfList::from_path(&cli.tf_list)?;
    let options = ClusterOptions::new(cli.min_caz, cli.max_non_signature);

    let loci = CazLoci::from_annotation_table(&cli.input, &header_map)?;
    loci.write_track(&cli.output, &tf_list, options)?;

    info!(
        "done in {:?}, peak memory usage {:.3} GB",
        start.elapsed(),
        PEAK_ALLOC.peak_usage_as_gb()
    );
    Ok(())
}
