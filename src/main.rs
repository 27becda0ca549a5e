use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use segprep::data::loader::{load_manifest, load_parquet};
use segprep::data::writer::{write_manifest, write_parquet};
use segprep::{find_image_files_with, read_dataset, FilenameTemplate, PngDecoder, PrepConfig, ReadPolicy};

#[derive(Parser)]
#[command(name = "segprep")]
#[command(version, about = "Prepare paired image/label PNGs for segmentation training", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the shuffled image/label pairs of a directory
    List {
        /// Directory holding *_image.* and *_label.* files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// JSON config file (markers, seed)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Shuffle seed, overrides the config file
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Save the ordering as a .json or .csv manifest
        #[arg(short, long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },

    /// Decode every pair and write a Parquet archive
    Prepare {
        /// Directory holding *_image.* and *_label.* files
        #[arg(value_name = "DIR", required_unless_present = "from_manifest")]
        dir: Option<PathBuf>,

        /// Output .parquet file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// JSON config file (markers, seed)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Shuffle seed, overrides the config file
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Save the ordering as a .json or .csv manifest
        #[arg(short, long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Read pairs in the order of an existing manifest instead of scanning DIR
        #[arg(long, value_name = "FILE", conflicts_with = "dir")]
        from_manifest: Option<PathBuf>,

        /// Drop pairs that fail to decode instead of aborting
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Summarise a Parquet archive written by `prepare`
    Inspect {
        /// Archive to read
        #[arg(value_name = "FILE")]
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            dir,
            config,
            seed,
            manifest,
        } => {
            let config = load_config(config.as_deref(), seed)?;
            let templates = enumerate(&dir, &config)?;
            for template in &templates {
                println!("{template}");
            }
            if let Some(path) = manifest {
                write_manifest(&path, &templates, &config.markers)?;
            }
        }
        Commands::Prepare {
            dir,
            out,
            config,
            seed,
            manifest,
            from_manifest,
            skip_invalid,
        } => {
            let config = load_config(config.as_deref(), seed)?;
            let templates = match (from_manifest, dir) {
                (Some(path), _) => load_manifest(&path)
                    .with_context(|| format!("loading manifest {}", path.display()))?,
                (None, Some(dir)) => enumerate(&dir, &config)?,
                (None, None) => anyhow::bail!("either DIR or --from-manifest is required"),
            };
            if let Some(path) = manifest {
                write_manifest(&path, &templates, &config.markers)?;
            }

            let policy = if skip_invalid {
                ReadPolicy::SkipInvalid
            } else {
                ReadPolicy::FailFast
            };
            let dataset = read_dataset(&templates, &config.markers, &PngDecoder, policy)?;
            write_parquet(&out, &dataset)?;
        }
        Commands::Inspect { archive } => {
            let dataset = load_parquet(&archive)
                .with_context(|| format!("loading archive {}", archive.display()))?;
            log::info!(
                "{}: {} pairs, image shape {}, positive label fraction {:.4}",
                archive.display(),
                dataset.len(),
                dataset.shape_summary(),
                dataset.positive_fraction()
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<PrepConfig> {
    let mut config = match path {
        Some(path) => PrepConfig::from_file(path)?,
        None => PrepConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    log::debug!("using {config:?}");
    Ok(config)
}

fn enumerate(dir: &Path, config: &PrepConfig) -> Result<Vec<FilenameTemplate>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let templates = find_image_files_with(dir, &config.markers, &mut rng)?;
    Ok(templates)
}
