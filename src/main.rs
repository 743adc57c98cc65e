use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

use rackdex::catalog_store::{RackRecord, RackStore, SqliteRackStore};
use rackdex::config::{CliConfig, EngineConfig, FileConfig};
use rackdex::decode::decode_rack_file;
use rackdex::export::{export_analysis_json, export_xml};
use rackdex::features::FeatureVector;
use rackdex::rack::{parse_rack_with_options, ParseOptions, ParsedRack};
use rackdex::similarity::rank;
use rackdex::stats::render_report;
use rackdex::summary::render_summary;

#[derive(Parser, Debug)]
#[clap(
    name = "rackdex",
    about = "Analyze rack preset files and recommend similar racks",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"))
)]
struct CliArgs {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single rack file and print its structure.
    Analyze {
        /// Path to the rack file (.adg or .adv).
        file: PathBuf,

        /// Export the decompressed XML alongside the analysis.
        #[clap(long)]
        export_xml: bool,

        /// Export the analysis as pretty-printed JSON.
        #[clap(long)]
        export_json: bool,

        /// Folder for exported files.
        #[clap(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Parse every rack file under a folder into the catalog database.
    Ingest {
        /// Folder to scan recursively for rack files.
        folder: PathBuf,

        /// Path to the SQLite catalog database file.
        #[clap(long)]
        db: PathBuf,

        /// Worker threads for parallel parsing (0 = one per core).
        #[clap(long, default_value_t = 0)]
        jobs: usize,

        /// Optional TOML config file (parsing knobs).
        #[clap(long)]
        config: Option<PathBuf>,
    },

    /// Rank catalog entries by similarity to a rack already in the catalog.
    Recommend {
        /// Name of the query rack (its filename stem at ingest time).
        name: String,

        /// Path to the SQLite catalog database file.
        #[clap(long)]
        db: PathBuf,

        /// Maximum number of recommendations to print.
        #[clap(long)]
        limit: Option<usize>,

        /// Optional TOML config file; its values override the CLI flags.
        #[clap(long)]
        config: Option<PathBuf>,

        /// Weight of the device-type overlap term.
        #[clap(long)]
        device_weight: Option<f64>,

        /// Weight of the macro-name overlap term.
        #[clap(long)]
        macro_weight: Option<f64>,

        /// Weight of the complexity-proximity term.
        #[clap(long)]
        complexity_weight: Option<f64>,
    },

    /// Print the aggregate catalog report.
    Stats {
        /// Path to the SQLite catalog database file.
        #[clap(long)]
        db: PathBuf,
    },

    /// Decode a rack file and write its pretty-printed XML.
    ExportXml {
        /// Path to the rack file (.adg or .adv).
        file: PathBuf,

        /// Folder for the exported XML.
        #[clap(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    match cli_args.command {
        Command::Analyze {
            file,
            export_xml: want_xml,
            export_json: want_json,
            output,
        } => analyze(&file, want_xml, want_json, &output),
        Command::Ingest {
            folder,
            db,
            jobs,
            config,
        } => {
            let file_config = config.as_deref().map(FileConfig::load).transpose()?;
            let engine_config = EngineConfig::resolve(&CliConfig::default(), file_config)?;
            ingest(&folder, &db, jobs, engine_config.parse_options())
        }
        Command::Recommend {
            name,
            db,
            limit,
            config,
            device_weight,
            macro_weight,
            complexity_weight,
        } => {
            let cli_config = CliConfig {
                device_weight,
                macro_weight,
                complexity_weight,
                limit,
                count_dangling_mappings: None,
            };
            let file_config = config.as_deref().map(FileConfig::load).transpose()?;
            let engine_config = EngineConfig::resolve(&cli_config, file_config)?;
            recommend(&name, &db, &engine_config)
        }
        Command::Stats { db } => {
            let store = SqliteRackStore::new(&db)?;
            print!("{}", render_report(&store)?);
            Ok(())
        }
        Command::ExportXml { file, output } => {
            let xml = decode_rack_file(&file)?;
            let written = export_xml(&xml, &file, &output)?;
            info!("XML exported to {:?}", written);
            Ok(())
        }
    }
}

/// Whether a path looks like a rack preset file.
fn is_rack_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            e == "adg" || e == "adv"
        })
        .unwrap_or(false)
}

/// Rack name derived from the filename stem.
fn rack_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Decode and parse one file into a storable record.
fn process_file(path: &Path, options: ParseOptions) -> Result<(ParsedRack, RackRecord)> {
    let xml = decode_rack_file(path)?;
    let parsed = parse_rack_with_options(&xml, &rack_name_of(path), Some(path), options)?;
    let features = FeatureVector::from_rack(&parsed.rack);
    let record = RackRecord::from_rack(&parsed.rack, &features);
    Ok((parsed, record))
}

fn analyze(file: &Path, want_xml: bool, want_json: bool, output: &Path) -> Result<()> {
    if !is_rack_file(file) {
        bail!("Not a rack file (.adg/.adv): {:?}", file);
    }
    std::fs::create_dir_all(output)
        .with_context(|| format!("Cannot create output folder {:?}", output))?;

    let xml = decode_rack_file(file)?;
    let parsed = parse_rack_with_options(
        &xml,
        &rack_name_of(file),
        Some(file),
        ParseOptions::default(),
    )?;
    let features = FeatureVector::from_rack(&parsed.rack);

    print!("{}", render_summary(&parsed));

    if want_xml {
        let written = export_xml(&xml, file, output)?;
        info!("XML exported to {:?}", written);
    }
    if want_json {
        let written = export_analysis_json(&parsed, &features, file, output)?;
        info!("Analysis exported to {:?}", written);
    }
    Ok(())
}

fn ingest(folder: &Path, db: &Path, jobs: usize, options: ParseOptions) -> Result<()> {
    if jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_rack_file(path))
        .collect();

    if files.is_empty() {
        bail!("No rack files found under {:?}", folder);
    }
    info!("Found {} rack files under {:?}", files.len(), folder);

    let store = SqliteRackStore::new(db)?;

    let bar = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    // Each file parses independently; only the database write is serialized.
    let parsed: Vec<Option<(PathBuf, ParsedRack, RackRecord)>> = files
        .par_iter()
        .map(|path| {
            let result = process_file(path, options);
            bar.inc(1);
            match result {
                Ok((parsed, record)) => Some((path.clone(), parsed, record)),
                Err(e) => {
                    warn!("Skipping {:?}: {:#}", path, e);
                    None
                }
            }
        })
        .collect();
    bar.finish_and_clear();

    let mut stored = 0usize;
    for (path, parsed_rack, record) in parsed.into_iter().flatten() {
        for warning in &parsed_rack.warnings {
            warn!("{:?}: {}", path, warning);
        }
        store.put(&record)?;
        stored += 1;
    }

    info!(
        "Ingested {} of {} rack files into {:?}",
        stored,
        files.len(),
        db
    );
    Ok(())
}

fn recommend(name: &str, db: &Path, config: &EngineConfig) -> Result<()> {
    let store = SqliteRackStore::new(db)?;

    let Some(query) = store.get_by_name(name)? else {
        bail!("Rack '{}' is not in the catalog", name);
    };
    let candidates = store.get_all()?;

    let ranked = rank(&query.name, &query.features, &candidates, &config.weights)?;

    let mut printed = 0usize;
    for recommendation in ranked.take(config.limit) {
        printed += 1;
        println!(
            "{:>2}. {}  (score {:.3})",
            printed, recommendation.id, recommendation.score
        );
        if !recommendation.shared_devices.is_empty() {
            println!(
                "      shared devices: {}",
                recommendation.shared_devices.join(", ")
            );
        }
        if !recommendation.shared_macros.is_empty() {
            let shown: Vec<String> = recommendation
                .shared_macros
                .iter()
                .map(|m| {
                    if m.is_empty() {
                        "[unnamed]".to_string()
                    } else {
                        m.clone()
                    }
                })
                .collect();
            println!("      shared macros: {}", shown.join(", "));
        }
    }

    if printed == 0 {
        println!("No other racks in the catalog to compare against.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rack_file() {
        assert!(is_rack_file(Path::new("a.adg")));
        assert!(is_rack_file(Path::new("b.ADV")));
        assert!(!is_rack_file(Path::new("c.xml")));
        assert!(!is_rack_file(Path::new("noext")));
    }

    #[test]
    fn test_rack_name_of_strips_extension_and_path() {
        assert_eq!(
            rack_name_of(Path::new("/racks/Channel Strip - Pump.adg")),
            "Channel Strip - Pump"
        );
    }
}
