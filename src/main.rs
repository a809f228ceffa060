use burrito::{
    config::{load_dotenv, ConfigManager, DEFAULT_CONFIG_FILE},
    manager::{
        bundle_pack, convert_document_file, convert_pack_dir, extract_taco, process_pack_list, PackList,
        PackOutcome,
    },
    trace::install_tracing,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use tracing::{info, warn};

/// converts TacO marker packs into burrito json
#[derive(Debug, Parser)]
#[command(name = "burrito", version)]
struct Cli {
    /// config file. a missing file means the default config
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: Utf8PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// convert every top level xml document of an extracted pack
    Convert { pack_dir: Utf8PathBuf },
    /// convert a single xml document
    File {
        xml: Utf8PathBuf,
        /// pack root for trl lookup and placeholder textures. defaults to the directory of the document
        #[arg(long)]
        root: Option<Utf8PathBuf>,
    },
    /// extract a .taco archive
    Taco {
        taco: Utf8PathBuf,
        /// defaults to a directory named after the archive, next to it
        #[arg(long, short = 'o')]
        out: Option<Utf8PathBuf>,
    },
    /// zip a converted pack without its xml and trl files
    Bundle {
        pack_dir: Utf8PathBuf,
        /// defaults to `<pack_dir>.zip`
        #[arg(long, short = 'o')]
        out: Option<Utf8PathBuf>,
    },
    /// extract, convert and bundle every pack of the marker pack list
    Packs {
        /// overrides the pack list of the config
        #[arg(long)]
        list: Option<Utf8PathBuf>,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let dotenv = load_dotenv();
    let cli = Cli::parse();
    let config = ConfigManager::new(cli.config.clone())
        .wrap_err("failed to load config")?
        .config;
    let _guard = install_tracing(&config.log_level, config.log_dir.as_deref())
        .wrap_err("failed to setup logging")?;

    info!("Application Name: {}", env!("CARGO_PKG_NAME"));
    info!("Application Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(dotenv) = dotenv {
        info!("loaded environment from {}", dotenv.display());
    }
    let options = config.convert_options();

    match cli.command {
        Command::Convert { pack_dir } => {
            let report = convert_pack_dir(&pack_dir, &options)
                .wrap_err_with(|| format!("failed to convert pack {pack_dir}"))?;
            info!(
                "{} documents converted with {} errors and {} warnings",
                report.converted.len(),
                report.item_errors(),
                report.item_warnings()
            );
            if !report.failed.is_empty() {
                bail!(
                    "{} of {} documents in {pack_dir} failed",
                    report.failed.len(),
                    report.documents()
                );
            }
        }
        Command::File { xml, root } => {
            let root = root.unwrap_or_else(|| parent_dir(&xml));
            let report = convert_document_file(&xml, &root, &options)
                .wrap_err_with(|| format!("failed to convert {xml}"))?;
            info!("wrote {}", report.json_path);
        }
        Command::Taco { taco, out } => {
            let out = out.unwrap_or_else(|| taco.with_extension(""));
            let count = extract_taco(&taco, &out).wrap_err_with(|| format!("failed to extract {taco}"))?;
            info!("extracted {count} files into {out}");
        }
        Command::Bundle { pack_dir, out } => {
            let out = out.unwrap_or_else(|| pack_dir.with_extension("zip"));
            let count = bundle_pack(&pack_dir, &out).wrap_err_with(|| format!("failed to bundle {pack_dir}"))?;
            info!("bundled {count} files into {out}");
        }
        Command::Packs { list } => {
            let list_path = list.unwrap_or_else(|| config.pack_list.clone());
            let list = PackList::load(&list_path).wrap_err("failed to load marker pack list")?;
            std::fs::create_dir_all(&config.packages_dir)
                .wrap_err_with(|| format!("failed to create {}", config.packages_dir))?;
            let outcomes = process_pack_list(&list, &config.packages_dir, &options);
            let mut failed = 0;
            for (id, outcome) in &outcomes {
                match outcome {
                    PackOutcome::Processed(processed) => info!(
                        "{id}: {} of {} documents converted, bundled into {}",
                        processed.report.converted.len(),
                        processed.report.documents(),
                        processed.bundle
                    ),
                    PackOutcome::Unavailable => warn!("{id}: not available"),
                    PackOutcome::Failed(_) => failed += 1,
                }
            }
            info!("All marker packs have been processed!");
            if failed > 0 {
                bail!("{failed} of {} marker packs failed", outcomes.len());
            }
        }
    }
    Ok(())
}

fn parent_dir(path: &Utf8Path) -> Utf8PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    }
}
