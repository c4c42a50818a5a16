//! PhotoSift - Main entry point
//!
//! Sift through a folder (or a remote library) two photographs at a time,
//! deleting the worse shot of each pair.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use photosift_common::config::{resolve_source_folder, TomlConfig};
use photosift_common::logging::init_logging;
use photosift_core::codec::SharpnessCodec;
use photosift_core::remote::{resolve_product_urls, ManifestFetcher, PagedLibrary};
use photosift_core::{export, scan, session, Carousel, EngineConfig};

const GUIDE: &str = "\
commands (one per line):
   , p          move left
   . n          move right
   x q          close the application
   y z          revert last deletion
   a d          delete left/right photo (window of 1 or 2)
   s            delete the photo with the worse focus value
   1-9          delete the n-th photo of the window
   r N          show N photos at once
   l I J        swap the I-th and J-th photo
";

/// Command-line arguments for photosift
#[derive(Parser, Debug)]
#[command(name = "photosift")]
#[command(about = "Sift through photographs side by side")]
#[command(version)]
struct Args {
    /// Show more verbose console output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Display the guide to the session commands
    Guide,

    /// Sift through local images
    Local {
        /// Directory with images
        images: Option<PathBuf>,

        #[command(flatten)]
        sift: SiftArgs,

        /// Disable background preloading
        #[arg(short, long)]
        without_threading: bool,
    },

    /// Sift through images from a remote library
    Remote {
        /// Directory the images are downloaded into
        images: Option<PathBuf>,

        /// Library listing to page through
        #[arg(short, long)]
        manifest: PathBuf,

        #[command(flatten)]
        sift: SiftArgs,
    },

    /// Search remote product URLs based on local filenames
    Resolve {
        /// Folder with the to-be-resolved files
        path: PathBuf,

        /// Library listing to search
        #[arg(short, long)]
        manifest: PathBuf,

        /// Limit number of photos remotely searched
        #[arg(short, long, default_value_t = 1000)]
        limit: usize,

        /// Print a filename → URL map rather than a list of URLs
        #[arg(short, long)]
        dict: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SiftArgs {
    /// Focus threshold for automatic choice
    #[arg(short, long, default_value_t = 0.0)]
    threshold: f64,

    /// Limit size of the undo history
    #[arg(short = 'l', long)]
    backup_maxlen: Option<usize>,

    /// Number of photos kept decoded on each side of the cursor
    #[arg(short, long)]
    preload_range: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&toml_config.logging, args.verbose);

    match args.command {
        Command::Guide => {
            print!("{GUIDE}");
            Ok(())
        }

        Command::Local {
            images,
            sift,
            without_threading,
        } => {
            let dir = resolve_source_folder(images.as_deref(), &toml_config);
            let mut config = engine_config(&toml_config, &sift)?;
            if without_threading {
                config.background = false;
            }

            info!("Source folder: {}", dir.display());
            let carousel = Carousel::open_local(&dir, config, Arc::new(SharpnessCodec))
                .with_context(|| format!("Cannot open directory '{}'", dir.display()))?;

            run(carousel, sift.threshold, false)
        }

        Command::Remote {
            images,
            manifest,
            sift,
        } => {
            let dir = resolve_source_folder(images.as_deref(), &toml_config);
            let mut config = engine_config(&toml_config, &sift)?;
            if !config.background {
                debug!("Remote mode always loads in the background");
                config.background = true;
            }

            let fetcher = ManifestFetcher::open(&manifest).context("Cannot reach remote library")?;
            let source = Box::new(PagedLibrary::new(fetcher));

            info!("Download folder: {}", dir.display());
            let carousel = Carousel::open_remote(&dir, source, config, Arc::new(SharpnessCodec))
                .with_context(|| format!("Cannot start remote session in '{}'", dir.display()))?;

            run(carousel, sift.threshold, true)
        }

        Command::Resolve {
            path,
            manifest,
            limit,
            dict,
        } => resolve(&path, &manifest, limit, dict),
    }
}

/// Engine configuration from the config file plus command-line overrides
fn engine_config(toml_config: &TomlConfig, sift: &SiftArgs) -> Result<EngineConfig> {
    let mut config = EngineConfig::from(&toml_config.engine);

    if let Some(range) = sift.preload_range {
        config.preload_range = range;
    }

    match sift.backup_maxlen {
        Some(0) => bail!("--backup-maxlen must be at least 1"),
        Some(maxlen) => config.undo_capacity = Some(maxlen),
        None => {}
    }

    Ok(config)
}

fn run(mut carousel: Carousel, threshold: f64, remote: bool) -> Result<()> {
    if carousel.len() < 2 {
        bail!("There are no images to display");
    }

    info!("Sifting through {} photographs", carousel.len());

    let export_dir = remote.then_some(Path::new("."));
    let stdin = io::stdin();
    let stdout = io::stdout();
    drive_session(&mut carousel, stdin.lock(), stdout.lock(), threshold, export_dir)?;

    info!("Session finished");
    Ok(())
}

/// Drive the session, then stop the worker and export deletions
///
/// Shutdown and export run even when the session ends with an error, which is
/// returned afterwards.
fn drive_session<R: BufRead, W: Write>(
    carousel: &mut Carousel,
    input: R,
    output: W,
    threshold: f64,
    export_dir: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let session = session::run_session(carousel, input, output, threshold).context("Session failed");

    let stopped = carousel
        .shutdown()
        .context("Failed to stop background worker");

    let exported = match export_dir {
        Some(dir) => {
            let urls = carousel.deleted_product_urls();
            export::write_deleted_export(dir, &urls).context("Failed to write deletion export")
        }
        None => Ok(None),
    };
    if let Ok(Some(path)) = &exported {
        println!("Generated deletion list: {}", path.display());
    }

    if session.is_err() {
        for failure in [stopped.as_ref().err(), exported.as_ref().err()].into_iter().flatten() {
            error!("{:#}", failure);
        }
    }
    session?;
    stopped?;
    exported
}

fn resolve(path: &Path, manifest: &Path, limit: usize, dict: bool) -> Result<()> {
    let fetcher = ManifestFetcher::open(manifest).context("Cannot reach remote library")?;
    let mut library = PagedLibrary::new(fetcher);

    let files = scan::list_all_files(path)
        .with_context(|| format!("Cannot read directory '{}'", path.display()))?;

    let resolved = resolve_product_urls(&mut library, &files, limit)
        .context("Failed to search remote library")?;

    println!("Resolved files:");
    if dict {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        let urls: Vec<&String> = resolved.values().collect();
        println!("{}", serde_json::to_string(&urls)?);
    }

    let unresolved: Vec<&String> = files
        .iter()
        .filter(|name| !resolved.contains_key(*name))
        .collect();
    if !unresolved.is_empty() {
        println!("Unresolved files:");
        println!("{}", serde_json::to_string(&unresolved)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use photosift_core::item::Item;
    use photosift_core::quarantine::Quarantine;
    use photosift_core::remote::RemoteItem;
    use std::fs;
    use std::io::{BufReader, Cursor, Read};

    struct NoopQuarantine;

    impl Quarantine for NoopQuarantine {
        fn soft_delete(&self, _item: &Item) -> photosift_core::Result<()> {
            Ok(())
        }

        fn restore(&self, _item: &Item) -> photosift_core::Result<()> {
            Ok(())
        }
    }

    /// Input that fails once its buffered lines are consumed
    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("terminal went away"))
        }
    }

    fn remote_items(dir: &Path, count: usize) -> Vec<Item> {
        (0..count)
            .map(|i| {
                let remote = RemoteItem {
                    id: format!("id{i}"),
                    filename: format!("IMG_{i}.jpg"),
                    product_url: format!("https://photos.example/id{i}"),
                    is_photo: true,
                    location: None,
                };
                Item::from_remote(&remote, dir.join(&remote.filename))
            })
            .collect()
    }

    fn carousel(dir: &Path) -> Carousel {
        let config = EngineConfig {
            preload_range: 1,
            undo_capacity: None,
            auto_score: true,
            background: false,
        };
        Carousel::new(
            remote_items(dir, 3),
            dir,
            config,
            Arc::new(SharpnessCodec),
            Box::new(NoopQuarantine),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_failed_session_still_exports_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let mut carousel = carousel(dir.path());
        let input = BufReader::new(Cursor::new(b"d\n".to_vec()).chain(BrokenInput));

        let result = drive_session(&mut carousel, input, Vec::new(), 0.0, Some(dir.path()));
        assert!(result.is_err());

        let exports: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(exports.len(), 1);
        let urls: Vec<String> = serde_json::from_str(&fs::read_to_string(&exports[0]).unwrap()).unwrap();
        assert_eq!(urls, vec!["https://photos.example/id1".to_string()]);
    }

    #[test]
    fn test_local_session_writes_no_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut carousel = carousel(dir.path());
        let input = Cursor::new(b"d\nq\n".to_vec());

        let exported = drive_session(&mut carousel, input, Vec::new(), 0.0, None).unwrap();
        assert!(exported.is_none());
        assert_eq!(carousel.undo_len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
