//! Command-line interface: argument parsing and subcommand dispatch.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info, warn};

use bluemarble_core::{ColorKey, TemplateCoords, TileCoords};
use bluemarble_render::{format_count, RgbaBuffer, TemplateManager, TileOutcome, TracingStatus};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::storage::FileStore;
use crate::tile_worker::{spawn_tile_worker, TileRequest, TileResponse};

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// BlueMarble - overlay pixel-art templates on remote grid tiles
#[derive(Parser)]
#[command(name = "bluemarble")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted template document
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Numeric user id used for the author id of new templates
    #[arg(long, global = true)]
    pub user_id: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Slice an image into a new template and store it
    Create {
        /// Source image (PNG)
        image: PathBuf,

        /// Anchor as "tile_x, tile_y, pixel_x, pixel_y"
        #[arg(long)]
        coords: TemplateCoords,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Draw the stored templates onto remote tile images
    Composite {
        /// Tile images laid out as .../<x>/<y>.png
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Tile coordinates "x,y" for a single input not laid out by coordinates
        #[arg(long)]
        tile: Option<TileCoords>,

        /// Output directory; results are written as <dir>/<x>/<y>.png
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Import a template document (JSON)
    Import {
        /// Document to import
        path: PathBuf,
    },

    /// Export the stored templates as JSON
    Export {
        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored templates and their colors
    List,

    /// Delete a template by storage key ("<sort_id> <author_id>")
    Delete { key: String },

    /// Show or hide one color ("r,g,b", "other", or "all") of a template
    ToggleColor {
        key: String,
        color: String,

        /// Hide instead of show
        #[arg(long)]
        off: bool,
    },

    /// Show or hide a whole template
    ToggleTemplate {
        key: String,

        /// Hide instead of show
        #[arg(long)]
        off: bool,
    },
}

/// Parse arguments, run the selected command and map the result to an exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref());
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = dir.to_string_lossy().to_string();
    }
    if cli.user_id.is_some() {
        config.user_id = cli.user_id;
    }

    let store = FileStore::new(config.storage_path());
    info!("Using storage at {}", store.directory().display());
    let manager = Arc::new(TemplateManager::new(
        &config.manager_config(),
        Arc::new(store),
        Arc::new(TracingStatus),
    )?);
    if let Err(e) = manager.load_from_store() {
        warn!("Starting without stored templates: {e}");
    }

    match cli.command {
        Commands::Create {
            image,
            coords,
            name,
        } => create(&manager, &image, coords, name),
        Commands::Composite {
            inputs,
            tile,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(crate::app_dir::composited_directory);
            composite(manager, &inputs, tile, &output_dir)
        }
        Commands::Import { path } => import(&manager, &path),
        Commands::Export { output } => export(&manager, output.as_deref()),
        Commands::List => {
            list(&manager);
            Ok(())
        }
        Commands::Delete { key } => {
            if manager.delete_template(&key)? {
                println!("Deleted {key}");
            } else {
                println!("No template {key}");
            }
            Ok(())
        }
        Commands::ToggleColor { key, color, off } => toggle_color(&manager, &key, &color, !off),
        Commands::ToggleTemplate { key, off } => {
            manager.set_template_enabled(&key, !off)?;
            println!("{key} {}", if off { "hidden" } else { "shown" });
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn create(
    manager: &TemplateManager,
    image: &Path,
    coords: TemplateCoords,
    name: Option<String>,
) -> Result<()> {
    let bytes = fs::read(image).map_err(|e| AppError::io(image, e))?;
    let buffer = RgbaBuffer::decode(&bytes)?;
    let name = name.unwrap_or_else(|| {
        image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "template".to_string())
    });
    let key = manager.create_template(&buffer, &name, coords)?;
    println!("Created {key} ({}×{} at {coords})", buffer.width, buffer.height);
    Ok(())
}

fn composite(
    manager: Arc<TemplateManager>,
    inputs: &[PathBuf],
    tile: Option<TileCoords>,
    output_dir: &Path,
) -> Result<()> {
    if tile.is_some() && inputs.len() > 1 {
        warn!("--tile applies to every input");
    }
    let jobs = inputs
        .par_iter()
        .map(|path| {
            let coords = tile
                .or_else(|| tile_coords_from_path(path))
                .ok_or_else(|| AppError::UnknownTile(path.clone()))?;
            let bytes = fs::read(path).map_err(|e| AppError::io(path, e))?;
            Ok((coords, bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    let (tx, rx) = spawn_tile_worker(Arc::clone(&manager));
    let expected = jobs.len();
    for (tile, bytes) in jobs {
        tx.send(TileRequest::Composite { tile, bytes })
            .map_err(|_| AppError::WorkerGone)?;
    }
    drop(tx);

    let results: Vec<(TileCoords, TileOutcome)> = rx
        .iter()
        .map(|TileResponse::Composited { tile, outcome }| (tile, outcome))
        .collect();
    if results.len() != expected {
        return Err(AppError::WorkerGone);
    }

    results
        .par_iter()
        .map(|(tile, outcome)| {
            let path = output_dir
                .join(tile.x.to_string())
                .join(format!("{}.png", tile.y));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
            }
            fs::write(&path, &outcome.bytes).map_err(|e| AppError::io(&path, e))
        })
        .collect::<Result<Vec<()>>>()?;

    for (tile, outcome) in &results {
        match outcome.stats {
            Some(stats) => println!(
                "{tile}: painted {} / {} • wrong {}",
                format_count(stats.painted),
                format_count(stats.required),
                format_count(stats.wrong)
            ),
            None => println!("{tile}: unchanged"),
        }
    }
    if let Some(status) = results.iter().rev().find_map(|(_, o)| o.status.as_deref()) {
        println!("{status}");
    }
    let report = manager.progress_report();
    println!(
        "{} tile(s) written to {} ({} with templates)",
        results.len(),
        output_dir.display(),
        report.tiles_seen
    );
    Ok(())
}

fn import(manager: &TemplateManager, path: &Path) -> Result<()> {
    let json = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    let summary = manager.import_json(&json)?;
    if !summary.recognized {
        println!("{} is not a BlueMarble document; nothing imported", path.display());
        return Ok(());
    }
    println!(
        "Imported {} template(s), skipped {} tile(s)",
        summary.templates, summary.skipped_tiles
    );
    Ok(())
}

fn export(manager: &TemplateManager, output: Option<&Path>) -> Result<()> {
    let json = manager.export_json()?;
    match output {
        Some(path) => {
            fs::write(path, &json).map_err(|e| AppError::io(path, e))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn list(manager: &TemplateManager) {
    let templates = manager.list_templates();
    if templates.is_empty() {
        println!("No templates");
        return;
    }
    for t in templates {
        let coords = t
            .coords
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{} \"{}\" at {coords}{}: {} tile(s), {} required pixel(s)",
            t.storage_key,
            t.display_name,
            if t.enabled { "" } else { " (hidden)" },
            t.tile_count,
            format_count(t.required_pixel_count)
        );
        for (key, usage) in &t.palette {
            let name = key.entry().map_or("Other", |e| e.name);
            println!(
                "  {:>3} {name:<16} {:<12} {:>10}",
                if usage.enabled { "on" } else { "off" },
                key.to_string(),
                format_count(usage.count)
            );
        }
    }
}

fn toggle_color(manager: &TemplateManager, key: &str, color: &str, enabled: bool) -> Result<()> {
    if color == "all" {
        manager.set_all_colors_enabled(key, enabled)?;
    } else {
        let color: ColorKey = color.parse()?;
        let used = manager.set_color_enabled(key, color, enabled)?;
        if !used {
            println!("{key} does not use {color}");
            return Ok(());
        }
    }
    println!("{key}: {color} {}", if enabled { "shown" } else { "hidden" });
    Ok(())
}

/// Tile coordinates from a path laid out like the remote tile endpoint,
/// `.../<x>/<y>.png`.
fn tile_coords_from_path(path: &Path) -> Option<TileCoords> {
    let y = path.file_stem()?.to_str()?.parse().ok()?;
    let x = path.parent()?.file_name()?.to_str()?.parse().ok()?;
    Some(TileCoords::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_coords_follow_endpoint_layout() {
        assert_eq!(
            tile_coords_from_path(Path::new("tiles/10/20.png")),
            Some(TileCoords::new(10, 20))
        );
        assert_eq!(tile_coords_from_path(Path::new("tile.png")), None);
        assert_eq!(tile_coords_from_path(Path::new("a/20.png")), None);
    }

    #[test]
    fn arguments_parse() {
        let cli = Cli::try_parse_from([
            "bluemarble",
            "--user-id",
            "7",
            "create",
            "img.png",
            "--coords",
            "1, 2, 3, 4",
        ])
        .unwrap();
        assert_eq!(cli.user_id, Some(7));
        match cli.command {
            Commands::Create { coords, name, .. } => {
                assert_eq!(coords, TemplateCoords::new(1, 2, 3, 4));
                assert_eq!(name, None);
            }
            _ => panic!("expected create"),
        }

        assert!(Cli::try_parse_from(["bluemarble", "create", "img.png", "--coords", "1,2"]).is_err());
        assert!(Cli::try_parse_from(["bluemarble", "composite"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
