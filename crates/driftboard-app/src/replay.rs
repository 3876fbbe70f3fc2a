//! Replay a recorded input script against a stored canvas.

use crate::shortcuts::ShortcutRegistry;
use driftboard_core::assets::MemoryAssetStorage;
use driftboard_core::storage::StorageError;
use driftboard_core::{
    BoardConfig, BoardEvent, BoardSession, CanvasRecord, CanvasStorage, ConfigError, FileStorage, InputEvent,
};
use driftboard_render::{FrameRecorder, GridStyle, RenderContext, Renderer, RendererError};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use clap::Parser;
use thiserror::Error;

/// Upper bound on extra polls while draining asset work after the script.
const MAX_DRAIN_ROUNDS: usize = 64;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Command line options.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "driftboard-replay",
    about = "Replay a recorded input script against a stored canvas",
    after_help = ShortcutRegistry::help_text()
)]
pub struct ReplayOptions {
    /// Canvas to load and save.
    pub canvas_id: String,
    /// JSON array of input events.
    pub script: PathBuf,
    /// Canvas directory; the platform data directory when absent.
    #[arg(long = "storage", value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory whose files are served as assets, keyed by file name.
    #[arg(long = "assets", value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,
    /// Grid style: lines, dots or none.
    #[arg(long = "grid", value_parser = parse_grid_style, default_value = "lines")]
    pub grid_style: GridStyle,
}

fn parse_grid_style(name: &str) -> Result<GridStyle, String> {
    GridStyle::from_name(name).ok_or_else(|| format!("unknown grid style {name}"))
}

/// What a replay did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub events: usize,
    pub frames: u64,
    pub elements: usize,
    pub commits: usize,
    pub asset_failures: usize,
    pub scale: f64,
}

fn load_assets(dir: &Path) -> Result<MemoryAssetStorage, ReplayError> {
    let storage = MemoryAssetStorage::new();
    let io_err = |source| ReplayError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)?.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        let bytes = fs::read(&path).map_err(|source| ReplayError::Io {
            path: path.clone(),
            source,
        })?;
        if let Err(e) = storage.insert(name, bytes) {
            log::warn!("skipping asset {}: {}", path.display(), e);
        }
    }
    Ok(storage)
}

fn read_script(path: &Path) -> Result<Vec<InputEvent>, ReplayError> {
    let json = fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ReplayError::Script {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the canvas, replay the script, and save the result.
pub async fn run(options: &ReplayOptions) -> Result<ReplaySummary, ReplayError> {
    let config = match &options.config {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    config.validate()?;

    let storage = match &options.storage_dir {
        Some(dir) => FileStorage::new(dir.clone())?,
        None => FileStorage::default_location()?,
    }
    .with_defaults(config.elements);

    let assets = match &options.assets_dir {
        Some(dir) => load_assets(dir)?,
        None => MemoryAssetStorage::new(),
    };

    let record = match storage.load(&options.canvas_id).await {
        Ok(record) => record,
        Err(StorageError::NotFound(_)) => {
            log::info!("canvas {} not found, starting empty", options.canvas_id);
            CanvasRecord::new(options.canvas_id.clone())
        }
        Err(e) => return Err(e.into()),
    };
    let script = read_script(&options.script)?;

    let mut session = BoardSession::new(config, Arc::new(assets));
    let commits = Rc::new(Cell::new(0));
    let asset_failures = Rc::new(Cell::new(0));
    {
        let commits = Rc::clone(&commits);
        let asset_failures = Rc::clone(&asset_failures);
        session.subscribe(move |event| {
            log::debug!("{:?}", event);
            match event {
                BoardEvent::ElementCommitted(_) => commits.set(commits.get() + 1),
                BoardEvent::AssetFailed { id, message } => {
                    log::warn!("image for {} unavailable: {}", id, message);
                    asset_failures.set(asset_failures.get() + 1);
                }
                _ => {}
            }
        });
    }
    session.load_canvas(record);

    let mut renderer = FrameRecorder::new();
    for event in &script {
        session.handle(event);
        session.pump_assets();
        renderer.build_scene(&RenderContext::new(&session).with_grid(options.grid_style))?;
    }

    for _ in 0..MAX_DRAIN_ROUNDS {
        if session.assets().is_idle() {
            break;
        }
        session.pump_assets();
    }
    if !session.assets().is_idle() {
        log::warn!("asset work still outstanding after replay");
    }

    session.close();
    let record = session.to_record();
    storage.save(&options.canvas_id, &record).await?;

    let summary = ReplaySummary {
        events: script.len(),
        frames: renderer.frames_built(),
        elements: record.elements.len(),
        commits: commits.get(),
        asset_failures: asset_failures.get(),
        scale: record.scale,
    };
    log::info!(
        "replayed {} events over {} frames: {} elements, {} commits, scale {:.3}",
        summary.events,
        summary.frames,
        summary.elements,
        summary.commits,
        summary.scale
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftboard_core::{Element, ElementId};
    use kurbo::{Point, Size};
    use tempfile::tempdir;

    fn parse(list: &[&str]) -> Result<ReplayOptions, clap::Error> {
        ReplayOptions::try_parse_from(std::iter::once("driftboard-replay").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let options = parse(&["board", "script.json", "--grid", "dots", "--storage", "/tmp/x"]).unwrap();
        assert_eq!(options.canvas_id, "board");
        assert_eq!(options.script, PathBuf::from("script.json"));
        assert_eq!(options.grid_style, GridStyle::Dots);
        assert_eq!(options.storage_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(options.assets_dir, None);

        let defaults = parse(&["board", "script.json"]).unwrap();
        assert_eq!(defaults.grid_style, GridStyle::Lines);

        assert!(parse(&["board"]).is_err());
        assert!(parse(&["a", "b", "--storage"]).is_err());
        assert!(parse(&["a", "b", "--bogus"]).is_err());
        assert!(parse(&["a", "b", "--grid", "crosses"]).is_err());
    }

    #[test]
    fn test_help_lists_bindings() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("Escape"));
    }

    #[test]
    fn test_replay_moves_element_and_saves() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("canvases")).unwrap();
        let mut record = CanvasRecord::new("board");
        record.elements.push(Element::text(
            ElementId::new("a"),
            "note",
            Point::new(0.0, 0.0),
            Size::new(100.0, 50.0),
        ));
        pollster::block_on(storage.save("board", &record)).unwrap();

        let script = dir.path().join("script.json");
        fs::write(
            &script,
            r#"[
                {"type": "pointer_down", "x": 10, "y": 10},
                {"type": "pointer_move", "x": 30, "y": 20},
                {"type": "pointer_up", "x": 40, "y": 30},
                {"type": "wheel", "x": 400, "y": 300, "delta_y": -1}
            ]"#,
        )
        .unwrap();

        let options = ReplayOptions {
            canvas_id: "board".to_string(),
            script,
            storage_dir: Some(dir.path().join("canvases")),
            config: None,
            assets_dir: None,
            grid_style: GridStyle::Lines,
        };
        let summary = pollster::block_on(run(&options)).unwrap();
        assert_eq!(summary.events, 4);
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.elements, 1);
        assert!(summary.commits >= 1);
        assert!((summary.scale - 1.1).abs() < 1e-9);

        let saved = pollster::block_on(storage.load("board")).unwrap();
        assert_eq!(saved.elements[0].position, Point::new(30.0, 20.0));
        assert!((saved.position.x + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_replay_resolves_assets_from_directory() {
        let dir = tempdir().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]));
        img.save(assets.join("pic.png")).unwrap();

        let storage = FileStorage::new(dir.path().join("canvases")).unwrap();
        fs::write(
            storage.base_path().join("board.json"),
            r#"{"elements":[{"id":"i","type":"image","src":"pic.png"},
                            {"id":"j","type":"image","src":"gone.png","x":300}]}"#,
        )
        .unwrap();
        let script = dir.path().join("script.json");
        fs::write(&script, "[]").unwrap();

        let options = ReplayOptions {
            canvas_id: "board".to_string(),
            script,
            storage_dir: Some(dir.path().join("canvases")),
            config: None,
            assets_dir: Some(assets),
            grid_style: GridStyle::None,
        };
        let summary = pollster::block_on(run(&options)).unwrap();
        assert_eq!(summary.asset_failures, 1);
        assert_eq!(summary.elements, 2);
    }

    #[test]
    fn test_bad_script_is_reported() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("script.json");
        fs::write(&script, r#"[{"type": "teleport"}]"#).unwrap();
        let options = ReplayOptions {
            canvas_id: "board".to_string(),
            script,
            storage_dir: Some(dir.path().to_path_buf()),
            config: None,
            assets_dir: None,
            grid_style: GridStyle::Lines,
        };
        assert!(matches!(
            pollster::block_on(run(&options)),
            Err(ReplayError::Script { .. })
        ));
    }
}
