//! File watching for shader and texture hot-reload

use anyhow::{Context, Result};
use notify::RecommendedWatcher;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, Debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use winit::event_loop::EventLoopProxy;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// What a batch of file changes asks the viewer to rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadRequest {
    pub shaders: bool,
    pub textures: bool,
}

impl ReloadRequest {
    pub fn any(&self) -> bool {
        self.shaders || self.textures
    }
}

/// Files whose changes trigger a reload
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    shaders: Vec<PathBuf>,
    textures: Vec<PathBuf>,
}

impl WatchSet {
    pub fn new(shaders: Vec<PathBuf>, textures: Vec<PathBuf>) -> Self {
        Self {
            shaders: shaders.iter().map(|p| normalize(p)).collect(),
            textures: textures.iter().map(|p| normalize(p)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty() && self.textures.is_empty()
    }

    /// Parent directories to watch; editors often replace files rather than write them
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.shaders
            .iter()
            .chain(&self.textures)
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn classify<'a>(&self, changed: impl IntoIterator<Item = &'a Path>) -> ReloadRequest {
        let mut request = ReloadRequest::default();
        for path in changed {
            let path = normalize(path);
            request.shaders |= self.shaders.contains(&path);
            request.textures |= self.textures.contains(&path);
        }
        request
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Watch `set` and forward reload requests to the event loop.
///
/// The returned debouncer stops watching when dropped.
pub fn spawn(set: WatchSet, proxy: EventLoopProxy<ReloadRequest>) -> Result<Debouncer<RecommendedWatcher>> {
    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(DEBOUNCE, tx).context("Failed to create file watcher")?;
    for dir in set.dirs() {
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        log::info!("Watching {}", dir.display());
    }

    std::thread::spawn(move || {
        for result in rx {
            match result {
                Ok(events) => {
                    let request = set.classify(events.iter().map(|e| e.path.as_path()));
                    if request.any() && proxy.send_event(request).is_err() {
                        // event loop has exited
                        break;
                    }
                }
                Err(e) => log::warn!("Watch error: {:?}", e),
            }
        }
    });

    Ok(debouncer)
}
