use std::fs::File;
use std::future::Future;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use futures::channel::oneshot;
use log::{debug, error, info, warn};

use super::error::LoaderError;
use super::format::ModelFormat;
use super::model::ModelData;
use super::queue::{LoadCallbacks, LoadId, LoadProgress, LoadQueue, LoadReporter};
use super::registry::{ModelParser, ParserRegistry};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Format-bound loader facade
///
/// Construction fixes the format; every load reads the source on a worker
/// thread, parses it, marks the result selectable and reports back through a
/// [`LoadQueue`].
#[derive(Clone)]
pub struct ModelLoader {
    format: ModelFormat,
    parser: Arc<dyn ModelParser>,
}

impl ModelLoader {
    /// Loader for `tag` using the built-in parsers
    pub fn new(tag: &str) -> Result<Self, LoaderError> {
        Self::with_registry(tag, &ParserRegistry::default())
    }

    pub fn with_registry(tag: &str, registry: &ParserRegistry) -> Result<Self, LoaderError> {
        let format: ModelFormat = tag.parse()?;
        Self::for_format(format, registry)
    }

    pub fn for_format(format: ModelFormat, registry: &ParserRegistry) -> Result<Self, LoaderError> {
        let parser = registry
            .get(format)
            .ok_or(LoaderError::ParserUnavailable(format))?;
        Ok(Self { format, parser })
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    /// Parse in-memory bytes and run the selectable pass
    pub fn parse_bytes(&self, bytes: &[u8], source: &Path) -> Result<ModelData, LoaderError> {
        let mut data = self
            .parser
            .parse(bytes, source)
            .map_err(|source_err| LoaderError::Parse {
                format: self.format,
                path: source.display().to_string(),
                source: source_err,
            })?;
        data.mark_selectable();
        Ok(data)
    }

    /// Load on the calling thread
    pub fn load_blocking(&self, url: &str) -> Result<ModelData, LoaderError> {
        let path = resolve_source(url)?;
        let bytes = read_source(&path, |_| {})?;
        self.parse_bytes(&bytes, &path)
    }

    /// Start an asynchronous load
    ///
    /// Callbacks run from [`LoadQueue::pump`]: any number of progress reports
    /// followed by exactly one of `on_load` or `on_error`, unless the queue
    /// is closed first.
    pub fn load(&self, queue: &mut LoadQueue, url: &str, callbacks: LoadCallbacks) -> LoadId {
        let reporter = queue.register(callbacks);
        let id = reporter.id();
        if !reporter.is_wanted() {
            return id;
        }

        let path = match resolve_source(url) {
            Ok(path) => path,
            Err(err) => {
                warn!("Refusing to load {url}: {err}");
                reporter.finish(Err(err));
                return id;
            }
        };

        info!("Loading {} model {} (load {id})", self.format, path.display());
        let loader = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("vantage-load-{id}"))
            .spawn(move || loader.run_worker(path, reporter));
        // A failed spawn drops the reporter, which reports cancellation
        if let Err(err) = spawned {
            error!("Failed to start loader thread for load {id}: {err}");
        }
        id
    }

    /// Future flavour of [`load`](Self::load)
    ///
    /// The future resolves once the queue delivers the result; a closed queue
    /// resolves it to [`LoaderError::Cancelled`]. The data is handed back
    /// rather than inserted into the graph.
    pub fn load_async(
        &self,
        queue: &mut LoadQueue,
        url: &str,
    ) -> impl Future<Output = Result<ModelData, LoaderError>> + 'static {
        let (sender, receiver) = oneshot::channel();
        let on_load_sender = std::rc::Rc::new(std::cell::RefCell::new(Some(sender)));
        let on_error_sender = on_load_sender.clone();

        let callbacks = LoadCallbacks::new(move |data, _graph| {
            if let Some(sender) = on_load_sender.borrow_mut().take() {
                let _ = sender.send(Ok(data));
            }
        })
        .on_error(move |err| {
            if let Some(sender) = on_error_sender.borrow_mut().take() {
                let _ = sender.send(Err(err));
            }
        });
        self.load(queue, url, callbacks);

        async move { receiver.await.unwrap_or(Err(LoaderError::Cancelled)) }
    }

    fn run_worker(&self, path: PathBuf, reporter: LoadReporter) {
        let result = read_source(&path, |progress| reporter.progress(progress))
            .and_then(|bytes| {
                if !reporter.is_wanted() {
                    return Err(LoaderError::Cancelled);
                }
                self.parse_bytes(&bytes, &path)
            });

        match &result {
            Ok(_) => info!("Loaded {} model {}", self.format, path.display()),
            Err(LoaderError::Cancelled) => debug!("Load of {} abandoned", path.display()),
            Err(err) => error!("{err}"),
        }
        reporter.finish(result);
    }
}

/// Map a load URL to a local path; only bare paths and `file://` are readable
pub fn resolve_source(url: &str) -> Result<PathBuf, LoaderError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(LoaderError::UnsupportedScheme(url.to_string()));
    }
    Ok(PathBuf::from(url))
}

fn read_source(
    path: &Path,
    mut on_progress: impl FnMut(LoadProgress),
) -> Result<Vec<u8>, LoaderError> {
    let read_error = |source: io::Error| LoaderError::Read {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let total = file.metadata().ok().map(|metadata| metadata.len());
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(read_error(err)),
        };
        bytes.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }
    Ok(bytes)
}
