use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;

use log::{debug, error};

use crate::gfx::scene::SceneGraph;
use crate::lifecycle::LivenessToken;

use super::error::LoaderError;
use super::model::ModelData;

/// Bytes read so far, out of `total` when the source size is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Completed fraction in `[0, 1]`, if the total is known and non-zero
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64).min(1.0) as f32),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(u64);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type OnLoad = Box<dyn FnOnce(ModelData, &mut SceneGraph)>;
type OnProgress = Box<dyn FnMut(&LoadProgress)>;
type OnError = Box<dyn FnOnce(LoaderError)>;

/// Callbacks for a single load; at most one of `on_load`/`on_error` runs
pub struct LoadCallbacks {
    on_load: OnLoad,
    on_progress: Option<OnProgress>,
    on_error: Option<OnError>,
}

impl LoadCallbacks {
    pub fn new<F>(on_load: F) -> Self
    where
        F: FnOnce(ModelData, &mut SceneGraph) + 'static,
    {
        Self {
            on_load: Box::new(on_load),
            on_progress: None,
            on_error: None,
        }
    }

    pub fn on_progress<F>(mut self, on_progress: F) -> Self
    where
        F: FnMut(&LoadProgress) + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(LoaderError) + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

enum LoadMessage {
    Progress(LoadProgress),
    Finished(Result<ModelData, LoaderError>),
}

/// Worker-side handle reporting back to a [`LoadQueue`]
///
/// Dropping it without calling [`finish`](Self::finish) reports
/// [`LoaderError::Cancelled`], so a worker that dies still completes its load.
pub struct LoadReporter {
    id: LoadId,
    sender: mpsc::Sender<(LoadId, LoadMessage)>,
    liveness: LivenessToken,
    finished: bool,
}

impl LoadReporter {
    pub fn id(&self) -> LoadId {
        self.id
    }

    /// False once the owning queue has been closed
    pub fn is_wanted(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn progress(&self, progress: LoadProgress) {
        if self.is_wanted() {
            let _ = self.sender.send((self.id, LoadMessage::Progress(progress)));
        }
    }

    pub fn finish(mut self, result: Result<ModelData, LoaderError>) {
        self.finished = true;
        if self.is_wanted() {
            let _ = self.sender.send((self.id, LoadMessage::Finished(result)));
        }
    }
}

impl Drop for LoadReporter {
    fn drop(&mut self) {
        if !self.finished && self.is_wanted() {
            let _ = self
                .sender
                .send((self.id, LoadMessage::Finished(Err(LoaderError::Cancelled))));
        }
    }
}

/// Completion queue delivering load results on the thread that owns it
///
/// Workers only ever send messages; callbacks run inside [`pump`](Self::pump),
/// which the host calls from its event loop, so they never overlap a frame.
pub struct LoadQueue {
    sender: mpsc::Sender<(LoadId, LoadMessage)>,
    receiver: mpsc::Receiver<(LoadId, LoadMessage)>,
    pending: HashMap<LoadId, LoadCallbacks>,
    next_id: u64,
    liveness: LivenessToken,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::with_liveness(LivenessToken::new())
    }

    /// Queue whose deliveries stop when `liveness` is killed
    pub fn with_liveness(liveness: LivenessToken) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: HashMap::new(),
            next_id: 0,
            liveness,
        }
    }

    pub fn is_open(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Register callbacks for a new load and hand back its reporter
    pub fn register(&mut self, callbacks: LoadCallbacks) -> LoadReporter {
        let id = LoadId(self.next_id);
        self.next_id += 1;
        if self.is_open() {
            self.pending.insert(id, callbacks);
        } else {
            debug!("Load {id} registered on a closed queue; it will be dropped");
        }
        LoadReporter {
            id,
            sender: self.sender.clone(),
            liveness: self.liveness.clone(),
            finished: false,
        }
    }

    /// Deliver every message received so far, returning the completed loads
    pub fn pump(&mut self, graph: &mut SceneGraph) -> usize {
        let mut completed = 0;
        while let Ok((id, message)) = self.receiver.try_recv() {
            if !self.is_open() {
                self.pending.clear();
                continue;
            }
            match message {
                LoadMessage::Progress(progress) => {
                    if let Some(on_progress) = self
                        .pending
                        .get_mut(&id)
                        .and_then(|callbacks| callbacks.on_progress.as_mut())
                    {
                        on_progress(&progress);
                    }
                }
                LoadMessage::Finished(result) => {
                    let Some(callbacks) = self.pending.remove(&id) else {
                        continue;
                    };
                    completed += 1;
                    match result {
                        Ok(data) => (callbacks.on_load)(data, graph),
                        Err(err) => match callbacks.on_error {
                            Some(on_error) => on_error(err),
                            None => error!("Model load {id} failed: {err}"),
                        },
                    }
                }
            }
        }
        completed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending load and stop delivering; irreversible
    pub fn close(&mut self) {
        self.liveness.kill();
        self.pending.clear();
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::ModelNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn object(name: &str) -> ModelData {
        ModelData::Object(ModelNode::new(name))
    }

    #[test]
    fn test_progress_then_single_completion() {
        let mut queue = LoadQueue::new();
        let mut graph = SceneGraph::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (on_load_log, on_progress_log) = (log.clone(), log.clone());
        let reporter = queue.register(
            LoadCallbacks::new(move |data, graph: &mut SceneGraph| {
                graph.add_tree(&data.into_node(), None);
                on_load_log.borrow_mut().push("load".to_string());
            })
            .on_progress(move |p| on_progress_log.borrow_mut().push(format!("{}", p.loaded))),
        );
        reporter.progress(LoadProgress {
            loaded: 10,
            total: Some(20),
        });
        reporter.finish(Ok(object("a")));

        assert_eq!(queue.pump(&mut graph), 1);
        assert_eq!(*log.borrow(), vec!["10".to_string(), "load".to_string()]);
        assert_eq!(graph.len(), 1);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.pump(&mut graph), 0);
    }

    #[test]
    fn test_dropped_reporter_reports_cancelled() {
        let mut queue = LoadQueue::new();
        let mut graph = SceneGraph::new();
        let failed = Rc::new(RefCell::new(None));
        let sink = failed.clone();

        let reporter = queue.register(
            LoadCallbacks::new(|_, _: &mut SceneGraph| panic!("should not load"))
                .on_error(move |err| *sink.borrow_mut() = Some(err)),
        );
        drop(reporter);

        assert_eq!(queue.pump(&mut graph), 1);
        assert!(matches!(*failed.borrow(), Some(LoaderError::Cancelled)));
    }

    #[test]
    fn test_closed_queue_drops_completions() {
        let mut queue = LoadQueue::new();
        let mut graph = SceneGraph::new();
        let reporter = queue.register(LoadCallbacks::new(|_, _: &mut SceneGraph| {
            panic!("completion after close")
        }));
        queue.close();
        assert!(!reporter.is_wanted());
        reporter.finish(Ok(object("late")));
        assert_eq!(queue.pump(&mut graph), 0);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_fraction() {
        let progress = LoadProgress {
            loaded: 5,
            total: Some(10),
        };
        assert_eq!(progress.fraction(), Some(0.5));
        assert_eq!(
            LoadProgress {
                loaded: 5,
                total: None
            }
            .fraction(),
            None
        );
    }
}
