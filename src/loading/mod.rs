pub mod error;
pub mod format;
pub mod loader;
pub mod model;
pub mod parsers;
pub mod queue;
pub mod registry;

pub use error::{LoaderError, ParseError};
pub use format::ModelFormat;
pub use loader::{resolve_source, ModelLoader};
pub use model::{Geometry, ModelData, SceneAsset};
pub use queue::{LoadCallbacks, LoadId, LoadProgress, LoadQueue, LoadReporter};
pub use registry::{ModelParser, ParserRegistry};
