use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::error::ParseError;
use super::format::ModelFormat;
use super::model::ModelData;
use super::parsers;

/// A format parser turning raw bytes into a typed model result
///
/// Parsers run on loader worker threads. `source` is the path the bytes came
/// from and is used to resolve companion files (materials, buffers).
pub trait ModelParser: Send + Sync {
    fn parse(&self, bytes: &[u8], source: &Path) -> Result<ModelData, ParseError>;
}

impl<F> ModelParser for F
where
    F: Fn(&[u8], &Path) -> Result<ModelData, ParseError> + Send + Sync,
{
    fn parse(&self, bytes: &[u8], source: &Path) -> Result<ModelData, ParseError> {
        self(bytes, source)
    }
}

/// Format-keyed parser table
///
/// The default registry carries the built-in OBJ, GLTF, STL and PLY parsers.
/// FBX, Collada and Rhino3dm have no built-in parser; hosts register one.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<ModelFormat, Arc<dyn ModelParser>>,
}

impl ParserRegistry {
    /// Registry with no parsers at all
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry with the built-in parsers
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ModelFormat::Obj, parsers::obj::parse);
        registry.register(ModelFormat::Gltf, parsers::gltf_scene::parse);
        registry.register(ModelFormat::Stl, parsers::stl::parse);
        registry.register(ModelFormat::Ply, parsers::ply::parse);
        registry
    }

    /// Install `parser` for `format`, returning the one it replaces
    pub fn register<P>(&mut self, format: ModelFormat, parser: P) -> Option<Arc<dyn ModelParser>>
    where
        P: ModelParser + 'static,
    {
        self.parsers.insert(format, Arc::new(parser))
    }

    pub fn get(&self, format: ModelFormat) -> Option<Arc<dyn ModelParser>> {
        self.parsers.get(&format).cloned()
    }

    pub fn contains(&self, format: ModelFormat) -> bool {
        self.parsers.contains_key(&format)
    }

    /// Formats with a parser, in canonical order
    pub fn formats(&self) -> Vec<ModelFormat> {
        ModelFormat::ALL
            .into_iter()
            .filter(|format| self.contains(*format))
            .collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
