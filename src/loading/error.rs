use super::format::ModelFormat;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("unsupported model format: {0}")]
    UnknownFormat(String),
    #[error("no parser registered for {0} models")]
    ParserUnavailable(ModelFormat),
    #[error("unsupported source scheme in {0}")]
    UnsupportedScheme(String),
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} model at {path}: {source}")]
    Parse {
        format: ModelFormat,
        path: String,
        #[source]
        source: ParseError,
    },
    #[error("model load was cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("invalid glTF data: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
    #[error("{0} contains no geometry")]
    Empty(&'static str),
    #[error("{0}")]
    Custom(String),
}

impl ParseError {
    pub fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        ParseError::Malformed {
            format,
            message: message.into(),
        }
    }
}
