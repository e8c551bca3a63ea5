use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::LoaderError;

/// Closed set of model formats the loader facade accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Obj,
    Fbx,
    Gltf,
    Collada,
    Rhino3dm,
    Stl,
    Ply,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 7] = [
        ModelFormat::Obj,
        ModelFormat::Fbx,
        ModelFormat::Gltf,
        ModelFormat::Collada,
        ModelFormat::Rhino3dm,
        ModelFormat::Stl,
        ModelFormat::Ply,
    ];

    /// Canonical format tag
    pub fn tag(&self) -> &'static str {
        match self {
            ModelFormat::Obj => "OBJ",
            ModelFormat::Fbx => "FBX",
            ModelFormat::Gltf => "GLTF",
            ModelFormat::Collada => "Collada",
            ModelFormat::Rhino3dm => "Rhino3dm",
            ModelFormat::Stl => "STL",
            ModelFormat::Ply => "PLY",
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "obj" => Some(ModelFormat::Obj),
            "fbx" => Some(ModelFormat::Fbx),
            "gltf" | "glb" => Some(ModelFormat::Gltf),
            "dae" => Some(ModelFormat::Collada),
            "3dm" => Some(ModelFormat::Rhino3dm),
            "stl" => Some(ModelFormat::Stl),
            "ply" => Some(ModelFormat::Ply),
            _ => None,
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelFormat {
    type Err = LoaderError;

    /// Tags match exactly; anything outside the closed set is rejected
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ModelFormat::ALL
            .into_iter()
            .find(|format| format.tag() == tag)
            .ok_or_else(|| LoaderError::UnknownFormat(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for format in ModelFormat::ALL {
            assert_eq!(format.tag().parse::<ModelFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        for tag in ["USDZ", "obj", "", "Gltf"] {
            assert!(matches!(
                tag.parse::<ModelFormat>(),
                Err(LoaderError::UnknownFormat(t)) if t == tag
            ));
        }
    }

    #[test]
    fn test_extension_guess() {
        assert_eq!(ModelFormat::from_path("scene/Helmet.GLB"), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_path("part.stl"), Some(ModelFormat::Stl));
        assert_eq!(ModelFormat::from_path("notes.txt"), None);
        assert_eq!(ModelFormat::from_path("no_extension"), None);
    }
}
