//! Extension-based file categories.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Semantic bucket for a file, used for statistics and display hints.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Code,
    Font,
    #[serde(rename = "3d_cad")]
    #[strum(to_string = "3d_cad")]
    Cad3d,
    Other,
}

impl FileCategory {
    /// Classify an extension, with or without its leading dot.
    ///
    /// Total: unknown and empty extensions are [`FileCategory::Other`].
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "svg" | "cr2"
            | "cr3" | "nef" | "arw" | "dng" | "iiq" | "3fr" | "orf" | "rw2" | "pef" | "dpx"
            | "exr" | "hdr" => Self::Image,

            "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg"
            | "r3d" | "braw" | "mxf" | "prores" | "mts" | "vob" | "ts" | "ogv" => Self::Video,

            "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "aiff" | "aif" | "m4a" | "opus"
            | "mid" | "midi" => Self::Audio,

            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "pages" | "ai" | "eps" | "indd"
            | "psd" | "xlsx" | "xls" | "ppt" | "pptx" | "csv" | "md" | "xml" | "json" | "yml"
            | "yaml" => Self::Document,

            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "dmg" | "iso" | "img" | "vhd"
            | "vmdk" => Self::Archive,

            "js" | "jsx" | "tsx" | "html" | "css" | "py" | "java" | "cpp" | "c" | "h" | "sql"
            | "sh" | "bat" | "cmd" | "ps1" | "php" | "rb" | "go" | "rs" | "swift" | "kt" => {
                Self::Code
            }

            "ttf" | "otf" | "woff" | "woff2" => Self::Font,

            "obj" | "fbx" | "gltf" | "glb" | "stl" | "cad" | "dwg" | "dxf" => Self::Cad3d,

            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_common_extensions() {
        assert_eq!(FileCategory::from_extension(".jpg"), FileCategory::Image);
        assert_eq!(FileCategory::from_extension("CR3"), FileCategory::Image);
        assert_eq!(FileCategory::from_extension(".braw"), FileCategory::Video);
        assert_eq!(FileCategory::from_extension(".flac"), FileCategory::Audio);
        assert_eq!(FileCategory::from_extension(".txt"), FileCategory::Document);
        assert_eq!(FileCategory::from_extension(".vmdk"), FileCategory::Archive);
        assert_eq!(FileCategory::from_extension(".rs"), FileCategory::Code);
        assert_eq!(FileCategory::from_extension(".woff2"), FileCategory::Font);
        assert_eq!(FileCategory::from_extension(".stl"), FileCategory::Cad3d);
    }

    #[test]
    fn test_ambiguous_extensions_pick_first_bucket() {
        // Transport streams win over TypeScript, data formats count as documents.
        assert_eq!(FileCategory::from_extension(".ts"), FileCategory::Video);
        assert_eq!(FileCategory::from_extension(".json"), FileCategory::Document);
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(FileCategory::from_extension(""), FileCategory::Other);
        assert_eq!(FileCategory::from_extension("."), FileCategory::Other);
        assert_eq!(FileCategory::from_extension(".xyz123"), FileCategory::Other);
    }

    #[test]
    fn test_names_round_trip() {
        for category in FileCategory::iter() {
            let name = category.to_string();
            assert_eq!(FileCategory::from_str(&name).unwrap(), category);
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{name}\""));
        }
        assert_eq!(FileCategory::Cad3d.as_ref(), "3d_cad");
    }
}
