//! Output file naming and path helpers

use std::path::{Path, PathBuf};

use crate::domain::model::SaveMode;

/// Names output files after the input and the save mode
#[derive(Debug, Clone)]
pub struct OutputNamer {
    stem: String,
    directory: PathBuf,
}

impl OutputNamer {
    /// Namer for outputs of `input` written into `directory`
    pub fn new(input: &Path, directory: &Path) -> Self {
        Self {
            stem: file_stem(input),
            directory: directory.to_path_buf(),
        }
    }

    /// Path for the single output of a joined save
    pub fn joined(&self, save_mode: SaveMode, extension: &str) -> PathBuf {
        let suffix = match save_mode {
            SaveMode::RemoveSelections => "cleaned",
            _ => "edited",
        };
        self.file(&format!("{}_{}", self.stem, suffix), extension)
    }

    /// Path for part `index` (0-based) of a split save; names are 1-based
    pub fn part(&self, save_mode: SaveMode, index: usize, extension: &str) -> PathBuf {
        let label = match save_mode {
            SaveMode::SplitByTags => "tag_split",
            _ => "part",
        };
        self.file(&format!("{}_{}_{}", self.stem, label, index + 1), extension)
    }

    fn file(&self, name: &str, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", name, extension))
    }
}

/// File stem of `path`, or "output" when it has none
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "output".to_string())
}

/// Lowercase extension of `path` without the dot
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Path text as written into a concat manifest.
///
/// Separators are normalized to `/` and single quotes are closed,
/// escaped, and reopened.
pub fn manifest_quote(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    format!("'{}'", text.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_names() {
        let namer = OutputNamer::new(Path::new("/videos/holiday.mp4"), Path::new("/out"));

        assert_eq!(
            namer.joined(SaveMode::KeepSelections, "mp4"),
            PathBuf::from("/out/holiday_edited.mp4")
        );
        assert_eq!(
            namer.joined(SaveMode::RemoveSelections, "mkv"),
            PathBuf::from("/out/holiday_cleaned.mkv")
        );
    }

    #[test]
    fn test_part_names_are_one_based() {
        let namer = OutputNamer::new(Path::new("clip.mov"), Path::new("out"));

        assert_eq!(
            namer.part(SaveMode::SplitBySelections, 0, "mov"),
            PathBuf::from("out/clip_part_1.mov")
        );
        assert_eq!(
            namer.part(SaveMode::SplitByTags, 2, "gif"),
            PathBuf::from("out/clip_tag_split_3.gif")
        );
    }

    #[test]
    fn test_extension_and_stem() {
        assert_eq!(extension(Path::new("a/B.MKV")), Some("mkv".to_string()));
        assert_eq!(extension(Path::new("noext")), None);
        assert_eq!(file_stem(Path::new("/")), "output");
    }

    #[test]
    fn test_manifest_quote_escapes_single_quotes() {
        assert_eq!(
            manifest_quote(Path::new("/tmp/it's here.mp4")),
            r"'/tmp/it'\''s here.mp4'"
        );
    }
}
