//! FileRecord and declared file types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Folder and tag used for files outside the configured type set
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Declared type of a file: a configured tag or Unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    Known(String),
    Unknown,
}

impl FileType {
    /// Parse a tag as given by the planner; "unknown" in any case is Unknown
    pub fn parse(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case(UNKNOWN_TYPE) {
            FileType::Unknown
        } else {
            FileType::Known(tag.to_ascii_uppercase())
        }
    }

    /// Name of the type folder under the output root
    pub fn folder_name(&self) -> &str {
        match self {
            FileType::Known(tag) => tag,
            FileType::Unknown => UNKNOWN_TYPE,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, FileType::Known(_))
    }
}

impl From<String> for FileType {
    fn from(tag: String) -> Self {
        FileType::parse(&tag)
    }
}

impl From<FileType> for String {
    fn from(file_type: FileType) -> Self {
        file_type.folder_name().to_string()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// One file seen during a run
///
/// Produced by scan (type not yet known) and filled in by classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<FileType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_folder: Option<PathBuf>,
}

impl FileRecord {
    pub fn unclassified(path: PathBuf) -> Self {
        Self {
            path,
            declared_type: None,
            destination_folder: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(FileType::parse("jpg"), FileType::Known("JPG".to_string()));
        assert_eq!(FileType::parse("UNKNOWN"), FileType::Unknown);
        assert_eq!(FileType::parse("Unknown").folder_name(), "Unknown");
    }

    #[test]
    fn test_record_serialization() {
        let record = FileRecord {
            path: PathBuf::from("/in/photo.jpg"),
            declared_type: Some(FileType::Known("JPG".to_string())),
            destination_folder: Some(PathBuf::from("/out/JPG")),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["declared_type"], "JPG");
        assert_eq!(json["destination_folder"], "/out/JPG");

        let bare = serde_json::to_value(FileRecord::unclassified(PathBuf::from("/in/a"))).unwrap();
        assert!(bare.get("declared_type").is_none());
    }
}
