//! The closed set of file operations and their typed call form

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use super::{OperationSpec, ParamType, ValidationError};

/// Every operation the planner can pick, by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Scan,
    Classify,
    CreateFolder,
    Move,
    Compress,
}

impl OperationKind {
    /// All kinds, in catalog registration order
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Scan,
        OperationKind::Classify,
        OperationKind::CreateFolder,
        OperationKind::Move,
        OperationKind::Compress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Scan => "scan",
            OperationKind::Classify => "classify",
            OperationKind::CreateFolder => "create_folder",
            OperationKind::Move => "move",
            OperationKind::Compress => "compress",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The signature exposed to the planner
    pub fn spec(&self) -> OperationSpec {
        match self {
            OperationKind::Scan => OperationSpec::new(
                "scan",
                "List the regular files directly inside a folder (hidden files and sub-folders are skipped). \
                 Returns one record per file with its path.",
            )
            .param("input_dir", ParamType::Path, "Folder to scan"),
            OperationKind::Classify => OperationSpec::new(
                "classify",
                "Determine the file type of one file from its extension. Returns the record with \
                 declared_type (an upper-case tag, or Unknown) and the destination_folder it belongs in.",
            )
            .param("path", ParamType::Path, "File to classify"),
            OperationKind::CreateFolder => OperationSpec::new(
                "create_folder",
                "Create the folder <output_dir>/<type_name> if it does not exist yet. Succeeds when it \
                 already exists. Returns the folder path.",
            )
            .param("output_dir", ParamType::Path, "Output root folder")
            .param("type_name", ParamType::FileType, "Type tag used as folder name, e.g. PDF"),
            OperationKind::Move => OperationSpec::new(
                "move",
                "Move a file into a destination folder, keeping its name. Fails without overwriting if a \
                 file with the same name is already there. Returns the new path.",
            )
            .param("source", ParamType::Path, "File to move")
            .param("destination_folder", ParamType::Path, "Existing folder to move the file into"),
            OperationKind::Compress => OperationSpec::new(
                "compress",
                "Compress a file with the backend configured for its type, falling back to a ZIP archive \
                 if that backend fails. Returns the compressed file path and the backend used.",
            )
            .param("path", ParamType::Path, "File under the output root to compress (an already moved file)")
            .param("file_type", ParamType::FileType, "Declared type of the file, e.g. JPG"),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A validated call with typed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Scan { input_dir: PathBuf },
    Classify { path: PathBuf },
    CreateFolder { output_dir: PathBuf, type_name: String },
    Move { source: PathBuf, destination_folder: PathBuf },
    Compress { path: PathBuf, file_type: String },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Scan { .. } => OperationKind::Scan,
            Operation::Classify { .. } => OperationKind::Classify,
            Operation::CreateFolder { .. } => OperationKind::CreateFolder,
            Operation::Move { .. } => OperationKind::Move,
            Operation::Compress { .. } => OperationKind::Compress,
        }
    }

    /// Build the typed call from arguments that already passed the schema check
    pub(crate) fn from_arguments(kind: OperationKind, arguments: &Value) -> Result<Self, ValidationError> {
        let path = |key: &str| string_arg(kind, arguments, key).map(PathBuf::from);
        let text = |key: &str| string_arg(kind, arguments, key);

        Ok(match kind {
            OperationKind::Scan => Operation::Scan {
                input_dir: path("input_dir")?,
            },
            OperationKind::Classify => Operation::Classify { path: path("path")? },
            OperationKind::CreateFolder => Operation::CreateFolder {
                output_dir: path("output_dir")?,
                type_name: text("type_name")?,
            },
            OperationKind::Move => Operation::Move {
                source: path("source")?,
                destination_folder: path("destination_folder")?,
            },
            OperationKind::Compress => Operation::Compress {
                path: path("path")?,
                file_type: text("file_type")?,
            },
        })
    }
}

fn string_arg(kind: OperationKind, arguments: &Value, key: &str) -> Result<String, ValidationError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::bad(kind.name(), format!("missing '{}'", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.spec().name, kind.name());
        }
        assert_eq!(OperationKind::from_name("delete"), None);
    }

    #[test]
    fn test_from_arguments_builds_typed_call() {
        let op = Operation::from_arguments(
            OperationKind::CreateFolder,
            &json!({"output_dir": "/out", "type_name": "PDF"}),
        )
        .unwrap();

        assert_eq!(
            op,
            Operation::CreateFolder {
                output_dir: PathBuf::from("/out"),
                type_name: "PDF".to_string()
            }
        );
        assert_eq!(op.kind(), OperationKind::CreateFolder);
    }

    #[test]
    fn test_from_arguments_missing_key() {
        let err = Operation::from_arguments(OperationKind::Move, &json!({"source": "/in/a"})).unwrap_err();
        assert!(matches!(err, ValidationError::BadArguments { .. }));
    }
}
