//! OpsExecutor - runs a validated Operation against an OpsContext

use serde_json::{Value, json};
use tracing::debug;

use super::{ExecutionError, OpsContext, classify, compress, create_folder, move_file, scan};
use crate::catalog::Operation;

/// Dispatches typed operations to the file operation primitives
#[derive(Debug, Clone)]
pub struct OpsExecutor {
    ctx: OpsContext,
}

impl OpsExecutor {
    pub fn new(ctx: OpsContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &OpsContext {
        &self.ctx
    }

    /// Execute one operation; the result is the JSON recorded in history
    pub async fn execute(&self, operation: &Operation) -> Result<Value, ExecutionError> {
        debug!(kind = %operation.kind(), "OpsExecutor::execute: called");
        let ctx = &self.ctx;
        match operation {
            Operation::Scan { input_dir } => {
                let files = scan(ctx, input_dir).await?;
                Ok(json!({ "files": files }))
            }
            Operation::Classify { path } => Ok(json!(classify(ctx, path)?)),
            Operation::CreateFolder { output_dir, type_name } => {
                let folder = create_folder(ctx, output_dir, type_name).await?;
                Ok(json!({ "folder": folder }))
            }
            Operation::Move {
                source,
                destination_folder,
            } => {
                let moved = move_file(ctx, source, destination_folder).await?;
                Ok(json!({ "moved_path": moved }))
            }
            Operation::Compress { path, file_type } => Ok(json!(compress(ctx, path, file_type).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{BackendSet, CompressionSelector, ZipBackend};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_execute_dispatches_each_kind() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(input.join("notes.txt"), "hello").unwrap();

        let executor = OpsExecutor::new(OpsContext::new(
            input.clone(),
            output.clone(),
            &["PDF".to_string()],
            CompressionSelector::default(),
            BackendSet::new().with_backend(Arc::new(ZipBackend)),
        ));

        let scanned = executor
            .execute(&Operation::Scan {
                input_dir: input.clone(),
            })
            .await
            .unwrap();
        assert_eq!(scanned["files"].as_array().unwrap().len(), 1);

        let classified = executor
            .execute(&Operation::Classify {
                path: input.join("notes.txt"),
            })
            .await
            .unwrap();
        assert_eq!(classified["declared_type"], "Unknown");

        let folder = executor
            .execute(&Operation::CreateFolder {
                output_dir: output.clone(),
                type_name: "Unknown".to_string(),
            })
            .await
            .unwrap();
        assert!(folder["folder"].as_str().unwrap().ends_with("Unknown"));

        let moved = executor
            .execute(&Operation::Move {
                source: input.join("notes.txt"),
                destination_folder: output.join("Unknown"),
            })
            .await
            .unwrap();
        let moved_path = moved["moved_path"].as_str().unwrap().to_string();

        let compressed = executor
            .execute(&Operation::Compress {
                path: moved_path.into(),
                file_type: "Unknown".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(compressed["backend"], "generic-archive");
        assert_eq!(compressed["used_fallback"], false);
    }
}
