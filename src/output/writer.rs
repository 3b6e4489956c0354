//! Scoped output files written atomically into the compile directory

use crate::output::OutputError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Options carried by every file of one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent: usize,
    pub reveal: bool,
    pub target_name: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            reveal: false,
            target_name: None,
        }
    }
}

/// Sink for one output item.
pub trait FileWriter {
    fn write_json(&mut self, value: &Value) -> Result<(), OutputError>;
    fn write_yaml(&mut self, value: &Value) -> Result<(), OutputError>;
    fn write_text(&mut self, value: &Value) -> Result<(), OutputError>;
}

/// A destination file staged in a temporary file next to it.
///
/// Nothing appears at the destination until [`CompiledFile::commit`]; dropping
/// an uncommitted file deletes the staged content.
pub struct CompiledFile {
    path: PathBuf,
    staged: NamedTempFile,
    options: WriteOptions,
}

impl CompiledFile {
    pub fn create(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self, OutputError> {
        let path = path.as_ref().to_path_buf();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let io = |source| OutputError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(parent).map_err(io)?;
        let staged = NamedTempFile::new_in(parent).map_err(io)?;

        Ok(Self {
            path,
            staged,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    fn io_error(&self, source: std::io::Error) -> OutputError {
        OutputError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Flushes the staged content and moves it to the destination path.
    pub fn commit(mut self) -> Result<PathBuf, OutputError> {
        self.staged
            .as_file_mut()
            .sync_all()
            .map_err(|source| OutputError::Io {
                path: self.path.clone(),
                source,
            })?;

        let path = self.path;
        self.staged
            .persist(&path)
            .map_err(|e| OutputError::Persist {
                path: path.clone(),
                source: e.error,
            })?;

        debug!(
            "Wrote {} (target: {}, reveal: {})",
            path.display(),
            self.options.target_name.as_deref().unwrap_or("-"),
            self.options.reveal
        );
        Ok(path)
    }
}

impl FileWriter for CompiledFile {
    fn write_json(&mut self, value: &Value) -> Result<(), OutputError> {
        let indent = vec![b' '; self.options.indent];
        let mut writer = BufWriter::new(self.staged.as_file_mut());
        let mut serializer = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(&indent));
        value
            .serialize(&mut serializer)
            .map_err(|e| OutputError::Encode {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        writer.flush().map_err(|source| OutputError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_yaml(&mut self, value: &Value) -> Result<(), OutputError> {
        let mut writer = BufWriter::new(self.staged.as_file_mut());
        serde_yaml::to_writer(&mut writer, value).map_err(|e| OutputError::Encode {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        writer.flush().map_err(|source| OutputError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_text(&mut self, value: &Value) -> Result<(), OutputError> {
        let text = match value {
            Value::String(text) => text,
            other => {
                return Err(OutputError::NotText {
                    path: self.path.clone(),
                    found: json_type(other).to_string(),
                })
            }
        };
        self.staged
            .as_file_mut()
            .write_all(text.as_bytes())
            .map_err(|e| self.io_error(e))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
