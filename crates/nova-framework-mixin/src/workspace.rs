use std::path::{Path, PathBuf};

use tree_sitter::Tree;

use crate::index::ClassIndex;
use crate::parse::parse_java;
use crate::{MixinError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

/// A parsed Java source file.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    tree: Tree,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

/// Java sources plus the class index built from them.
///
/// Every query in this crate reads from a workspace snapshot; nothing is cached
/// between queries.
#[derive(Debug, Default)]
pub struct MixinWorkspace {
    files: Vec<SourceFile>,
    index: ClassIndex,
}

impl MixinWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and index a source file. Paths are expected to be unique within a workspace.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Result<FileId> {
        let path = path.into();
        let text = text.into();
        let tree = parse_java(&text).map_err(|message| MixinError::Parse {
            path: path.clone(),
            message,
        })?;

        let file = FileId(self.files.len() as u32);
        self.index.index_file(file, &text, tree.root_node());
        self.files.push(SourceFile { path, text, tree });
        Ok(file)
    }

    /// Load every `*.java` file under `root`.
    ///
    /// Files that disappear or cannot be read while walking are skipped.
    pub fn load_dir(root: impl AsRef<Path>) -> Result<Self> {
        let mut java_files = Vec::new();
        collect_java_files(root.as_ref(), &mut java_files)?;
        java_files.sort();

        let mut workspace = Self::new();
        for file in java_files {
            let text = match std::fs::read_to_string(&file) {
                Ok(text) => text,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    tracing::debug!(
                        path = %file.display(),
                        err = %err,
                        "failed to read Java source while loading mixin workspace"
                    );
                    continue;
                }
            };
            workspace.add_file(file, text)?;
        }
        Ok(workspace)
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.files
            .iter()
            .position(|file| file.path == path)
            .map(|idx| FileId(idx as u32))
    }

    pub fn file(&self, file: FileId) -> &SourceFile {
        &self.files[file.0 as usize]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId(idx as u32), file))
    }

    pub fn index(&self) -> &ClassIndex {
        &self.index
    }
}

fn collect_java_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_java_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("java") {
            out.push(path);
        }
    }
    Ok(())
}
