//! Current execution position.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MirrorError;
use crate::projector::Projection;
use crate::remote::SourcePositionDescriptor;
use crate::scope::Scope;
use crate::Result;

const FILE_SCHEME: &str = "file://";

/// A resolved location in a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    path: PathBuf,
    line: u32,
    offset: Option<u32>,
}

impl SourcePosition {
    /// Resolve a backend descriptor. Only `file://` URLs map to local files.
    pub fn resolve(descriptor: &SourcePositionDescriptor) -> Result<Self> {
        let path = descriptor.file_url.strip_prefix(FILE_SCHEME).ok_or_else(|| {
            MirrorError::Materialization(format!("unsupported file URL: {}", descriptor.file_url))
        })?;
        if path.is_empty() {
            return Err(MirrorError::Materialization("empty file path".into()));
        }
        Ok(Self {
            path: PathBuf::from(path),
            line: descriptor.line,
            offset: descriptor.offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zero-based line.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn offset(&self) -> Option<u32> {
        self.offset
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line + 1)
    }
}

/// Resolves position snapshots into [`SourcePosition`] values.
#[derive(Debug, Default)]
pub struct SourcePositionProjection;

#[async_trait]
impl Projection for SourcePositionProjection {
    type Update = Option<SourcePositionDescriptor>;
    type Value = Option<Arc<SourcePosition>>;

    async fn materialize(
        &self,
        update: Option<SourcePositionDescriptor>,
        _scope: &Scope,
    ) -> Result<Option<Arc<SourcePosition>>> {
        update
            .map(|descriptor| SourcePosition::resolve(&descriptor).map(Arc::new))
            .transpose()
    }

    fn fallback(&self) -> Option<Option<Arc<SourcePosition>>> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(url: &str, line: u32) -> SourcePositionDescriptor {
        SourcePositionDescriptor {
            file_url: url.to_string(),
            line,
            offset: None,
        }
    }

    #[test]
    fn test_resolve_file_url() {
        let pos = SourcePosition::resolve(&descriptor("file:///src/main.rs", 9)).unwrap();
        assert_eq!(pos.path(), Path::new("/src/main.rs"));
        assert_eq!(pos.line(), 9);
        assert_eq!(pos.to_string(), "/src/main.rs:10");
    }

    #[test]
    fn test_reject_other_schemes() {
        assert!(SourcePosition::resolve(&descriptor("jar:///lib.jar!/A.class", 1)).is_err());
        assert!(SourcePosition::resolve(&descriptor("file://", 1)).is_err());
    }

    #[tokio::test]
    async fn test_projection() {
        let scope = Scope::root("test");
        let projection = SourcePositionProjection;
        assert!(projection.materialize(None, &scope).await.unwrap().is_none());

        let pos = projection
            .materialize(Some(descriptor("file:///a.rs", 0)), &scope)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pos.line(), 0);

        assert!(projection
            .materialize(Some(descriptor("http://x/a.rs", 0)), &scope)
            .await
            .is_err());
    }
}
