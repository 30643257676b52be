//! `fs:*` handlers.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::api::{DirEntry, FsDelete, FsExists, FsMkdir, FsReadFile, FsReaddir, FsWriteFile};
use crate::error::{BridgeError, Result};
use crate::handler::InvokeContext;

/// Keep the error kind, put the path in the message.
fn io_error(action: &str, path: &Path, e: std::io::Error) -> BridgeError {
    BridgeError::Io(std::io::Error::new(
        e.kind(),
        format!("failed to {action} {}: {e}", path.display()),
    ))
}

pub async fn read_file(req: FsReadFile, _ctx: InvokeContext) -> Result<String> {
    tokio::fs::read_to_string(&req.path)
        .await
        .map_err(|e| io_error("read", &req.path, e))
}

pub async fn write_file(req: FsWriteFile, _ctx: InvokeContext) -> Result<()> {
    if req.append {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&req.path)
            .await
            .map_err(|e| io_error("open", &req.path, e))?;
        file.write_all(req.contents.as_bytes())
            .await
            .map_err(|e| io_error("append to", &req.path, e))?;
        file.flush()
            .await
            .map_err(|e| io_error("flush", &req.path, e))
    } else {
        tokio::fs::write(&req.path, req.contents.as_bytes())
            .await
            .map_err(|e| io_error("write", &req.path, e))
    }
}

/// Unreadable paths count as missing.
pub async fn exists(req: FsExists, _ctx: InvokeContext) -> Result<bool> {
    Ok(tokio::fs::try_exists(&req.path).await.unwrap_or(false))
}

pub async fn mkdir(req: FsMkdir, _ctx: InvokeContext) -> Result<()> {
    let result = if req.recursive {
        tokio::fs::create_dir_all(&req.path).await
    } else {
        tokio::fs::create_dir(&req.path).await
    };
    result.map_err(|e| io_error("create directory", &req.path, e))
}

/// Entries sorted by name.
pub async fn readdir(req: FsReaddir, _ctx: InvokeContext) -> Result<Vec<DirEntry>> {
    let mut dir = tokio::fs::read_dir(&req.path)
        .await
        .map_err(|e| io_error("list", &req.path, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| io_error("list", &req.path, e))?
    {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Non-empty directories need `recursive`.
pub async fn delete(req: FsDelete, _ctx: InvokeContext) -> Result<()> {
    let metadata = tokio::fs::symlink_metadata(&req.path)
        .await
        .map_err(|e| io_error("stat", &req.path, e))?;

    let result = if metadata.is_dir() {
        if req.recursive {
            tokio::fs::remove_dir_all(&req.path).await
        } else {
            tokio::fs::remove_dir(&req.path).await
        }
    } else {
        tokio::fs::remove_file(&req.path).await
    };
    result.map_err(|e| io_error("delete", &req.path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InvokeContext {
        InvokeContext::new("fs", 1, 1)
    }

    #[tokio::test]
    async fn test_write_append_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");

        write_file(
            FsWriteFile {
                path: path.clone(),
                contents: "one\n".into(),
                append: false,
            },
            ctx(),
        )
        .await
        .unwrap();
        write_file(
            FsWriteFile {
                path: path.clone(),
                contents: "two\n".into(),
                append: true,
            },
            ctx(),
        )
        .await
        .unwrap();

        let text = read_file(FsReadFile { path: path.clone() }, ctx()).await.unwrap();
        assert_eq!(text, "one\ntwo\n");
        assert!(exists(FsExists { path }, ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = read_file(FsReadFile { path }, ctx()).await.unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
        assert!(matches!(err, BridgeError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_mkdir_readdir_delete() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");

        assert!(mkdir(
            FsMkdir {
                path: nested.clone(),
                recursive: false
            },
            ctx()
        )
        .await
        .is_err());
        mkdir(
            FsMkdir {
                path: nested.clone(),
                recursive: true,
            },
            ctx(),
        )
        .await
        .unwrap();
        std::fs::write(dir.path().join("z.txt"), "zz").unwrap();

        let entries = readdir(
            FsReaddir {
                path: dir.path().to_path_buf(),
            },
            ctx(),
        )
        .await
        .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z.txt"]);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].size, 2);

        let top = dir.path().join("a");
        assert!(delete(
            FsDelete {
                path: top.clone(),
                recursive: false
            },
            ctx()
        )
        .await
        .is_err());
        delete(
            FsDelete {
                path: top.clone(),
                recursive: true,
            },
            ctx(),
        )
        .await
        .unwrap();
        assert!(!exists(FsExists { path: top }, ctx()).await.unwrap());
    }
}
