//! Zip upload extraction / 压缩包解析
//!
//! Reads the archive from memory. Every file entry whose name contains a dot
//! becomes a document titled with its file name; entries that are not valid
//! UTF-8 text are skipped. Entries larger than [`MAX_ENTRY_BYTES`] are
//! skipped and an archive whose text exceeds [`MAX_TOTAL_BYTES`] is rejected.

use std::io::{Cursor, Read};
use anyhow::Result;
use bytes::Bytes;

use crate::error::VectorError;
use crate::models::Document;

/// Largest entry read into memory; bigger entries are skipped / 单个条目上限
pub const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;
/// Largest total of extracted text per upload / 解压总量上限
pub const MAX_TOTAL_BYTES: u64 = 256 * 1024 * 1024;

/// Extract text documents from a zip archive (sync, call inside spawn_blocking) / 解析 ZIP 中的文本文件
pub fn extract_documents(data: &[u8]) -> Result<Vec<Document>> {
    extract_with_limits(data, MAX_ENTRY_BYTES, MAX_TOTAL_BYTES)
}

fn extract_with_limits(data: &[u8], entry_limit: u64, total_limit: u64) -> Result<Vec<Document>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| VectorError::Archive(e.to_string()))?;
    let mut docs = Vec::new();
    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| VectorError::Archive(e.to_string()))?;

        if file.is_dir() {
            continue;
        }

        // Drop directory components; reject entries escaping the archive root
        let Some(title) = file
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            tracing::debug!("Skipping unsafe archive entry: {}", file.name());
            continue;
        };

        if !title.contains('.') {
            continue;
        }

        // Header sizes are untrusted; only bytes actually read count
        let mut raw = Vec::new();
        if let Err(e) = (&mut file).take(entry_limit + 1).read_to_end(&mut raw) {
            tracing::debug!("Skipping unreadable entry {}: {}", title, e);
            continue;
        }
        if raw.len() as u64 > entry_limit {
            tracing::debug!("Skipping oversized entry {} (over {} bytes)", title, entry_limit);
            continue;
        }

        total += raw.len() as u64;
        if total > total_limit {
            return Err(VectorError::Archive(format!(
                "extracted content exceeds {} bytes",
                total_limit
            ))
            .into());
        }

        match String::from_utf8(raw) {
            Ok(text) => docs.push(Document { title, text }),
            Err(_) => tracing::debug!("Skipping non-text entry: {}", title),
        }
    }

    Ok(docs)
}

/// Async wrapper running extraction on the blocking pool / 异步解析
pub async fn extract_documents_async(data: Bytes) -> Result<Vec<Document>> {
    tokio::task::spawn_blocking(move || extract_documents(&data)).await?
}
