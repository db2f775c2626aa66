//! Lifecycle management for per-request files.
//!
//! Every upload and intermediate conversion is registered under its request
//! id before it is written. [`ArtifactManager::release_all`] deletes them
//! once, and [`RequestScope`] calls it on drop so cleanup happens on success,
//! error, and cancellation alike. Synthesized audio is never tracked here:
//! it is the response payload.

use crate::config::Settings;
use crate::error::{HarkError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest sanitized upload name kept in a stored file name.
const MAX_NAME_LEN: usize = 64;

/// Opaque per-request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Owns the upload and output directories and tracks transient files.
pub struct ArtifactManager {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    tracked: Mutex<HashMap<RequestId, Vec<PathBuf>>>,
}

impl ArtifactManager {
    /// Create a manager, creating both directories if needed.
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&upload_dir)?;
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            upload_dir,
            output_dir,
            tracked: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.upload_dir(), settings.audio_out_dir())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Start a request scope with a fresh id.
    pub fn begin(self: &Arc<Self>) -> RequestScope {
        RequestScope {
            id: RequestId::new(),
            manager: Arc::clone(self),
        }
    }

    /// Register a path for deletion when `id` is released.
    pub fn track(&self, id: RequestId, path: PathBuf) {
        let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        tracked.entry(id).or_default().push(path);
    }

    /// Number of files currently tracked for `id`.
    pub fn tracked_count(&self, id: RequestId) -> usize {
        let tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        tracked.get(&id).map_or(0, Vec::len)
    }

    /// Write an uploaded payload under a unique name and track it.
    pub async fn persist_upload(
        &self,
        id: RequestId,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<PathBuf> {
        let name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(original_name));
        let path = self.upload_dir.join(name);

        // Tracked first so a partial write is still cleaned up.
        self.track(id, path.clone());
        tokio::fs::write(&path, bytes).await?;
        debug!("Persisted {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Reserve and track the path of a file derived from `from`.
    pub fn derived_path(&self, id: RequestId, from: &Path, extension: &str) -> PathBuf {
        let mut name = from.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        let path = PathBuf::from(name);
        self.track(id, path.clone());
        path
    }

    /// Delete every file tracked for `id`. Safe to call repeatedly; later
    /// calls find nothing to do. Returns the number of files removed.
    pub fn release_all(&self, id: RequestId) -> usize {
        let paths = {
            let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
            tracked.remove(&id).unwrap_or_default()
        };

        let mut removed = 0;
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            debug!("Released {} transient file(s) for request {}", removed, id);
        }
        removed
    }

    /// Resolve a synthesized artifact name inside the output directory.
    pub fn output_path(&self, file_name: &str) -> Result<PathBuf> {
        let candidate = Path::new(file_name);
        let mut components = candidate.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(HarkError::InvalidInput(format!(
                    "invalid artifact name: {}",
                    file_name
                )))
            }
        }

        let path = self.output_dir.join(candidate);
        if path.is_file() {
            Ok(path)
        } else {
            Err(HarkError::ArtifactNotFound(file_name.to_string()))
        }
    }
}

/// Per-request handle; releases the request's files when dropped.
pub struct RequestScope {
    id: RequestId,
    manager: Arc<ArtifactManager>,
}

impl RequestScope {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub async fn persist_upload(&self, bytes: &[u8], original_name: &str) -> Result<PathBuf> {
        self.manager.persist_upload(self.id, bytes, original_name).await
    }

    pub fn derived_path(&self, from: &Path, extension: &str) -> PathBuf {
        self.manager.derived_path(self.id, from, extension)
    }

    /// Release now instead of waiting for drop.
    pub fn release(&self) -> usize {
        self.manager.release_all(self.id)
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.manager.release_all(self.id);
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"))
}

/// Reduce an uploaded file name to a safe ASCII component.
pub fn sanitize_file_name(name: &str) -> String {
    // Keep only the final component of client-supplied paths.
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = unsafe_chars().replace_all(base, "_");
    let trimmed = cleaned.trim_start_matches(['.', '_']).trim_end_matches('_');

    let mut out: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if out.is_empty() {
        out = "upload".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, Arc<ArtifactManager>) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path().join("uploads"), dir.path().join("tts")).unwrap();
        (dir, Arc::new(manager))
    }

    #[test]
    fn test_creates_directories() {
        let (_dir, manager) = manager();
        assert!(manager.upload_dir().is_dir());
        assert!(manager.output_dir().is_dir());
    }

    #[tokio::test]
    async fn test_release_all_deletes_tracked_files() {
        let (_dir, manager) = manager();
        let id = RequestId::new();

        let upload = manager.persist_upload(id, b"RIFF", "clip.webm").await.unwrap();
        let wav = manager.derived_path(id, &upload, "wav");
        std::fs::write(&wav, b"wav").unwrap();

        assert_eq!(manager.tracked_count(id), 2);
        assert_eq!(manager.release_all(id), 2);
        assert!(!upload.exists());
        assert!(!wav.exists());
    }

    #[tokio::test]
    async fn test_release_all_twice_is_noop() {
        let (_dir, manager) = manager();
        let id = RequestId::new();
        manager.persist_upload(id, b"data", "a.mp3").await.unwrap();

        assert_eq!(manager.release_all(id), 1);
        assert_eq!(manager.release_all(id), 0);
        assert_eq!(manager.tracked_count(id), 0);
    }

    #[tokio::test]
    async fn test_reserved_but_never_created_path_is_ignored() {
        let (_dir, manager) = manager();
        let id = RequestId::new();
        let upload = manager.persist_upload(id, b"data", "a.ogg").await.unwrap();
        let _never_written = manager.derived_path(id, &upload, "wav");

        assert_eq!(manager.release_all(id), 1);
    }

    #[tokio::test]
    async fn test_scope_releases_on_drop() {
        let (_dir, manager) = manager();
        let upload = {
            let scope = manager.begin();
            scope.persist_upload(b"data", "voice.webm").await.unwrap()
        };
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn test_requests_do_not_share_files() {
        let (_dir, manager) = manager();
        let a = manager.begin();
        let b = manager.begin();
        let path_a = a.persist_upload(b"a", "same.wav").await.unwrap();
        let path_b = b.persist_upload(b"b", "same.wav").await.unwrap();

        assert_ne!(path_a, path_b);
        a.release();
        assert!(!path_a.exists());
        assert!(path_b.exists());
    }

    #[test]
    fn test_output_path_rejects_traversal() {
        let (_dir, manager) = manager();
        std::fs::write(manager.output_dir().join("tts_abc.wav"), b"x").unwrap();

        assert!(manager.output_path("tts_abc.wav").is_ok());
        assert!(matches!(
            manager.output_path("missing.wav"),
            Err(HarkError::ArtifactNotFound(_))
        ));
        for bad in ["../secret", "a/b.wav", "/etc/passwd", "..", ""] {
            assert!(manager.output_path(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("recording.webm"), "recording.webm");
        assert_eq!(sanitize_file_name("my voice note.m4a"), "my_voice_note.m4a");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\clip.wav"), "clip.wav");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("日本語"), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
