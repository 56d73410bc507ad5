//! Finalized recordings and their export handles.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use clipcast_platform_core::MediaBlob;

/// A dereferenceable URL for a recording, revoked when dropped.
pub struct ObjectUrl {
    url: String,
    revoke: Option<Rc<dyn Fn(&str)>>,
}

impl ObjectUrl {
    /// Wrap `url`, calling `revoke` with it exactly once on release.
    pub fn new(url: String, revoke: Rc<dyn Fn(&str)>) -> Self {
        Self {
            url,
            revoke: Some(revoke),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Revoke now instead of on drop.
    pub fn release(mut self) {
        self.revoke_once();
    }

    fn revoke_once(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            tracing::debug!(url = %self.url, "Revoking object URL");
            revoke(self.url.as_str());
        }
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.revoke_once();
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrl")
            .field("url", &self.url)
            .field("live", &self.revoke.is_some())
            .finish()
    }
}

/// The download affordance for an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub href: String,
    pub filename: String,
    pub content_type: String,
}

/// Metadata describing a finalized recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub session_id: u64,
    pub url: String,
    pub filename: String,
    pub content_type: String,
    pub byte_len: u64,
    pub chunk_count: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ArtifactInfo {
    pub fn download_link(&self) -> DownloadLink {
        DownloadLink {
            href: self.url.clone(),
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

/// A finalized recording: the platform blob plus its URL handle.
pub struct RecordingArtifact<B> {
    blob: B,
    url: ObjectUrl,
    info: ArtifactInfo,
}

impl<B: MediaBlob> RecordingArtifact<B> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: u64,
        blob: B,
        url: ObjectUrl,
        filename: String,
        chunk_count: usize,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let info = ArtifactInfo {
            session_id,
            url: url.as_str().to_string(),
            filename,
            content_type: blob.content_type(),
            byte_len: blob.byte_len(),
            chunk_count,
            started_at,
            duration_ms: duration.num_milliseconds(),
        };
        Self { blob, url, info }
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }

    /// Revoke the URL handle and drop the blob.
    pub fn release(self) {
        self.url.release();
    }
}

impl<B> fmt::Debug for RecordingArtifact<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingArtifact")
            .field("url", &self.url)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recording_revoker() -> (Rc<RefCell<Vec<String>>>, Rc<dyn Fn(&str)>) {
        let revoked = Rc::new(RefCell::new(Vec::new()));
        let sink = revoked.clone();
        let revoke: Rc<dyn Fn(&str)> = Rc::new(move |url: &str| sink.borrow_mut().push(url.to_string()));
        (revoked, revoke)
    }

    #[test]
    fn object_url_revokes_once_on_drop() {
        let (revoked, revoke) = recording_revoker();
        {
            let url = ObjectUrl::new("blob:test/1".to_string(), revoke);
            assert_eq!(url.as_str(), "blob:test/1");
        }
        assert_eq!(revoked.borrow().as_slice(), ["blob:test/1"]);
    }

    #[test]
    fn explicit_release_does_not_double_revoke() {
        let (revoked, revoke) = recording_revoker();
        let url = ObjectUrl::new("blob:test/2".to_string(), revoke);
        url.release();
        assert_eq!(revoked.borrow().len(), 1);
    }

    #[test]
    fn download_link_uses_artifact_fields() {
        let info = ArtifactInfo {
            session_id: 1,
            url: "blob:test/3".to_string(),
            filename: "recording.webm".to_string(),
            content_type: "video/webm".to_string(),
            byte_len: 8,
            chunk_count: 2,
            started_at: Utc::now(),
            duration_ms: 1200,
        };
        let link = info.download_link();
        assert_eq!(link.href, "blob:test/3");
        assert_eq!(link.filename, "recording.webm");
        assert_eq!(link.content_type, "video/webm");
    }
}
