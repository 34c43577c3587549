//! Filesystem-backed artifact storage.
//!
//! Documents live under one root directory as `<slug>.html` with a
//! `<slug>.meta.json` sidecar; the site index occupies the reserved
//! `sitemap.xml` name. Writes go through a temp file and rename so an
//! overwrite is observed either entirely old or entirely new.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::application::artifacts::{
    ArtifactError, ArtifactStore, SITE_INDEX_KEY, StoredArtifact,
};
use crate::domain::entities::ArtifactMeta;

const DOCUMENT_EXT: &str = "html";
const META_EXT: &str = "meta.json";

#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn document_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}.{DOCUMENT_EXT}"))
    }

    fn meta_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}.{META_EXT}"))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        match fs::rename(&tmp, path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp).await;
                Err(err)
            }
        }
    }
}

/// Whether a key can name a stored document. Slugs arrive straight off the
/// request path, so anything that could escape the root is rejected here
/// rather than at the call sites.
fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(
        &self,
        slug: &str,
        document: &str,
        meta: &ArtifactMeta,
    ) -> Result<(), ArtifactError> {
        if !valid_key(slug) {
            return Err(ArtifactError::InvalidKey {
                key: slug.to_string(),
            });
        }

        let encoded = serde_json::to_vec(meta).map_err(|err| ArtifactError::Metadata {
            slug: slug.to_string(),
            message: err.to_string(),
        })?;
        self.write_atomic(&self.document_path(slug), document.as_bytes())
            .await?;
        self.write_atomic(&self.meta_path(slug), &encoded).await?;
        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Option<StoredArtifact>, ArtifactError> {
        // An implausible key cannot name a document; treat it as absent so
        // hostile paths fall through the resolver instead of erroring.
        if !valid_key(slug) {
            return Ok(None);
        }

        let document = match fs::read_to_string(self.document_path(slug)).await {
            Ok(document) => document,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let raw_meta = fs::read(self.meta_path(slug)).await?;
        let meta: ArtifactMeta =
            serde_json::from_slice(&raw_meta).map_err(|err| ArtifactError::Metadata {
                slug: slug.to_string(),
                message: err.to_string(),
            })?;

        Ok(Some(StoredArtifact { document, meta }))
    }

    async fn delete(&self, slug: &str) -> Result<bool, ArtifactError> {
        if !valid_key(slug) {
            return Err(ArtifactError::InvalidKey {
                key: slug.to_string(),
            });
        }

        let removed = match fs::remove_file(self.document_path(slug)).await {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };
        match fs::remove_file(self.meta_path(slug)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(removed)
    }

    async fn list_slugs(&self) -> Result<Vec<String>, ArtifactError> {
        let mut slugs = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(slug) = name.strip_suffix(&format!(".{DOCUMENT_EXT}")) {
                if valid_key(slug) {
                    slugs.push(slug.to_string());
                }
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    async fn put_index(&self, xml: &str) -> Result<(), ArtifactError> {
        self.write_atomic(&self.root.join(SITE_INDEX_KEY), xml.as_bytes())
            .await
            .map_err(Into::into)
    }

    async fn get_index(&self) -> Result<Option<String>, ArtifactError> {
        match fs::read_to_string(self.root.join(SITE_INDEX_KEY)).await {
            Ok(xml) => Ok(Some(xml)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::artifacts::checksum_hex;
    use time::OffsetDateTime;

    fn meta(slug: &str, document: &str) -> ArtifactMeta {
        ArtifactMeta {
            slug: slug.to_string(),
            canonical_url: format!("https://example.com/guides/{slug}/"),
            description: "d".to_string(),
            image: None,
            checksum: checksum_hex(document),
            written_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path().to_path_buf()).expect("store");

        let html = "<html>doc</html>";
        store
            .put("best-slots-tips", html, &meta("best-slots-tips", html))
            .await
            .expect("put");

        let stored = store
            .get("best-slots-tips")
            .await
            .expect("get")
            .expect("artifact");
        assert_eq!(stored.document, html);
        assert_eq!(stored.meta.checksum, checksum_hex(html));

        assert!(store.delete("best-slots-tips").await.expect("delete"));
        assert!(!store.delete("best-slots-tips").await.expect("redelete"));
        assert!(store.get("best-slots-tips").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path().to_path_buf()).expect("store");

        store
            .put("a", "<p>old</p>", &meta("a", "<p>old</p>"))
            .await
            .expect("put old");
        store
            .put("a", "<p>new</p>", &meta("a", "<p>new</p>"))
            .await
            .expect("put new");

        let stored = store.get("a").await.expect("get").expect("artifact");
        assert_eq!(stored.document, "<p>new</p>");
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path().to_path_buf()).expect("store");

        assert!(store.get("../etc/passwd").await.expect("get").is_none());
        assert!(matches!(
            store
                .put("../escape", "x", &meta("e", "x"))
                .await
                .unwrap_err(),
            ArtifactError::InvalidKey { .. }
        ));
    }

    #[tokio::test]
    async fn list_slugs_excludes_index_and_sidecars() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(dir.path().to_path_buf()).expect("store");

        store.put("b", "x", &meta("b", "x")).await.expect("put b");
        store.put("a", "x", &meta("a", "x")).await.expect("put a");
        store.put_index("<urlset/>").await.expect("index");

        assert_eq!(store.list_slugs().await.expect("list"), vec!["a", "b"]);
        assert_eq!(
            store.get_index().await.expect("index"),
            Some("<urlset/>".to_string())
        );
    }
}
