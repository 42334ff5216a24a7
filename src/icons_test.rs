use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn scratch_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("stronghold-icons-{name}-{}-{nanos}", std::process::id()))
}

/// Serves fixed bytes for hrefs ending in `.png`, fails everything else.
struct StubSource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl IconSource for StubSource {
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, IconError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if href.ends_with(".png") {
            Ok(vec![1, 2, 3])
        } else {
            Err(IconError::Status { href: href.to_owned(), status: 404 })
        }
    }
}

// =============================================================
// Data URIs
// =============================================================

#[test]
fn mime_for_known_extensions() {
    assert_eq!(mime_for("icons/city.png"), "image/png");
    assert_eq!(mime_for("icons/photo.JPG"), "image/jpeg");
    assert_eq!(mime_for("https://cdn.test/a.svg?v=2"), "image/svg+xml");
    assert_eq!(mime_for("no-extension"), "image/png");
}

#[test]
fn to_data_uri_encodes_base64() {
    assert_eq!(to_data_uri("x.png", &[1, 2, 3]), "data:image/png;base64,AQID");
}

// =============================================================
// Embedding
// =============================================================

#[tokio::test]
async fn embed_all_skips_failures() {
    let source = StubSource { calls: AtomicUsize::new(0) };
    let hrefs = vec!["a.png".to_owned(), "b.gif".to_owned(), "c.png".to_owned()];
    let embedded = embed_all(&source, &hrefs).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(embedded.len(), 2);
    assert_eq!(embedded["a.png"], "data:image/png;base64,AQID");
    assert!(!embedded.contains_key("b.gif"));
}

#[tokio::test]
async fn embed_all_with_no_hrefs_is_empty() {
    let source = StubSource { calls: AtomicUsize::new(0) };
    assert!(embed_all(&source, &[]).await.is_empty());
}

// =============================================================
// File source
// =============================================================

#[tokio::test]
async fn fs_source_reads_relative_and_prefixed_hrefs() {
    let dir = scratch_dir("read");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("org.png"), [9_u8, 8, 7]).unwrap();

    let source = FsIconSource::new(&dir);
    assert_eq!(source.fetch("org.png").await.unwrap(), vec![9, 8, 7]);
    let prefixed = dir.join("org.png").to_string_lossy().into_owned();
    assert_eq!(source.fetch(&prefixed).await.unwrap(), vec![9, 8, 7]);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn fs_source_reports_missing_file() {
    let source = FsIconSource::new(scratch_dir("missing"));
    assert!(matches!(source.fetch("nope.png").await, Err(IconError::Io { .. })));
}

#[tokio::test]
async fn fs_source_rejects_parent_traversal() {
    let source = FsIconSource::new(scratch_dir("traversal"));
    assert!(matches!(source.fetch("../secret.png").await, Err(IconError::InvalidHref(_))));
}
