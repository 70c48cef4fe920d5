use super::*;
use crate::chunking::Chunk;
use crate::index::{Distance, VectorIndex};
use tempfile::TempDir;

fn indexed(texts: &[&str]) -> Arc<IndexedDocument> {
    let entries = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let chunk = Chunk {
                content: (*text).to_string(),
                page: 0,
                chunk_index: i,
                start: 0,
            };
            (chunk, vec![i as f32, 1.0])
        })
        .collect();
    Arc::new(IndexedDocument {
        page_count: 1,
        index: VectorIndex::build(entries, Distance::Euclidean).expect("index should build"),
    })
}

#[test]
fn upload_path_is_per_session() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    assert_ne!(store.upload_path(a), store.upload_path(b));
    assert_eq!(store.upload_path(a), store.upload_path(a));
    assert!(store.upload_path(a).starts_with(temp_dir.path()));
}

#[test]
fn store_upload_overwrites_previous_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().join("uploads"));
    let id = Uuid::new_v4();

    let first = store
        .store_upload(id, "a.pdf", b"first", indexed(&["alpha"]))
        .expect("first store");
    let second = store
        .store_upload(id, "b.pdf", b"second upload", indexed(&["beta"]))
        .expect("second store");

    assert_eq!(first, second);
    assert_eq!(fs::read(&second).expect("read back"), b"second upload");
}

#[test]
fn new_document_replaces_previous() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let id = Uuid::new_v4();

    store
        .store_upload(id, "a.pdf", b"a", indexed(&["alpha"]))
        .expect("store a");
    store
        .store_upload(id, "b.pdf", b"b", indexed(&["beta", "gamma"]))
        .expect("store b");

    let current = store.document(id).expect("lookup").expect("document present");
    assert_eq!(current.file_name, "b.pdf");
    assert!(current.document.index.chunks().all(|c| c.content != "alpha"));
    assert_eq!(store.len(), 1);

    let summary = store.summary(id).expect("lookup").expect("summary present");
    assert_eq!(summary.file_name, "b.pdf");
    assert_eq!(summary.chunk_count, 2);
    assert_eq!(summary.page_count, 1);
}

#[test]
fn sessions_are_isolated() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store
        .store_upload(a, "a.pdf", b"a", indexed(&["alpha"]))
        .expect("store a");

    assert!(store.document(b).expect("lookup").is_none());
    assert!(store.summary(b).expect("lookup").is_none());
    assert!(store.document(a).expect("lookup").is_some());
}

#[test]
fn remove_deletes_upload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let id = Uuid::new_v4();

    let path = store
        .store_upload(id, "a.pdf", b"%PDF", indexed(&["alpha"]))
        .expect("store");

    assert!(store.remove(id).expect("remove"));
    assert!(!path.exists());
    assert!(store.is_empty());
    assert!(!store.remove(id).expect("second remove"));
}

#[test]
fn document_lookup_refreshes_last_seen() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let id = Uuid::new_v4();
    store
        .store_upload(id, "a.pdf", b"a", indexed(&["alpha"]))
        .expect("store");

    let first = store.document(id).expect("lookup").expect("present");
    std::thread::sleep(Duration::from_millis(5));
    let second = store.document(id).expect("lookup").expect("present");

    assert!(second.last_seen > first.last_seen);
    assert_eq!(second.uploaded_at, first.uploaded_at);
}

#[test]
fn idle_sessions_expire_with_their_uploads() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().to_path_buf());
    let stale = Uuid::new_v4();
    let fresh = Uuid::new_v4();
    let stale_path = store
        .store_upload(stale, "old.pdf", b"old", indexed(&["alpha"]))
        .expect("store stale");
    let fresh_path = store
        .store_upload(fresh, "new.pdf", b"new", indexed(&["beta"]))
        .expect("store fresh");

    let max_idle = Duration::from_secs(30 * 60);
    let soon = Utc::now() + TimeDelta::minutes(10);
    assert_eq!(store.expire_idle_at(soon, max_idle).expect("sweep"), 0);
    assert_eq!(store.len(), 2);

    // Only the fresh session is touched before the clock passes the idle limit
    let later = Utc::now() + TimeDelta::minutes(31);
    {
        let mut sessions = store.sessions.write().expect("lock");
        if let Some(entry) = sessions.get_mut(&fresh) {
            entry.last_seen = later;
        }
    }

    assert_eq!(store.expire_idle_at(later, max_idle).expect("sweep"), 1);
    assert!(store.document(stale).expect("lookup").is_none());
    assert!(!stale_path.exists());
    assert!(store.document(fresh).expect("lookup").is_some());
    assert!(fresh_path.exists());
}

#[tokio::test]
async fn sweeper_reclaims_idle_sessions() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = Arc::new(SessionStore::new(temp_dir.path().to_path_buf()));
    let paths: Vec<PathBuf> = (0..5)
        .map(|_| {
            store
                .store_upload(Uuid::new_v4(), "a.pdf", b"%PDF", indexed(&["alpha"]))
                .expect("store")
        })
        .collect();

    let sweeper = spawn_idle_sweeper(Arc::clone(&store), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(300)).await;
    sweeper.abort();

    assert!(store.is_empty());
    assert!(paths.iter().all(|path| !path.exists()));
}

#[tokio::test]
async fn sweeper_stops_when_store_is_dropped() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = Arc::new(SessionStore::new(temp_dir.path().to_path_buf()));

    let sweeper = spawn_idle_sweeper(Arc::clone(&store), Duration::from_millis(10));
    drop(store);

    tokio::time::timeout(Duration::from_secs(2), sweeper)
        .await
        .expect("sweeper should stop")
        .expect("sweeper should not panic");
}
