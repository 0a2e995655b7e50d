//! Normalization stage

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CanonicalRecord, FlatRecord};

/// URL given to records that link nowhere (self posts, comments).
pub const FALLBACK_URL: &str = "https://news.ycombinator.com";

/// Author given to records whose author is unknown (deleted items).
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Title given to untitled comments.
pub const COMMENT_TITLE: &str = "comment";

const COMMENT_KIND: &str = "COMMENT";

/// Apply the normalization rules to one record and give it a fresh slug
pub fn normalize(record: FlatRecord) -> CanonicalRecord {
    let kind = record.kind.to_uppercase();

    let url = if record.url.is_empty() {
        FALLBACK_URL.to_string()
    } else {
        record.url
    };
    let author = if record.author.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        record.author
    };
    let title = if kind == COMMENT_KIND && record.title.is_empty() {
        COMMENT_TITLE.to_string()
    } else {
        record.title
    };

    CanonicalRecord {
        id: record.id,
        slug: Uuid::new_v4().to_string(),
        author,
        created_at: record.created_at,
        parent_id: record.parent_id,
        points: record.points,
        title,
        text: record.text,
        kind,
        url,
    }
}

/// Spawn the transform loop
///
/// Records leave in the order they arrive. The loop ends when the input closes
/// or `cancel` fires; in the latter case pending input is abandoned. The task
/// returns how many records it forwarded.
pub fn spawn(
    mut input: mpsc::Receiver<FlatRecord>,
    cancel: CancellationToken,
) -> (mpsc::Receiver<CanonicalRecord>, JoinHandle<usize>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        debug!("Starting transformation stream");
        let mut forwarded = 0;

        loop {
            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                record = input.recv() => match record {
                    Some(record) => record,
                    None => break,
                },
            };

            let canonical = normalize(record);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(canonical) => {
                    if sent.is_err() {
                        debug!("Loader hung up, stopping transformation");
                        break;
                    }
                    forwarded += 1;
                }
            }
        }

        info!(forwarded, cancelled = cancel.is_cancelled(), "Closing transformation stream");
        forwarded
    });

    (rx, handle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn flat(kind: &str) -> FlatRecord {
        FlatRecord {
            id: 7,
            author: "dang".to_string(),
            created_at: "2024-02-02T02:02:02Z".parse().unwrap(),
            parent_id: Some(3),
            points: 12,
            title: "Show HN: a thing".to_string(),
            text: "body".to_string(),
            kind: kind.to_string(),
            url: "https://example.com/thing".to_string(),
        }
    }

    #[test]
    fn test_default_fill() {
        let record = FlatRecord {
            author: String::new(),
            title: String::new(),
            url: String::new(),
            ..flat("comment")
        };

        let canonical = normalize(record);
        assert_eq!(canonical.url, FALLBACK_URL);
        assert_eq!(canonical.author, "unknown");
        assert_eq!(canonical.kind, "COMMENT");
        assert_eq!(canonical.title, "comment");
    }

    #[test]
    fn test_populated_fields_pass_through() {
        let canonical = normalize(flat("story"));
        assert_eq!(canonical.id, 7);
        assert_eq!(canonical.author, "dang");
        assert_eq!(canonical.parent_id, Some(3));
        assert_eq!(canonical.points, 12);
        assert_eq!(canonical.title, "Show HN: a thing");
        assert_eq!(canonical.text, "body");
        assert_eq!(canonical.kind, "STORY");
        assert_eq!(canonical.url, "https://example.com/thing");
    }

    #[test]
    fn test_untitled_story_keeps_empty_title() {
        let record = FlatRecord {
            title: String::new(),
            ..flat("story")
        };
        assert_eq!(normalize(record).title, "");
    }

    #[test]
    fn test_slug_is_fresh_uuid() {
        let a = normalize(flat("story"));
        let b = normalize(flat("story"));
        assert!(!a.slug.is_empty());
        assert!(Uuid::parse_str(&a.slug).is_ok());
        assert_ne!(a.slug, b.slug);
    }

    #[test]
    fn test_normalization_is_idempotent_apart_from_slug() {
        for kind in ["comment", "Story", "poll", ""] {
            let record = FlatRecord {
                author: String::new(),
                title: String::new(),
                url: String::new(),
                ..flat(kind)
            };
            let once = normalize(record);
            let twice = normalize(once.to_flat());
            assert_eq!(once.to_flat(), twice.to_flat());
            assert_ne!(once.slug, twice.slug);
        }
    }

    #[tokio::test]
    async fn test_stage_preserves_order() {
        let (tx, rx) = mpsc::channel(1);
        let (mut out, handle) = spawn(rx, CancellationToken::new());

        tokio::spawn(async move {
            for id in 1..=5 {
                tx.send(FlatRecord { id, ..flat("comment") }).await.unwrap();
            }
        });

        let mut ids = Vec::new();
        while let Some(record) = out.recv().await {
            ids.push(record.id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_stage_stops_on_cancel() {
        let (_tx, rx) = mpsc::channel::<FlatRecord>(1);
        let cancel = CancellationToken::new();
        let (mut out, handle) = spawn(rx, cancel.clone());

        cancel.cancel();
        assert!(out.recv().await.is_none());
        assert_eq!(handle.await.unwrap(), 0);
    }
}
