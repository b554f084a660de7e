use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub(crate) struct Snippet {
    pub(crate) id: u64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) created: DateTime<Utc>,
    pub(crate) expires: DateTime<Utc>,
}

impl Snippet {
    pub(crate) fn created_display(&self) -> String {
        self.created.format("%d %b %Y at %H:%M").to_string()
    }

    pub(crate) fn expires_display(&self) -> String {
        self.expires.format("%d %b %Y at %H:%M").to_string()
    }
}

/// Process-local snippet storage
#[derive(Default)]
pub(crate) struct SnippetModel {
    snippets: RwLock<Vec<Snippet>>,
}

impl SnippetModel {
    pub(crate) async fn insert(&self, title: &str, content: &str, expires_days: i64) -> u64 {
        let mut snippets = self.snippets.write().await;
        let id = snippets.len() as u64 + 1;
        let created = Utc::now();
        snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(expires_days),
        });
        id
    }

    /// `None` for unknown or expired snippets.
    pub(crate) async fn get(&self, id: u64) -> Option<Snippet> {
        let now = Utc::now();
        self.snippets
            .read()
            .await
            .iter()
            .find(|s| s.id == id && s.expires > now)
            .cloned()
    }

    /// Most recent unexpired snippets, newest first.
    pub(crate) async fn latest(&self, limit: usize) -> Vec<Snippet> {
        let now = Utc::now();
        self.snippets
            .read()
            .await
            .iter()
            .rev()
            .filter(|s| s.expires > now)
            .take(limit)
            .cloned()
            .collect()
    }
}
