use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Classifier output for one batch.
///
/// Entries are opaque to the client; whatever the classifier produces is
/// republished as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedBatch {
    pub ranking: Vec<Value>,
    pub chat: Vec<Value>,
    pub gifts: Vec<Value>,
    pub welcomes: Vec<Value>,
    pub super_chats: Vec<Value>,
}

impl CategorizedBatch {
    /// True when every category is empty
    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
            && self.chat.is_empty()
            && self.gifts.is_empty()
            && self.welcomes.is_empty()
            && self.super_chats.is_empty()
    }
}

/// Buckets a batch of raw application messages into categories
#[async_trait]
pub trait MessageClassifier: Send + Sync + 'static {
    async fn classify(&self, messages: Vec<Value>) -> Result<CategorizedBatch>;
}
