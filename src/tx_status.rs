use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Status of the most recent submission, shared between the bridge, the
/// history recorder and whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Processing { extrinsic: Option<String> },
    Success { extrinsic: Option<String> },
    Failed { reason: String },
}

impl TxStatus {
    pub fn processing() -> Self { TxStatus::Processing { extrinsic: None } }

    pub fn is_processing(&self) -> bool { matches!(self, TxStatus::Processing { .. }) }

    pub fn is_success(&self) -> bool { matches!(self, TxStatus::Success { .. }) }

    pub fn is_failed(&self) -> bool { matches!(self, TxStatus::Failed { .. }) }

    pub fn extrinsic(&self) -> Option<&str> {
        match self {
            TxStatus::Processing { extrinsic } | TxStatus::Success { extrinsic } => extrinsic.as_deref(),
            TxStatus::Failed { .. } => None,
        }
    }
}

/// Cloneable handle over a `watch` channel; `None` means nothing submitted yet.
#[derive(Clone)]
pub struct TxStatusHandle {
    tx: Arc<watch::Sender<Option<TxStatus>>>,
}

impl Default for TxStatusHandle {
    fn default() -> Self { Self::new() }
}

impl TxStatusHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, status: TxStatus) {
        self.tx.send_replace(Some(status));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<TxStatus> {
        self.tx.borrow().clone()
    }

    pub fn is_processing(&self) -> bool {
        self.tx.borrow().as_ref().map_or(false, TxStatus::is_processing)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TxStatus>> {
        self.tx.subscribe()
    }
}
