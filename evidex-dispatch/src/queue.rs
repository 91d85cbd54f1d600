// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Downstream processing queues

use evidex_core::{DispatchConfig, EvidenceRef, EvidexError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Downstream processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Translation,
    Aggregation,
    Ocr,
    Intelligence,
}

impl QueueKind {
    pub const ALL: [QueueKind; 4] = [
        QueueKind::Translation,
        QueueKind::Aggregation,
        QueueKind::Ocr,
        QueueKind::Intelligence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Translation => "translation",
            QueueKind::Aggregation => "aggregation",
            QueueKind::Ocr => "ocr",
            QueueKind::Intelligence => "intelligence",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of an accepted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

/// A downstream queue. Enqueue is fire-and-forget for the caller.
pub trait EvidenceQueue: Send + Sync {
    fn enqueue(&self, record: EvidenceRef) -> Result<Ack>;
}

/// Queue backed by a bounded tokio channel.
///
/// `try_send` never blocks and needs no runtime, so dispatch can run on any
/// thread. Consumers drain the paired receiver.
pub struct ChannelQueue {
    kind: QueueKind,
    sender: mpsc::Sender<EvidenceRef>,
}

impl ChannelQueue {
    pub fn bounded(kind: QueueKind, capacity: usize) -> (Self, mpsc::Receiver<EvidenceRef>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { kind, sender }, receiver)
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

impl EvidenceQueue for ChannelQueue {
    fn enqueue(&self, record: EvidenceRef) -> Result<Ack> {
        match self.sender.try_send(record) {
            Ok(()) => Ok(Ack),
            Err(TrySendError::Full(record)) => Err(EvidexError::Queue(format!(
                "{} queue is full, dropped {}",
                self.kind, record.id
            ))),
            Err(TrySendError::Closed(record)) => Err(EvidexError::Queue(format!(
                "{} queue is closed, dropped {}",
                self.kind, record.id
            ))),
        }
    }
}

/// The four downstream queues
#[derive(Clone)]
pub struct QueueSet {
    pub translation: Arc<dyn EvidenceQueue>,
    pub aggregation: Arc<dyn EvidenceQueue>,
    pub ocr: Arc<dyn EvidenceQueue>,
    pub intelligence: Arc<dyn EvidenceQueue>,
}

/// Receiving ends of a channel-backed [`QueueSet`]
pub struct QueueReceivers {
    pub translation: mpsc::Receiver<EvidenceRef>,
    pub aggregation: mpsc::Receiver<EvidenceRef>,
    pub ocr: mpsc::Receiver<EvidenceRef>,
    pub intelligence: mpsc::Receiver<EvidenceRef>,
}

impl QueueReceivers {
    pub fn get_mut(&mut self, kind: QueueKind) -> &mut mpsc::Receiver<EvidenceRef> {
        match kind {
            QueueKind::Translation => &mut self.translation,
            QueueKind::Aggregation => &mut self.aggregation,
            QueueKind::Ocr => &mut self.ocr,
            QueueKind::Intelligence => &mut self.intelligence,
        }
    }

    /// Drain whatever is currently buffered on one queue
    pub fn drain(&mut self, kind: QueueKind) -> Vec<EvidenceRef> {
        let receiver = self.get_mut(kind);
        let mut drained = Vec::new();
        while let Ok(record) = receiver.try_recv() {
            drained.push(record);
        }
        drained
    }
}

impl QueueSet {
    /// Channel-backed queues sized from the dispatch configuration
    pub fn channels(config: &DispatchConfig) -> (Self, QueueReceivers) {
        let capacity = config.queue_capacity;
        let (translation, translation_rx) = ChannelQueue::bounded(QueueKind::Translation, capacity);
        let (aggregation, aggregation_rx) = ChannelQueue::bounded(QueueKind::Aggregation, capacity);
        let (ocr, ocr_rx) = ChannelQueue::bounded(QueueKind::Ocr, capacity);
        let (intelligence, intelligence_rx) =
            ChannelQueue::bounded(QueueKind::Intelligence, capacity);

        let queues = Self {
            translation: Arc::new(translation),
            aggregation: Arc::new(aggregation),
            ocr: Arc::new(ocr),
            intelligence: Arc::new(intelligence),
        };
        let receivers = QueueReceivers {
            translation: translation_rx,
            aggregation: aggregation_rx,
            ocr: ocr_rx,
            intelligence: intelligence_rx,
        };
        (queues, receivers)
    }

    pub fn get(&self, kind: QueueKind) -> &Arc<dyn EvidenceQueue> {
        match kind {
            QueueKind::Translation => &self.translation,
            QueueKind::Aggregation => &self.aggregation,
            QueueKind::Ocr => &self.ocr,
            QueueKind::Intelligence => &self.intelligence,
        }
    }
}
