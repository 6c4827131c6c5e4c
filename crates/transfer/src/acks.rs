use std::collections::{BTreeSet, HashMap};

use crate::TransferError;

/// What a received ack changed in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// First ack for this chunk.
    New { acked: u32, total: u32 },
    /// The chunk had already been acknowledged.
    Duplicate,
    /// This ack completed the set; the transfer is no longer tracked.
    Finished { total: u32 },
}

#[derive(Debug)]
struct Outstanding {
    total: u32,
    acked: BTreeSet<u32>,
}

/// Sender-side record of which chunks peers have acknowledged.
///
/// Purely informational: nothing is retransmitted from it. In a room
/// broadcast any member may ack, so one ack per chunk is enough to
/// count it as delivered.
#[derive(Debug, Default)]
pub struct AckLedger {
    outstanding: HashMap<String, Outstanding>,
}

impl AckLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking acks for a transfer this client emitted.
    pub fn track(&mut self, transfer_id: &str, total: u32) {
        self.outstanding.insert(
            transfer_id.to_string(),
            Outstanding {
                total,
                acked: BTreeSet::new(),
            },
        );
    }

    /// Records an ack. Unknown ids are reported as [`TransferError::UnknownTransfer`].
    pub fn record(&mut self, transfer_id: &str, seq: u32) -> Result<AckOutcome, TransferError> {
        let entry = self
            .outstanding
            .get_mut(transfer_id)
            .ok_or_else(|| TransferError::UnknownTransfer(transfer_id.to_string()))?;

        if seq >= entry.total {
            return Err(TransferError::SeqOutOfRange {
                seq,
                total: entry.total,
            });
        }
        if !entry.acked.insert(seq) {
            return Ok(AckOutcome::Duplicate);
        }

        let acked = entry.acked.len() as u32;
        let total = entry.total;
        if acked == total {
            self.outstanding.remove(transfer_id);
            return Ok(AckOutcome::Finished { total });
        }
        Ok(AckOutcome::New { acked, total })
    }

    /// Chunks not yet acknowledged, ascending.
    pub fn unacked(&self, transfer_id: &str) -> Option<Vec<u32>> {
        self.outstanding.get(transfer_id).map(|entry| {
            (0..entry.total)
                .filter(|seq| !entry.acked.contains(seq))
                .collect()
        })
    }

    /// Stops tracking a transfer; returns the chunks still unacknowledged.
    pub fn forget(&mut self, transfer_id: &str) -> Option<Vec<u32>> {
        let unacked = self.unacked(transfer_id);
        self.outstanding.remove(transfer_id);
        unacked
    }

    /// Ids of transfers still waiting for acks.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.outstanding.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}
