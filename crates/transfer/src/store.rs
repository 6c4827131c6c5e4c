use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

use crate::{MAX_PAYLOAD_SIZE, MAX_TOTAL_CHUNKS, TransferError};

/// How many finished ids are remembered to reject late frames.
pub const RETIRED_CAPACITY: usize = 4096;

/// Descriptive metadata announced by `audio_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferMeta {
    pub room: String,
    pub sender: String,
    pub payload_name: String,
    pub payload_kind: String,
    pub total_chunks: u32,
    /// Hex SHA-256 of the full payload (empty means no verification).
    pub checksum: String,
}

/// Result of storing one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// The slot was already populated; nothing changed.
    pub already_had: bool,
}

/// One in-flight chunked transfer on the receiving side.
///
/// Chunks are kept sparsely by `seq`, so a large declared count costs
/// nothing until data arrives.
#[derive(Debug)]
pub struct Transfer {
    id: String,
    meta: TransferMeta,
    chunks: BTreeMap<u32, Vec<u8>>,
    received_bytes: usize,
    /// Chunks whose data failed to decode.
    malformed: BTreeSet<u32>,
    started_at: Instant,
}

impl Transfer {
    fn new(id: String, meta: TransferMeta) -> Self {
        Self {
            id,
            meta,
            chunks: BTreeMap::new(),
            received_bytes: 0,
            malformed: BTreeSet::new(),
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn meta(&self) -> &TransferMeta {
        &self.meta
    }

    pub fn total_chunks(&self) -> u32 {
        self.meta.total_chunks
    }

    pub fn received_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Decoded bytes held for this transfer.
    pub fn received_bytes(&self) -> usize {
        self.received_bytes
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Sequence numbers whose data could not be decoded, ascending.
    pub fn malformed(&self) -> impl Iterator<Item = u32> + '_ {
        self.malformed.iter().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.received_count() == self.meta.total_chunks
    }

    /// All absent sequence numbers, ascending.
    pub fn missing(&self) -> Vec<u32> {
        (0..self.meta.total_chunks)
            .filter(|seq| !self.chunks.contains_key(seq))
            .collect()
    }

    /// Stored chunks in `seq` order, or `None` if any slot is empty.
    pub fn ordered_chunks(&self) -> Option<Vec<&[u8]>> {
        // Keys are bounded by the total, so a full map holds exactly 0..total.
        self.is_complete()
            .then(|| self.chunks.values().map(Vec::as_slice).collect())
    }
}

/// Registry of in-flight transfers keyed by transfer id.
///
/// The store is the only owner of chunk buffers. The most recent
/// [`RETIRED_CAPACITY`] finished ids are remembered so a late frame
/// cannot reopen a transfer.
#[derive(Debug)]
pub struct TransferStore {
    live: HashMap<String, Transfer>,
    retired: HashSet<String>,
    retired_order: VecDeque<String>,
    retired_capacity: usize,
    max_payload: usize,
}

impl Default for TransferStore {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            retired: HashSet::new(),
            retired_order: VecDeque::new(),
            retired_capacity: RETIRED_CAPACITY,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}

impl TransferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the byte cap a single transfer may accumulate.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Overrides how many finished ids are remembered.
    pub fn with_retired_capacity(mut self, capacity: usize) -> Self {
        self.retired_capacity = capacity;
        self
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Registers a new transfer.
    ///
    /// Fails with [`TransferError::DuplicateTransfer`] if the id is live or
    /// was recently finished, and with [`TransferError::TooManyChunks`] if
    /// the declared count exceeds [`MAX_TOTAL_CHUNKS`].
    pub fn begin(&mut self, id: &str, meta: TransferMeta) -> Result<&Transfer, TransferError> {
        if self.live.contains_key(id) || self.retired.contains(id) {
            return Err(TransferError::DuplicateTransfer(id.to_string()));
        }
        if meta.total_chunks == 0 {
            return Err(TransferError::InvalidTotalChunks(id.to_string()));
        }
        if meta.total_chunks > MAX_TOTAL_CHUNKS {
            return Err(TransferError::TooManyChunks(meta.total_chunks as usize));
        }
        let transfer = self
            .live
            .entry(id.to_string())
            .or_insert_with(|| Transfer::new(id.to_string(), meta));
        Ok(transfer)
    }

    /// Stores chunk `seq`; a second delivery of the same slot is a no-op.
    ///
    /// A chunk that would push the transfer past the byte cap is refused
    /// with [`TransferError::PayloadTooLarge`] and nothing is stored.
    pub fn put_chunk(
        &mut self,
        id: &str,
        seq: u32,
        data: Vec<u8>,
    ) -> Result<PutOutcome, TransferError> {
        let max = self.max_payload;
        let transfer = self.live_mut(id)?;
        let total = transfer.meta.total_chunks;
        if seq >= total {
            return Err(TransferError::SeqOutOfRange { seq, total });
        }
        if transfer.chunks.contains_key(&seq) {
            return Ok(PutOutcome { already_had: true });
        }

        let size = transfer.received_bytes + data.len();
        if size > max {
            return Err(TransferError::PayloadTooLarge { size, max });
        }
        transfer.received_bytes = size;
        transfer.chunks.insert(seq, data);
        transfer.malformed.remove(&seq);
        Ok(PutOutcome { already_had: false })
    }

    /// Records that chunk `seq` arrived but could not be decoded.
    pub fn note_malformed(&mut self, id: &str, seq: u32) -> Result<(), TransferError> {
        let transfer = self.live_mut(id)?;
        let total = transfer.meta.total_chunks;
        if seq >= total {
            return Err(TransferError::SeqOutOfRange { seq, total });
        }
        if !transfer.chunks.contains_key(&seq) {
            transfer.malformed.insert(seq);
        }
        Ok(())
    }

    /// `true` iff the transfer is live and every chunk is present.
    pub fn is_complete(&self, id: &str) -> bool {
        self.live.get(id).is_some_and(Transfer::is_complete)
    }

    /// Absent sequence numbers of a live transfer, ascending.
    pub fn missing(&self, id: &str) -> Result<Vec<u32>, TransferError> {
        self.live
            .get(id)
            .map(Transfer::missing)
            .ok_or_else(|| TransferError::UnknownTransfer(id.to_string()))
    }

    /// Removes and returns a live transfer. Its id is retired.
    pub fn finish(&mut self, id: &str) -> Result<Transfer, TransferError> {
        let transfer = self
            .live
            .remove(id)
            .ok_or_else(|| TransferError::UnknownTransfer(id.to_string()))?;
        self.retire(transfer.id.clone());
        Ok(transfer)
    }

    /// Removes every live transfer, e.g. when the connection closes.
    pub fn abandon_all(&mut self) -> Vec<Transfer> {
        let abandoned: Vec<Transfer> = self.live.drain().map(|(_, t)| t).collect();
        for transfer in &abandoned {
            self.retire(transfer.id.clone());
        }
        abandoned
    }

    pub fn get(&self, id: &str) -> Option<&Transfer> {
        self.live.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }

    /// Number of live transfers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn live_mut(&mut self, id: &str) -> Result<&mut Transfer, TransferError> {
        self.live
            .get_mut(id)
            .ok_or_else(|| TransferError::UnknownTransfer(id.to_string()))
    }

    fn retire(&mut self, id: String) {
        if self.retired_capacity == 0 || !self.retired.insert(id.clone()) {
            return;
        }
        self.retired_order.push_back(id);
        while self.retired_order.len() > self.retired_capacity {
            if let Some(oldest) = self.retired_order.pop_front() {
                self.retired.remove(&oldest);
            }
        }
    }
}
