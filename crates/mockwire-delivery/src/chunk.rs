//! Body chunking.
//!
//! Splits a `Bytes` body into the pieces the engine emits as data events.
//! Pieces are `Bytes::slice()`s of the original buffer, so splitting
//! never copies body data.

use bytes::Bytes;

/// The ordered pieces of a body, one per data event.
///
/// Given a hint `h` and a body of `len` bytes:
///
/// - `len == 0` yields exactly one empty piece, whatever the hint.
/// - otherwise the piece count is `max(h, 1)` clamped to `len`, and the
///   `len % count` remainder bytes go one each to the leading pieces
///   (`len = 10, h = 3` gives 4, 3, 3).
///
/// Every piece but the empty-body case is at least one byte long, and
/// the pieces concatenate back to the body exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Bytes>,
}

impl ChunkPlan {
    pub fn new(body: &Bytes, hint: usize) -> Self {
        let len = body.len();
        if len == 0 {
            return Self {
                chunks: vec![Bytes::new()],
            };
        }

        let count = hint.clamp(1, len);
        let base = len / count;
        let remainder = len % count;

        let mut chunks = Vec::with_capacity(count);
        let mut offset = 0;
        for i in 0..count {
            let size = base + usize::from(i < remainder);
            chunks.push(body.slice(offset..offset + size));
            offset += size;
        }
        debug_assert_eq!(offset, len);

        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always `false`: a plan has at least one piece.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.chunks.get(index)
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.chunks.iter().map(Bytes::len).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.chunks.iter()
    }
}
