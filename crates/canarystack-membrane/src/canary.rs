//! Boundary canaries.
//!
//! Two independent envelopes:
//! - the heap buffer: `ENVELOPE_WIDTH` words before and after the data region,
//! - the control structure: fixed arrays as its first and last fields.
//!
//! Overflow out of the data region hits the buffer envelope; a stray write
//! into the control structure hits the struct envelope. They report through
//! different flags.

use crate::status::Status;

/// Word type of a canary.
pub type CanaryWord = u64;

/// Size of one canary word in bytes.
pub const CANARY_WORD_SIZE: usize = std::mem::size_of::<CanaryWord>();

/// Number of canary words on each side of a protected region.
pub const ENVELOPE_WIDTH: usize = 3;

/// Bytes occupied by one envelope.
pub const ENVELOPE_BYTES: usize = ENVELOPE_WIDTH * CANARY_WORD_SIZE;

/// Sentinel preceding a protected region.
pub const LEFT_CANARY: CanaryWord = 0xFEED_FACE_CAFE_BEE9;

/// Sentinel following a protected region.
pub const RIGHT_CANARY: CanaryWord = 0xFEED_FACE_CAFE_BEE8;

/// Canary words embedded in the control structure.
pub type StructEnvelope = [CanaryWord; ENVELOPE_WIDTH];

/// Outcome of checking all four envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanaryReport {
    pub left_buffer_ok: bool,
    pub right_buffer_ok: bool,
    pub left_struct_ok: bool,
    pub right_struct_ok: bool,
}

impl CanaryReport {
    /// Report with every envelope intact.
    #[must_use]
    pub const fn intact() -> Self {
        Self {
            left_buffer_ok: true,
            right_buffer_ok: true,
            left_struct_ok: true,
            right_struct_ok: true,
        }
    }

    /// One flag per corrupted envelope.
    #[must_use]
    pub fn status(&self) -> Status {
        let mut status = Status::OK;
        status.set(Status::LEFT_DATA_CANARY, !self.left_buffer_ok);
        status.set(Status::RIGHT_DATA_CANARY, !self.right_buffer_ok);
        status.set(Status::LEFT_STRUCT_CANARY, !self.left_struct_ok);
        status.set(Status::RIGHT_STRUCT_CANARY, !self.right_struct_ok);
        status
    }
}

/// Canary placement and verification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanaryEnvelope {
    left: CanaryWord,
    right: CanaryWord,
}

impl CanaryEnvelope {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: LEFT_CANARY,
            right: RIGHT_CANARY,
        }
    }

    /// Freshly armed struct envelopes.
    #[must_use]
    pub const fn struct_envelopes(&self) -> (StructEnvelope, StructEnvelope) {
        ([self.left; ENVELOPE_WIDTH], [self.right; ENVELOPE_WIDTH])
    }

    /// Write the left sentinel into an `ENVELOPE_BYTES`-long buffer region.
    pub fn arm_left(&self, region: &mut [u8]) {
        fill_words(region, self.left);
    }

    /// Write the right sentinel into an `ENVELOPE_BYTES`-long buffer region.
    pub fn arm_right(&self, region: &mut [u8]) {
        fill_words(region, self.right);
    }

    /// Check both buffer envelopes and both struct envelopes.
    #[must_use]
    pub fn verify(
        &self,
        left_buffer: &[u8],
        right_buffer: &[u8],
        left_struct: &StructEnvelope,
        right_struct: &StructEnvelope,
    ) -> CanaryReport {
        CanaryReport {
            left_buffer_ok: words_match(left_buffer, self.left),
            right_buffer_ok: words_match(right_buffer, self.right),
            left_struct_ok: left_struct.iter().all(|&w| w == self.left),
            right_struct_ok: right_struct.iter().all(|&w| w == self.right),
        }
    }

    /// Check only the struct envelopes (buffer not readable).
    #[must_use]
    pub fn verify_struct(
        &self,
        left_struct: &StructEnvelope,
        right_struct: &StructEnvelope,
    ) -> CanaryReport {
        CanaryReport {
            left_struct_ok: left_struct.iter().all(|&w| w == self.left),
            right_struct_ok: right_struct.iter().all(|&w| w == self.right),
            ..CanaryReport::intact()
        }
    }

    /// Decode the words of a buffer envelope for display.
    #[must_use]
    pub fn read_words(region: &[u8]) -> Vec<CanaryWord> {
        region
            .chunks_exact(CANARY_WORD_SIZE)
            .map(|chunk| {
                let mut word = [0_u8; CANARY_WORD_SIZE];
                word.copy_from_slice(chunk);
                CanaryWord::from_ne_bytes(word)
            })
            .collect()
    }
}

impl Default for CanaryEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_words(region: &mut [u8], word: CanaryWord) {
    let bytes = word.to_ne_bytes();
    for chunk in region.chunks_exact_mut(CANARY_WORD_SIZE) {
        chunk.copy_from_slice(&bytes);
    }
}

fn words_match(region: &[u8], word: CanaryWord) -> bool {
    region.len() == ENVELOPE_BYTES
        && region
            .chunks_exact(CANARY_WORD_SIZE)
            .all(|chunk| chunk == word.to_ne_bytes().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed() -> (CanaryEnvelope, [u8; ENVELOPE_BYTES], [u8; ENVELOPE_BYTES]) {
        let env = CanaryEnvelope::new();
        let mut left = [0_u8; ENVELOPE_BYTES];
        let mut right = [0_u8; ENVELOPE_BYTES];
        env.arm_left(&mut left);
        env.arm_right(&mut right);
        (env, left, right)
    }

    #[test]
    fn armed_envelopes_verify() {
        let (env, left, right) = armed();
        let (ls, rs) = env.struct_envelopes();
        let report = env.verify(&left, &right, &ls, &rs);
        assert_eq!(report, CanaryReport::intact());
        assert!(report.status().is_ok());
    }

    #[test]
    fn buffer_and_struct_corruption_are_distinct() {
        let (env, mut left, right) = armed();
        let (ls, mut rs) = env.struct_envelopes();
        left[3] ^= 0xFF;
        rs[1] = 0;
        let status = env.verify(&left, &right, &ls, &rs).status();
        assert_eq!(status, Status::LEFT_DATA_CANARY | Status::RIGHT_STRUCT_CANARY);
    }

    #[test]
    fn left_and_right_words_differ() {
        assert_ne!(LEFT_CANARY, RIGHT_CANARY);
        let (env, left, _) = armed();
        let (ls, rs) = env.struct_envelopes();
        // A left envelope is not a valid right envelope.
        let report = env.verify(&left, &left, &ls, &rs);
        assert!(!report.right_buffer_ok);
    }

    #[test]
    fn read_words_decodes_sentinels() {
        let (_, left, _) = armed();
        assert_eq!(CanaryEnvelope::read_words(&left), vec![LEFT_CANARY; ENVELOPE_WIDTH]);
    }
}
