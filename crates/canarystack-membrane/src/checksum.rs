//! Structural and data checksums.
//!
//! Canaries only see contiguous overflow across a boundary. A wild write that
//! lands in the middle of the control structure or the data region is caught
//! here: both digests are recomputed after every mutation and compared
//! lazily by the health check.

/// Digest algorithm.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    /// CRC32 (hardware accelerated where available).
    #[default]
    Crc32,
    /// BLAKE3 truncated to 64 bits.
    Blake3,
}

impl ChecksumKind {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" | "crc" => Some(Self::Crc32),
            "blake3" | "b3" => Some(Self::Blake3),
            _ => None,
        }
    }
}

/// Scalar fields of the control structure covered by the structural digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructFields {
    pub buffer_addr: usize,
    pub data_offset: usize,
    pub capacity: usize,
    pub len: usize,
    pub status: u32,
    pub sink_identity: u64,
    pub data_checksum: u64,
}

impl StructFields {
    fn to_bytes(self) -> [u8; 56] {
        let words = [
            self.buffer_addr as u64,
            self.data_offset as u64,
            self.capacity as u64,
            self.len as u64,
            u64::from(self.status),
            self.sink_identity,
            self.data_checksum,
        ];
        let mut out = [0_u8; 56];
        for (chunk, word) in out.chunks_exact_mut(8).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// Cached digests of one stack.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksums {
    pub structural: u64,
    pub data: u64,
}

/// Checksum strategy: which digests are kept and with what algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumPolicy {
    kind: ChecksumKind,
    structural: bool,
    data: bool,
}

impl ChecksumPolicy {
    #[must_use]
    pub const fn new(kind: ChecksumKind, structural: bool, data: bool) -> Self {
        Self {
            kind,
            structural,
            data,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ChecksumKind {
        self.kind
    }

    #[must_use]
    pub const fn covers_struct(&self) -> bool {
        self.structural
    }

    #[must_use]
    pub const fn covers_data(&self) -> bool {
        self.data
    }

    /// Digest of the control structure's scalar fields (0 when disabled).
    #[must_use]
    pub fn struct_hash(&self, fields: StructFields) -> u64 {
        if !self.structural {
            return 0;
        }
        digest(self.kind, &fields.to_bytes())
    }

    /// Digest of every byte of the data region (0 when disabled).
    #[must_use]
    pub fn data_hash(&self, data: &[u8]) -> u64 {
        if !self.data {
            return 0;
        }
        digest(self.kind, data)
    }
}

fn digest(kind: ChecksumKind, bytes: &[u8]) -> u64 {
    match kind {
        ChecksumKind::Crc32 => {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(bytes);
            u64::from(hasher.finalize())
        }
        ChecksumKind::Blake3 => {
            let hash = blake3::hash(bytes);
            let mut head = [0_u8; 8];
            head.copy_from_slice(&hash.as_bytes()[..8]);
            u64::from_le_bytes(head)
        }
    }
}
