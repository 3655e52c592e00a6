const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    extend_fnv1a64(&mut hash, bytes);
    hash
}

pub fn extend_fnv1a64(hash: &mut u64, bytes: &[u8]) {
    for &byte in bytes {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

pub fn sequence_hash(frame_hashes: &[u64]) -> u64 {
    let mut bytes = Vec::with_capacity(frame_hashes.len() * 8);
    for hash in frame_hashes {
        bytes.extend_from_slice(&hash.to_le_bytes());
    }
    fnv1a64(&bytes)
}

pub fn hex(hash: u64) -> String {
    format!("0x{hash:016x}")
}
