//! Content fingerprints for change detection

use crate::error::{EngineError, Result};
use std::path::Path;

/// Files at or above this size are hashed through a memory map
const MEMMAP_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB
const BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Fingerprint a byte slice
///
/// BLAKE3 digest rendered as 64 lowercase hex characters.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Fingerprint a file's current on-disk content
///
/// Uses memory mapping for large files, buffered reads otherwise.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    use blake3::Hasher;
    use memmap2::MmapOptions;
    use std::fs::File;
    use std::io::{BufReader, Read};

    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let file_size = file
        .metadata()
        .map_err(|e| EngineError::io(path, e))?
        .len();

    let mut hasher = Hasher::new();

    if file_size >= MEMMAP_THRESHOLD {
        // Safety: the map is read-only and dropped before this function returns
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| EngineError::io(path, e))?;
        hasher.update(&mmap[..]);
        return Ok(hasher.finalize().to_hex().to_string());
    }

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| EngineError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
