//! Byte-level SSTable assembly helpers shared by the integration tests.
//!
//! This is not a write path: it is a literal, hand-rolled encoder used only
//! by `#[cfg(test)]`/integration-test code to build fixtures, mirroring how
//! the teacher's own test modules construct raw expected byte buffers by
//! hand rather than through the library itself.

use sstable_reader::BlockHandle;

pub const SUPPORTED_FOOTER_VERSION: u32 = 2;
pub const MAGIC: u64 = 0xF09F_9AA4_5353_5442;
pub const INDEX_TYPE_PROPERTY: &[u8] = b"rocksdb.block.based.table.index.type";
pub const PROPERTIES_BLOCK_NAME: &[u8] = b"rocksdb.properties";

pub fn uvarint_bytes(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
    out
}

pub fn encode_handle(h: &BlockHandle) -> Vec<u8> {
    let mut out = uvarint_bytes(h.offset);
    out.extend(uvarint_bytes(h.length));
    out
}

/// Builds a block payload (restart interval 1) from already-ordered
/// `(key, value)` pairs, prefix-compressing consecutive keys.
pub fn build_block(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut restarts = Vec::new();
    let mut prev_key: Vec<u8> = Vec::new();

    for (key, value) in entries {
        restarts.push(buf.len() as u32);
        let shared = key
            .iter()
            .zip(prev_key.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let unshared = &key[shared..];
        buf.extend(uvarint_bytes(shared as u64));
        buf.extend(uvarint_bytes(unshared.len() as u64));
        buf.extend(uvarint_bytes(value.len() as u64));
        buf.extend_from_slice(unshared);
        buf.extend_from_slice(value);
        prev_key = key.to_vec();
    }

    for r in &restarts {
        buf.extend_from_slice(&r.to_le_bytes());
    }
    buf.extend_from_slice(&(restarts.len() as u32).to_le_bytes());
    buf
}

/// Packs a user key with an internal-key trailer: `(sequence << 8) | kind`.
pub fn internal_key(user_key: &[u8], sequence: u64, kind: u8) -> Vec<u8> {
    let mut full = user_key.to_vec();
    let trailer = (sequence << 8) | kind as u64;
    full.extend_from_slice(&trailer.to_le_bytes());
    full
}

/// Appends a block payload plus its 5-byte trailer (compression type
/// "none", a real CRC32C checksum over payload + compression byte so
/// fixtures work whether or not a test turns on `verify_checksums`) and
/// returns the handle pointing at it.
pub fn append_block(file: &mut Vec<u8>, payload: &[u8]) -> BlockHandle {
    let offset = file.len() as u64;
    file.extend_from_slice(payload);
    file.push(0); // compression type: none
    let crc = crc32fast::hash(&file[offset as usize..]);
    file.extend_from_slice(&crc.to_le_bytes());
    BlockHandle::new(offset, payload.len() as u64)
}

/// Builds the fixed 53-byte footer trailer for the two block handles.
pub fn build_footer_bytes(meta_index: BlockHandle, index: BlockHandle) -> Vec<u8> {
    let mut handles = encode_handle(&meta_index);
    handles.extend(encode_handle(&index));
    handles.resize(37, 0);
    handles.extend_from_slice(&SUPPORTED_FOOTER_VERSION.to_le_bytes());
    handles.extend_from_slice(&0u32.to_le_bytes());
    handles.extend_from_slice(&MAGIC.to_le_bytes());
    handles
}

/// Assembles a full single-level-index table: data blocks, a single-level
/// index over them, a properties block declaring `index_type = 0`, a
/// meta-index pointing at the properties block, and the trailing footer.
pub fn build_single_level_table(data_blocks: &[Vec<(&[u8], &[u8])>]) -> Vec<u8> {
    let mut file = Vec::new();

    let mut index_entries: Vec<(Vec<u8>, BlockHandle)> = Vec::new();
    for block_entries in data_blocks {
        let payload = build_block(block_entries);
        let handle = append_block(&mut file, &payload);
        let separator = block_entries.last().map(|(k, _)| k.to_vec()).unwrap_or_default();
        index_entries.push((separator, handle));
    }

    let mut index_payload_entries: Vec<(&[u8], Vec<u8>)> = Vec::new();
    for (key, handle) in &index_entries {
        index_payload_entries.push((key.as_slice(), encode_handle(handle)));
    }
    let index_payload_refs: Vec<(&[u8], &[u8])> = index_payload_entries
        .iter()
        .map(|(k, v)| (*k, v.as_slice()))
        .collect();
    let index_payload = build_block(&index_payload_refs);
    let index_handle = append_block(&mut file, &index_payload);

    let properties_payload = build_block(&[(INDEX_TYPE_PROPERTY, &uvarint_bytes(0)[..])]);
    let properties_handle = append_block(&mut file, &properties_payload);
    let meta_index_payload =
        build_block(&[(PROPERTIES_BLOCK_NAME, &encode_handle(&properties_handle)[..])]);
    let meta_index_handle = append_block(&mut file, &meta_index_payload);

    let footer_bytes = build_footer_bytes(meta_index_handle, index_handle);
    file.extend_from_slice(&footer_bytes);
    file
}

/// Assembles a full two-level-index table: `second_level_groups` partitions
/// the data blocks, each partition getting its own second-level index
/// block; the top-level index then points at those second-level blocks.
pub fn build_two_level_table(second_level_groups: &[Vec<Vec<(&[u8], &[u8])>>]) -> Vec<u8> {
    let mut file = Vec::new();

    let mut top_level_entries: Vec<(Vec<u8>, BlockHandle)> = Vec::new();

    for group in second_level_groups {
        let mut second_level_entries: Vec<(Vec<u8>, BlockHandle)> = Vec::new();
        for block_entries in group {
            let payload = build_block(block_entries);
            let handle = append_block(&mut file, &payload);
            let separator = block_entries.last().map(|(k, _)| k.to_vec()).unwrap_or_default();
            second_level_entries.push((separator, handle));
        }

        let mut payload_entries: Vec<(&[u8], Vec<u8>)> = Vec::new();
        for (key, handle) in &second_level_entries {
            payload_entries.push((key.as_slice(), encode_handle(handle)));
        }
        let payload_refs: Vec<(&[u8], &[u8])> =
            payload_entries.iter().map(|(k, v)| (*k, v.as_slice())).collect();
        let second_level_payload = build_block(&payload_refs);
        let second_level_handle = append_block(&mut file, &second_level_payload);

        let group_separator = second_level_entries
            .last()
            .map(|(k, _)| k.clone())
            .unwrap_or_default();
        top_level_entries.push((group_separator, second_level_handle));
    }

    let mut top_payload_entries: Vec<(&[u8], Vec<u8>)> = Vec::new();
    for (key, handle) in &top_level_entries {
        top_payload_entries.push((key.as_slice(), encode_handle(handle)));
    }
    let top_payload_refs: Vec<(&[u8], &[u8])> =
        top_payload_entries.iter().map(|(k, v)| (*k, v.as_slice())).collect();
    let top_level_payload = build_block(&top_payload_refs);
    let index_handle = append_block(&mut file, &top_level_payload);

    let properties_payload = build_block(&[(INDEX_TYPE_PROPERTY, &uvarint_bytes(1)[..])]);
    let properties_handle = append_block(&mut file, &properties_payload);
    let meta_index_payload =
        build_block(&[(PROPERTIES_BLOCK_NAME, &encode_handle(&properties_handle)[..])]);
    let meta_index_handle = append_block(&mut file, &meta_index_payload);

    let footer_bytes = build_footer_bytes(meta_index_handle, index_handle);
    file.extend_from_slice(&footer_bytes);
    file
}
