//! Block boundaries from the trailing byte count.
//!
//! Every finished stream ends with a 3-byte big-endian count of all bytes
//! written for it, header and trailer included (plus any initial count the
//! encoder was given). Given only where a block ends, that is enough to walk
//! back to where it starts. The count is kept modulo 2^24, so blocks of
//! 16 MiB or more cannot be located this way.

/// Length of the trailing count.
pub const TRAILER_LEN: usize = 3;

/// Byte count stored in the last three bytes of `block`.
pub fn trailing_byte_count(block: &[u8]) -> Option<u32> {
    let tail = block.len().checked_sub(TRAILER_LEN)?;
    match block[tail..] {
        [hi, mid, lo] => Some(u32::from_be_bytes([0, hi, mid, lo])),
        _ => None,
    }
}

/// Offset in `data` of the block that ends just before `end`.
///
/// Returns `None` if `end` is past the data or the count points before the
/// start of `data`.
pub fn block_start(data: &[u8], end: usize) -> Option<usize> {
    let count = trailing_byte_count(data.get(..end)?)?;
    end.checked_sub(count as usize)
}

/// Split a run of back-to-back blocks, walking backwards from the end.
///
/// Blocks come out in stream order. Stops with `None` if any trailer is
/// inconsistent.
pub fn split_blocks(data: &[u8]) -> Option<Vec<&[u8]>> {
    let mut blocks = Vec::new();
    let mut end = data.len();
    while end > 0 {
        let start = block_start(data, end)?;
        if start == end {
            return None;
        }
        blocks.push(&data[start..end]);
        end = start;
    }
    blocks.reverse();
    Some(blocks)
}
