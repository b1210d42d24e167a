//! Delay run encoding.
//!
//! The device's wait opcode is a `0x00` byte followed by a duration byte.
//! Longer waits are chained: 600ms becomes `00 FF 00 FF 00 5A`.

/// Longest wait a single `(0x00, n)` pair can express.
pub const MAX_DELAY_PER_PAIR: u32 = 255;

/// Append the delay run for `ms` milliseconds to `out`. Zero appends nothing.
pub fn append_delay(out: &mut Vec<u8>, ms: u32) {
    let mut remaining = ms;
    while remaining > 0 {
        let chunk = remaining.min(MAX_DELAY_PER_PAIR);
        out.push(0x00);
        out.push(chunk as u8);
        remaining -= chunk;
    }
}

pub fn encode_delay(ms: u32) -> Vec<u8> {
    let pairs = ms.div_ceil(MAX_DELAY_PER_PAIR) as usize;
    let mut out = Vec::with_capacity(pairs * 2);
    append_delay(&mut out, ms);
    out
}
