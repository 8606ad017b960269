//! WS2812 bit encoding for a 3x oversampled SPI clock.
//!
//! Every data bit becomes three symbol bits on the wire: `110` for a one and
//! `100` for a zero. At ~2.4 MHz each symbol lasts ~0.42 µs, so a zero is a
//! short high pulse and a one a long one.

/// Symbol bits emitted per data bit.
pub const SYMBOL_BITS_PER_DATA_BIT: usize = 3;

/// Encoded bytes per 8-bit color channel.
pub const ENCODED_CHANNEL_BYTES: usize = 8 * SYMBOL_BITS_PER_DATA_BIT / 8;

const SYMBOL_ONE: u32 = 0b110;
const SYMBOL_ZERO: u32 = 0b100;

/// Encoding of a channel value of zero (`100` eight times).
pub const ENCODED_ZERO: [u8; ENCODED_CHANNEL_BYTES] = encode_channel(0x00);

/// Encode one color channel, most significant bit first.
pub const fn encode_channel(value: u8) -> [u8; ENCODED_CHANNEL_BYTES] {
    let mut pattern: u32 = 0;
    let mut bit = 8;
    while bit > 0 {
        bit -= 1;
        let symbol = if ((value >> bit) & 1) == 1 { SYMBOL_ONE } else { SYMBOL_ZERO };
        pattern = (pattern << SYMBOL_BITS_PER_DATA_BIT) | symbol;
    }
    [(pattern >> 16) as u8, (pattern >> 8) as u8, pattern as u8]
}

/// Recover a channel value from its encoding.
///
/// Returns `None` if any 3-bit group is not a valid symbol.
pub fn decode_channel(encoded: [u8; ENCODED_CHANNEL_BYTES]) -> Option<u8> {
    let pattern =
        (u32::from(encoded[0]) << 16) | (u32::from(encoded[1]) << 8) | u32::from(encoded[2]);

    let mut value = 0u8;
    for group in (0..8).rev() {
        let symbol = (pattern >> (group * SYMBOL_BITS_PER_DATA_BIT)) & 0b111;
        let bit = match symbol {
            SYMBOL_ONE => 1,
            SYMBOL_ZERO => 0,
            _ => return None,
        };
        value = (value << 1) | bit;
    }
    Some(value)
}
