use crate::error::DecodeError;

/// Minimum number of bits before framing is evaluated (6 symbols).
pub const MIN_FRAME_BITS: usize = 6 * 8;

/// Framing is evaluated every two symbols so both halves stay equal in length.
pub const FRAME_STEP_BITS: usize = 2 * 8;

/// Result of a framing checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// No repetition found yet, keep reading bits.
    Incomplete,
    /// The symbol sequence is two copies of this message.
    Framed(String),
}

/// Incremental framer: collects one bit per beat and detects when the
/// symbols read so far are two identical copies of the hidden message.
///
/// One framer lives for one calibration attempt; nothing is shared.
///
/// # Example
/// ```
/// use bma_core::framing::{FrameStatus, MessageFramer};
///
/// let mut framer = MessageFramer::new();
/// let mut status = FrameStatus::Incomplete;
/// for byte in b"AbCAbC" {
///     for shift in (0..8).rev() {
///         status = framer.push((byte >> shift) & 1).unwrap();
///     }
/// }
/// assert_eq!(status, FrameStatus::Framed("AbC".into()));
/// ```
#[derive(Debug, Default)]
pub struct MessageFramer {
    bits: Vec<u8>,
}

impl MessageFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: Vec::with_capacity(256),
        }
    }

    /// Append one bit (any non-zero value counts as 1) and evaluate the
    /// checkpoint if the length allows it.
    ///
    /// # Errors
    /// `NonAsciiSymbol` if, at a checkpoint, the last symbol is not an ASCII
    /// alphanumeric character.
    pub fn push(&mut self, bit: u8) -> Result<FrameStatus, DecodeError> {
        self.bits.push(u8::from(bit != 0));
        frame_bits(&self.bits)
    }

    /// Bits collected so far.
    #[must_use]
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Number of bits collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// `true` before the first bit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// `true` when a bit sequence of this length is a framing checkpoint.
#[inline]
#[must_use]
pub fn is_checkpoint(len: usize) -> bool {
    len >= MIN_FRAME_BITS && len % FRAME_STEP_BITS == 0
}

/// Group bits into 8-bit symbols, most significant bit first.
/// Trailing bits that do not fill a symbol are dropped.
///
/// # Example
/// ```
/// use bma_core::framing::bits_to_symbols;
/// assert_eq!(bits_to_symbols(&[0, 1, 0, 0, 0, 0, 0, 1, 1, 1]), vec![b'A']);
/// ```
#[must_use]
pub fn bits_to_symbols(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}

/// Evaluate a bit sequence as a whole.
///
/// Lengths that are not a checkpoint return `Incomplete` without looking at
/// the content.
///
/// Only ASCII letters and digits pass the last-symbol check. Latin-1 letters
/// such as `0xE9` are rejected, unlike a Unicode `isalnum` test.
///
/// # Errors
/// `NonAsciiSymbol` if the last symbol is not an ASCII alphanumeric character.
pub fn frame_bits(bits: &[u8]) -> Result<FrameStatus, DecodeError> {
    if !is_checkpoint(bits.len()) {
        return Ok(FrameStatus::Incomplete);
    }

    let symbols = bits_to_symbols(bits);
    if let Some(&last) = symbols.last().filter(|s| !s.is_ascii_alphanumeric()) {
        return Err(DecodeError::NonAsciiSymbol { value: last });
    }

    let (first, second) = symbols.split_at(symbols.len() / 2);
    if first == second {
        let message = first.iter().map(|&s| char::from(s)).collect();
        Ok(FrameStatus::Framed(message))
    } else {
        Ok(FrameStatus::Incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bits(bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
            .collect()
    }

    #[test]
    fn repeated_message_is_framed() {
        let bits = to_bits(b"AbCAbC");
        assert_eq!(bits.len(), 48);
        assert_eq!(
            frame_bits(&bits),
            Ok(FrameStatus::Framed("AbC".to_string()))
        );
    }

    #[test]
    fn one_flipped_bit_stays_incomplete() {
        let mut bits = to_bits(b"AbCAbC");
        // Second half, second symbol: 'b' (0x62) -> 'c' (0x63), still alphanumeric.
        bits[24 + 15] ^= 1;
        assert_eq!(frame_bits(&bits), Ok(FrameStatus::Incomplete));
    }

    #[test]
    fn non_alphanumeric_last_symbol_fails() {
        let mut bits = to_bits(b"AbCAb");
        bits.extend_from_slice(&[0; 8]);
        assert_eq!(
            frame_bits(&bits),
            Err(DecodeError::NonAsciiSymbol { value: 0 })
        );
    }

    #[test]
    fn only_the_last_symbol_is_validated() {
        let bits = to_bits(b"A b A b");
        // 7 symbols = 56 bits, not a checkpoint.
        assert_eq!(frame_bits(&bits), Ok(FrameStatus::Incomplete));
        let mut padded = to_bits(b"A bA bC");
        padded.extend(to_bits(b"x"));
        // 64 bits: last symbol 'x' is valid even though a space precedes it.
        assert_eq!(frame_bits(&padded), Ok(FrameStatus::Incomplete));
    }

    #[test]
    fn latin1_letter_is_not_alphanumeric() {
        let mut bits = to_bits(b"AbCAb");
        bits.extend(to_bits(&[0xE9]));
        assert_eq!(
            frame_bits(&bits),
            Err(DecodeError::NonAsciiSymbol { value: 0xE9 })
        );
    }

    #[test]
    fn checkpoints_follow_length_rules() {
        assert!(!is_checkpoint(0));
        assert!(!is_checkpoint(32));
        assert!(is_checkpoint(48));
        assert!(!is_checkpoint(56));
        assert!(is_checkpoint(64));
    }

    #[test]
    fn framer_detects_longer_message_at_later_checkpoint() {
        let mut framer = MessageFramer::new();
        let mut framed = None;
        for bit in to_bits(b"Hello1Hello1") {
            match framer.push(bit).expect("every checkpoint ends on an alphanumeric") {
                FrameStatus::Framed(message) => {
                    framed = Some((message, framer.len()));
                    break;
                }
                FrameStatus::Incomplete => {}
            }
        }
        assert_eq!(framed, Some(("Hello1".to_string(), 96)));
    }

    #[test]
    fn framer_normalizes_bit_values() {
        let mut framer = MessageFramer::new();
        let _ = framer.push(7);
        let _ = framer.push(0);
        assert_eq!(framer.bits(), &[1, 0]);
        assert!(!framer.is_empty());
    }

    #[test]
    fn trailing_bits_are_dropped() {
        assert_eq!(bits_to_symbols(&[1; 15]), vec![0xFF]);
        assert!(bits_to_symbols(&[]).is_empty());
    }
}
