//! Byte-oriented LZSS with a parameterised window, as used by `.INT` archives.
//!
//! Each group of up to eight tokens is preceded by a flag byte, read LSB first: a set
//! bit is a literal byte, a clear bit a two-byte back reference. A reference holds a
//! window position in its low `index_bits` and a length (minus `threshold + 1`) in its
//! low `length_bits`.

use crate::compression::{Compression, CompressionError};

const HASH_BITS: u32 = 14;
const MAX_CHAIN: usize = 256;
const NIL: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lzss {
    /// log2 of the window size; `index_bits + length_bits` must be 16.
    pub index_bits: u32,
    pub length_bits: u32,
    /// Longest match that is still cheaper as literals.
    pub threshold: usize,
    /// How far before `N - F` the window cursor starts.
    pub lead_gap: usize,
    /// Initial window contents.
    pub fill: u8,
}

impl Lzss {
    /// The parameters the game's archives are packed with.
    pub const PTR2: Lzss = Lzss {
        index_bits: 12,
        length_bits: 4,
        threshold: 2,
        lead_gap: 2,
        fill: 0,
    };

    fn win_len(&self) -> usize { 1 << self.index_bits }
    fn min_match(&self) -> usize { self.threshold + 1 }
    fn max_match(&self) -> usize { (1 << self.length_bits) + self.threshold }

    fn start_pos(&self) -> usize {
        self.win_len() - (1 << self.length_bits) - self.lead_gap
    }

    pub fn expand(&self, bs: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, CompressionError> {
        debug_assert_eq!(self.index_bits + self.length_bits, 16);

        if uncompressed_size > bs.len().saturating_mul(self.max_match()) {
            return Err(CompressionError::Implausible {
                declared: uncompressed_size,
                input: bs.len(),
            });
        }

        let mask = self.win_len() - 1;
        let len_mask = (1 << self.length_bits) - 1;
        let mut window = vec![self.fill; self.win_len()];
        let mut cur_pos = self.start_pos();
        let mut out = Vec::with_capacity(uncompressed_size);

        let mut bs = bs.iter().copied();
        let mut flags = 0u32;

        'expand: while out.len() < uncompressed_size {
            flags >>= 1;
            if flags & 0x100 == 0 {
                let Some(byte) = bs.next() else {break};
                flags = byte as u32 | 0xff00;
            }

            if flags & 1 != 0 {
                let Some(byte) = bs.next() else {break};
                out.push(byte);
                window[cur_pos] = byte;
                cur_pos = (cur_pos + 1) & mask;
            }
            else {
                let (Some(lo), Some(hi)) = (bs.next(), bs.next()) else {break};
                let pos = (lo as usize | (hi as usize >> self.length_bits) << 8) & mask;
                let len = (hi as usize & len_mask) + self.threshold;

                for i in 0 ..= len {
                    if out.len() == uncompressed_size {break 'expand}
                    let out_byte = window[(pos + i) & mask];
                    out.push(out_byte);
                    window[cur_pos] = out_byte;
                    cur_pos = (cur_pos + 1) & mask;
                }
            }
        }

        if out.len() != uncompressed_size {
            return Err(CompressionError::SizeMismatch {
                declared: uncompressed_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    /// Greedy hash-chain compressor. Back references only ever reach bytes already
    /// emitted, so the output never depends on `fill`.
    pub fn pack(&self, bs: &[u8]) -> Vec<u8> {
        debug_assert_eq!(self.index_bits + self.length_bits, 16);

        let mask = self.win_len() - 1;
        let max_dist = self.win_len() - 1;
        let start = self.start_pos();

        let mut head = vec![NIL; 1 << HASH_BITS];
        let mut prev = vec![NIL; bs.len()];

        let mut out = Vec::with_capacity(bs.len() + bs.len() / 8 + 1);
        let mut flag_at = 0;
        let mut n_tokens = 0;
        let mut i = 0;
        if !bs.is_empty() {out.push(0)}

        while i < bs.len() {
            if n_tokens == 8 {
                flag_at = out.len();
                out.push(0);
                n_tokens = 0;
            }

            let (best_len, best_from) = self.longest_match(bs, i, &head, &prev, max_dist);

            if best_len >= self.min_match() {
                let pos = (start + best_from) & mask;
                let code = best_len - self.min_match();
                out.push(pos as u8);
                out.push(((pos >> 8) << self.length_bits | code) as u8);
                for j in i .. i + best_len {insert(bs, j, &mut head, &mut prev)}
                i += best_len;
            }
            else {
                out[flag_at] |= 1 << n_tokens;
                out.push(bs[i]);
                insert(bs, i, &mut head, &mut prev);
                i += 1;
            }
            n_tokens += 1;
        }

        out
    }

    fn longest_match(&self, bs: &[u8], i: usize, head: &[usize], prev: &[usize], max_dist: usize)
        -> (usize, usize)
    {
        let limit = self.max_match().min(bs.len() - i);
        if limit < self.min_match() {return (0, 0)}

        let mut best = (0, 0);
        let mut cand = head[hash3(bs, i)];
        let mut steps = 0;
        while cand != NIL && i - cand <= max_dist && steps < MAX_CHAIN {
            let len = bs[cand..].iter()
                .zip(&bs[i .. i + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if len > best.0 {
                best = (len, cand);
                if len == limit {break}
            }
            cand = prev[cand];
            steps += 1;
        }
        best
    }
}

fn hash3(bs: &[u8], i: usize) -> usize {
    let h = (bs[i] as u32) << 16 | (bs[i + 1] as u32) << 8 | bs[i + 2] as u32;
    (h.wrapping_mul(0x9e37_79b1) >> (32 - HASH_BITS)) as usize
}

fn insert(bs: &[u8], i: usize, head: &mut [usize], prev: &mut [usize]) {
    if i + 2 < bs.len() {
        let h = hash3(bs, i);
        prev[i] = head[h];
        head[h] = i;
    }
}

impl Default for Lzss {
    fn default() -> Self { Lzss::PTR2 }
}

impl Compression for Lzss {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let packed = self.pack(data);
        log::trace!("lzss: packed {} -> {} bytes", data.len(), packed.len());
        Ok(packed)
    }

    fn decompress(&self, data: &[u8], compressed_size: u32, uncompressed_size: u32)
        -> Result<Vec<u8>, CompressionError>
    {
        let data = &data[..data.len().min(compressed_size as usize)];
        self.expand(data, uncompressed_size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bs: &[u8]) -> Vec<u8> {
        let lzss = Lzss::PTR2;
        let packed = lzss.pack(bs);
        let unpacked = lzss.expand(&packed, bs.len()).unwrap();
        assert_eq!(unpacked, bs);
        packed
    }

    #[test]
    fn expands_literals_and_references() {
        // three literals, then a reference to window position 0xfee (the start) of length 3
        let packed = [0x07, b'a', b'b', b'c', 0xee, 0xf0];
        assert_eq!(Lzss::PTR2.expand(&packed, 6).unwrap(), b"abcabc");
    }

    #[test]
    fn references_before_the_start_read_the_fill() {
        let packed = [0x00, 0x00, 0x00];
        assert_eq!(Lzss::PTR2.expand(&packed, 3).unwrap(), [0, 0, 0]);

        let spaces = Lzss{fill: b' ', ..Lzss::PTR2};
        assert_eq!(spaces.expand(&packed, 3).unwrap(), b"   ");
    }

    #[test]
    fn expansion_stops_at_declared_size() {
        let packed = [0x07, b'a', b'b', b'c', 0xee, 0xf0];
        assert_eq!(Lzss::PTR2.expand(&packed, 4).unwrap(), b"abca");
        assert!(matches!(
            Lzss::PTR2.expand(&packed, 7),
            Err(CompressionError::SizeMismatch{declared: 7, actual: 6})
        ));
    }

    #[test]
    fn implausible_sizes_are_rejected_up_front() {
        assert!(matches!(
            Lzss::PTR2.expand(&[0x00, 0x00], 1 << 20),
            Err(CompressionError::Implausible{..})
        ));
    }

    #[test]
    fn round_trips() {
        round_trip(b"");
        round_trip(b"a");
        round_trip(b"ab");
        round_trip(b"abcabcabcabcabcabcabcabcabcabc");

        let runs = round_trip(&[0x55; 1000]);
        assert!(runs.len() < 150);

        let text = b"the quick brown fox jumps over the lazy dog. ".repeat(200);
        let packed = round_trip(&text);
        assert!(packed.len() < text.len() / 4);

        // xorshift noise, long enough to wrap the window several times
        let mut x = 0x2545_f491_u32;
        let noise = (0..20_000)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                (x % 7) as u8
            })
            .collect::<Vec<_>>();
        round_trip(&noise);
    }

    #[test]
    fn decompress_honours_compressed_size() {
        let lzss = Lzss::PTR2;
        let mut packed = lzss.pack(b"hello hello hello");
        let n = packed.len() as u32;
        packed.extend_from_slice(&[0xff; 8]);
        assert_eq!(lzss.decompress(&packed, n, 17).unwrap(), b"hello hello hello");
    }
}
