//! Decoder for the 4-bit ADPCM used by the PlayStation SPU ("VAG" data).
//!
//! A stream is a sequence of 16-byte blocks. Byte 0 holds the shift (low nibble)
//! and predictor filter (high nibble), byte 1 the loop/end flags, and the other 14
//! bytes hold 28 nibbles, low nibble first.
//!
//! Prediction uses the SPU's 1/64 fixed-point coefficients with rounding, so output
//! can differ by one LSB from decoders that use float coefficients and truncate.

pub mod wav;

use std::slice::ChunksExact;

pub const BLOCK_LEN: usize = 16;
pub const SAMPLES_PER_BLOCK: usize = 28;

// predictor coefficients in 1/64ths
const PT: [i32; 5] = [0, 60, 115,  98, 122];
const NT: [i32; 5] = [0,  0, -52, -55, -60];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flag {
    Nothing        = 0,
    LoopLastBlock  = 1,
    LoopRegion     = 2,
    LoopEnd        = 3,
    LoopFirstBlock = 4,
    Unknown        = 5,
    LoopStart      = 6,
    PlaybackEnd    = 7,
}

impl Flag {
    pub fn from_raw(raw: u8) -> Option<Flag> {
        use Flag::*;
        let flag = match raw {
            0 => Nothing,
            1 => LoopLastBlock,
            2 => LoopRegion,
            3 => LoopEnd,
            4 => LoopFirstBlock,
            5 => Unknown,
            6 => LoopStart,
            7 => PlaybackEnd,
            _ => return None,
        };
        Some(flag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub shift:  u8,
    /// Predictor index, already clamped to the table.
    pub filter: u8,
    pub flags:  u8,
}

impl BlockHeader {
    pub fn parse([sf, flags]: [u8; 2]) -> Self {
        let shift  = sf & 0xf;
        let filter = (sf >> 4).min(PT.len() as u8 - 1);
        BlockHeader{shift, filter, flags}
    }

    pub fn flag(&self) -> Option<Flag> {
        Flag::from_raw(self.flags)
    }

    pub fn is_end(&self) -> bool {
        self.flags == Flag::PlaybackEnd as u8
    }
}

/// Decodes one block's nibbles, carrying the two-sample history across calls.
pub fn decode_block(history: &mut [i32; 2], header: BlockHeader, pairs: &[u8; 14])
    -> [i16; SAMPLES_PER_BLOCK]
{
    let [p, pp] = history;
    let f0 = PT[header.filter as usize];
    let f1 = NT[header.filter as usize];

    let mut samples = [0i16; SAMPLES_PER_BLOCK];
    let nibbles = pairs.iter().flat_map(|&pair| [pair & 0xf, pair >> 4]);
    for (out, nibble) in samples.iter_mut().zip(nibbles) {
        // the shift into the top of an i16 sign-extends the nibble
        let shifted = (((nibble as i16) << 12) >> header.shift) as i32;
        let sample = shifted + ((*p * f0 + *pp * f1 + 32) >> 6);
        let sample = sample.clamp(-0x8000, 0x7fff);
        *pp = *p;
        *p = sample;
        *out = sample as i16;
    }
    samples
}

/// Lazily decodes a block stream into mono 16-bit PCM.
///
/// Decoding ends at the first block flagged [`Flag::PlaybackEnd`] or when the input
/// runs out; a trailing partial block is dropped. The decoder cannot be rewound,
/// call [`decode`] again to start over.
pub struct Decoder<'a> {
    blocks: ChunksExact<'a, u8>,
    history: [i32; 2],
    pending: [i16; SAMPLES_PER_BLOCK],
    next: usize,
    done: bool,
}

pub fn decode(adpcm: &[u8]) -> Decoder<'_> {
    let rem = adpcm.len() % BLOCK_LEN;
    if rem != 0 {
        log::warn!("adpcm stream has {rem} trailing bytes past the last whole block");
    }

    Decoder {
        blocks: adpcm.chunks_exact(BLOCK_LEN),
        history: [0; 2],
        pending: [0; SAMPLES_PER_BLOCK],
        next: SAMPLES_PER_BLOCK,
        done: false,
    }
}

impl Decoder<'_> {
    fn refill(&mut self) -> bool {
        let Some(block) = self.blocks.next() else {return false};
        let header = BlockHeader::parse([block[0], block[1]]);
        if header.is_end() {return false}

        let Ok(pairs) = <&[u8; 14]>::try_from(&block[2..]) else {return false};
        self.pending = decode_block(&mut self.history, header, pairs);
        self.next = 0;
        true
    }
}

impl Iterator for Decoder<'_> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.done {return None}
        if self.next == SAMPLES_PER_BLOCK && !self.refill() {
            self.done = true;
            return None;
        }
        let sample = self.pending[self.next];
        self.next += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {return (0, Some(0))}
        let buffered = SAMPLES_PER_BLOCK - self.next;
        let upper = buffered + self.blocks.len() * SAMPLES_PER_BLOCK;
        (buffered, Some(upper))
    }
}

impl std::iter::FusedIterator for Decoder<'_> {}
