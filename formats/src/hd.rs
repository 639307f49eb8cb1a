//! `.HD` sound bank headers and their `.BD` bodies.
//!
//! The header file is a sequence of tagged chunks. Every chunk starts with its
//! creator (`SCEI`) and type tags, each stored byte-reversed, then a little-endian
//! u32 total length. Lengths are padded out to 16 bytes with `0xff`. The version
//! chunk comes first and the header chunk second; the header chunk then gives the
//! absolute positions of the rest. The body file is raw ADPCM, addressed only
//! through the VAG info table.

use crate::{
    Error, Result,
    grab::{at, field, grab, le_u16, le_u32, le_u32s, resolve, take},
    vag::Vag,
};

pub const CREATOR: [u8; 4] = *b"SCEI";
const CHUNK_HEAD_LEN: usize = 12;
const ALIGN: usize = 16;
const FILL: u8 = 0xff;
const HEADER_CHUNK_LEN: usize = 64;
const VAG_INFO_ITEM_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Version,
    Header,
    VagInfo,
    Sample,
    SampleSet,
    Program,
}

impl ChunkType {
    pub const ALL: [ChunkType; 6] = {
        use ChunkType::*;
        [Version, Header, VagInfo, Sample, SampleSet, Program]
    };

    pub fn tag(self) -> [u8; 4] {
        use ChunkType::*;
        match self {
            Version   => *b"Vers",
            Header    => *b"Head",
            VagInfo   => *b"Vagi",
            Sample    => *b"Smpl",
            SampleSet => *b"Sset",
            Program   => *b"Prog",
        }
    }

    pub fn from_tag(tag: [u8; 4]) -> Option<ChunkType> {
        ChunkType::ALL.into_iter().find(|ty| ty.tag() == tag)
    }
}

/// The payload of one kind of chunk.
pub trait Chunk: Sized {
    const TYPE: ChunkType;

    /// Smallest total length the chunk is padded out to.
    const MIN_LEN: usize = 0;

    /// Parses the payload. `record` is the whole chunk, tags and length included,
    /// since some chunks address their contents from the chunk start.
    fn parse(record: &[u8]) -> Result<Self>;

    fn write(&self, out: &mut Vec<u8>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionChunk {
    pub reserved: [u8; 2],
    pub major: u8,
    pub minor: u8,
}

impl Chunk for VersionChunk {
    const TYPE: ChunkType = ChunkType::Version;

    fn parse(record: &[u8]) -> Result<Self> {
        let [r0, r1, major, minor]: [u8; 4] = grab(&mut &record[CHUNK_HEAD_LEN..], "version")?;
        Ok(VersionChunk{reserved: [r0, r1], major, minor})
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.reserved);
        out.extend_from_slice(&[self.major, self.minor]);
        Ok(())
    }
}

/// File sizes and absolute chunk positions. Everything but `bd_file_size` is
/// recomputed when a bank is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderChunk {
    pub hd_file_size: u32,
    pub bd_file_size: u32,
    pub program_offset: u32,
    pub sample_set_offset: u32,
    pub sample_offset: u32,
    pub vag_info_offset: u32,
}

impl Chunk for HeaderChunk {
    const TYPE: ChunkType = ChunkType::Header;
    const MIN_LEN: usize = HEADER_CHUNK_LEN;

    fn parse(record: &[u8]) -> Result<Self> {
        let cursor = &mut &record[CHUNK_HEAD_LEN..];
        Ok(HeaderChunk {
            hd_file_size:      le_u32(cursor, "hd file size")?,
            bd_file_size:      le_u32(cursor, "bd file size")?,
            program_offset:    le_u32(cursor, "program chunk offset")?,
            sample_set_offset: le_u32(cursor, "sample set chunk offset")?,
            sample_offset:     le_u32(cursor, "sample chunk offset")?,
            vag_info_offset:   le_u32(cursor, "vag info chunk offset")?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let words = [
            self.hd_file_size,
            self.bd_file_size,
            self.program_offset,
            self.sample_set_offset,
            self.sample_offset,
            self.vag_info_offset,
        ];
        out.extend(words.iter().flat_map(|w| w.to_le_bytes()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VagInfoItem {
    /// Byte offset of the stream in the body file.
    pub vag_offset: u32,
    pub sample_rate: u32,
    pub looping: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VagInfoChunk {
    pub items: Vec<VagInfoItem>,
}

impl Chunk for VagInfoChunk {
    const TYPE: ChunkType = ChunkType::VagInfo;

    fn parse(record: &[u8]) -> Result<Self> {
        let cursor = &mut &record[CHUNK_HEAD_LEN..];

        // the count is one short of the table that follows
        let count = le_u32(cursor, "vag info count")?;
        let n = (count as usize).wrapping_add(1) & u32::MAX as usize;
        let item_offsets = le_u32s(cursor, n, "vag info offsets")?;

        let items = item_offsets.into_iter()
            .map(|offset| {
                let item = &mut at(record, resolve(0, offset, "vag info item")?, "vag info item")?;
                let vag_offset = le_u32(item, "vag offset")?;
                let sample_rate = le_u16(item, "sample rate")? as u32;
                let [looping]: [u8; 1] = grab(item, "loop flag")?;
                let item = VagInfoItem{vag_offset, sample_rate, looping: looping == 1};
                log::trace!("hd: {item:?}");
                Ok(item)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(VagInfoChunk{items})
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let n = self.items.len();
        out.extend(field(n, "vag info count")?.wrapping_sub(1).to_le_bytes());

        let table_end = CHUNK_HEAD_LEN + 4 + n * 4;
        for i in 0..n {
            let offset = field(table_end + i * VAG_INFO_ITEM_LEN, "vag info item offset")?;
            out.extend(offset.to_le_bytes());
        }

        for item in &self.items {
            let rate = u16::try_from(item.sample_rate)
                .map_err(|_| Error::FieldOverflow{what: "sample rate", value: item.sample_rate as u64})?;
            out.extend(item.vag_offset.to_le_bytes());
            out.extend(rate.to_le_bytes());
            out.push(item.looping as u8);
            out.push(FILL);
        }
        Ok(())
    }
}

/// Drops the `0xff` alignment fill that closes an opaque payload. At most
/// `ALIGN - 1` bytes are dropped, so a payload ending in `0xff` itself loses its tail.
fn strip_fill(payload: &[u8]) -> &[u8] {
    let fill = payload.iter().rev()
        .take(ALIGN - 1)
        .take_while(|&&b| b == FILL)
        .count();
    &payload[..payload.len() - fill]
}

macro_rules! opaque_chunk {
    ($(#[$meta:meta])* $name:ident, $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(pub Vec<u8>);

        impl Chunk for $name {
            const TYPE: ChunkType = ChunkType::$ty;

            fn parse(record: &[u8]) -> Result<Self> {
                Ok($name(strip_fill(&record[CHUNK_HEAD_LEN..]).to_vec()))
            }

            fn write(&self, out: &mut Vec<u8>) -> Result<()> {
                out.extend_from_slice(&self.0);
                Ok(())
            }
        }
    };
}

opaque_chunk!(
    /// Per-sample envelope and pitch settings, passed through untouched.
    SampleChunk, Sample
);
opaque_chunk!(SampleSetChunk, SampleSet);
opaque_chunk!(ProgramChunk, Program);

/// Reads the chunk at `pos`, returning it and the position just past it.
fn read_chunk<C: Chunk>(bytes: &[u8], pos: usize) -> Result<(C, usize)> {
    let cursor = &mut at(bytes, pos, "chunk")?;
    let record_start = *cursor;

    let mut creator: [u8; 4] = grab(cursor, "chunk creator")?;
    creator.reverse();
    if creator != CREATOR {return Err(Error::magic("chunk creator", &CREATOR, &creator))}

    let mut tag: [u8; 4] = grab(cursor, "chunk type")?;
    tag.reverse();
    match ChunkType::from_tag(tag) {
        Some(ty) if ty == C::TYPE => (),
        Some(_) => return Err(Error::magic("chunk type", &C::TYPE.tag(), &tag)),
        None => return Err(Error::UnknownTag {
            what: "chunk type",
            value: format!("{:?}", String::from_utf8_lossy(&tag)),
        }),
    }

    let len = le_u32(cursor, "chunk length")? as usize;
    if len < CHUNK_HEAD_LEN {
        return Err(Error::sizes(format!("{:?} chunk claims {len} bytes", C::TYPE)));
    }
    let record = take(&mut &record_start[..], len, "chunk payload")?;

    log::debug!("hd: {:?} chunk at {pos:#x}, {len} bytes", C::TYPE);
    Ok((C::parse(record)?, pos + len))
}

/// Appends a chunk, padded with `0xff`, and returns where it starts.
fn write_chunk<C: Chunk>(out: &mut Vec<u8>, chunk: &C) -> Result<usize> {
    let start = out.len();

    let mut creator = CREATOR;
    creator.reverse();
    let mut tag = C::TYPE.tag();
    tag.reverse();
    out.extend_from_slice(&creator);
    out.extend_from_slice(&tag);
    out.extend_from_slice(&[0; 4]);

    chunk.write(out)?;

    let len = (out.len() - start).next_multiple_of(ALIGN).max(C::MIN_LEN);
    out.resize(start + len, FILL);
    let len_field = field(len, "chunk length")?;
    out[start + 8 .. start + 12].copy_from_slice(&len_field.to_le_bytes());

    log::debug!("hd: wrote {:?} chunk at {start:#x}, {len} bytes", C::TYPE);
    Ok(start)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBank {
    pub version: VersionChunk,
    pub header: HeaderChunk,
    pub vag_info: VagInfoChunk,
    pub sample: SampleChunk,
    pub sample_set: SampleSetChunk,
    pub program: ProgramChunk,
}

impl AudioBank {
    pub fn decode(hd: &[u8]) -> Result<AudioBank> {
        let (version, header_pos) = read_chunk::<VersionChunk>(hd, 0)?;
        let (header, _) = read_chunk::<HeaderChunk>(hd, header_pos)?;

        let seek = |offset: u32| resolve(0, offset, "chunk offset");
        let (vag_info, _)   = read_chunk::<VagInfoChunk>(hd, seek(header.vag_info_offset)?)?;
        let (sample, _)     = read_chunk::<SampleChunk>(hd, seek(header.sample_offset)?)?;
        let (sample_set, _) = read_chunk::<SampleSetChunk>(hd, seek(header.sample_set_offset)?)?;
        let (program, _)    = read_chunk::<ProgramChunk>(hd, seek(header.program_offset)?)?;

        Ok(AudioBank{version, header, vag_info, sample, sample_set, program})
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_chunk(&mut out, &self.version)?;

        // the header can only be written once everything it points at is placed
        let header_pos = out.len();
        out.resize(header_pos + HEADER_CHUNK_LEN, FILL);

        let vag_info_offset   = field(write_chunk(&mut out, &self.vag_info)?, "vag info offset")?;
        let sample_offset     = field(write_chunk(&mut out, &self.sample)?, "sample offset")?;
        let sample_set_offset = field(write_chunk(&mut out, &self.sample_set)?, "sample set offset")?;
        let program_offset    = field(write_chunk(&mut out, &self.program)?, "program offset")?;

        let header = HeaderChunk {
            hd_file_size: field(out.len(), "hd file size")?,
            bd_file_size: self.header.bd_file_size,
            program_offset,
            sample_set_offset,
            sample_offset,
            vag_info_offset,
        };
        let mut head = Vec::with_capacity(HEADER_CHUNK_LEN);
        write_chunk(&mut head, &header)?;
        out[header_pos .. header_pos + head.len()].copy_from_slice(&head);

        Ok(out)
    }

    /// Slices each stream out of the body file. A stream runs up to the next one's
    /// offset; the last runs to the end of `bd`.
    pub fn audio_streams(&self, bd: &[u8]) -> Result<Vec<Vag>> {
        let items = &self.vag_info.items;
        items.iter()
            .enumerate()
            .map(|(i, item)| {
                let start = item.vag_offset as usize;
                let end = items.get(i + 1).map_or(bd.len(), |next| next.vag_offset as usize);
                if start > bd.len() {
                    return Err(Error::sizes(format!(
                        "stream {i} at {start:#x} is past the {:#x} byte body", bd.len())));
                }
                if end < start || end > bd.len() {
                    return Err(Error::sizes(format!(
                        "stream {i} spans {start:#x}..{end:#x} in a {:#x} byte body", bd.len())));
                }
                Ok(Vag{sample_rate: item.sample_rate, data: bd[start..end].to_vec()})
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at .. at + 4].try_into().unwrap())
    }

    fn item(vag_offset: u32, sample_rate: u32, looping: bool) -> VagInfoItem {
        VagInfoItem{vag_offset, sample_rate, looping}
    }

    fn sample() -> AudioBank {
        AudioBank {
            version: VersionChunk{reserved: [0; 2], major: 3, minor: 1},
            header: HeaderChunk{bd_file_size: 0x60, ..Default::default()},
            vag_info: VagInfoChunk {
                items: vec![item(0, 22050, false), item(0x20, 44100, true), item(0x40, 8000, false)],
            },
            sample: SampleChunk(vec![0x5a; 20]),
            sample_set: SampleSetChunk(vec![1, 2, 3, 4]),
            program: ProgramChunk(vec![0x77; 36]),
        }
    }

    #[test]
    fn chunk_layout() {
        let hd = sample().encode().unwrap();

        assert_eq!(&hd[0..12], b"IECSsreV\x10\x00\x00\x00");
        assert_eq!(&hd[12..16], &[0, 0, 3, 1]);

        assert_eq!(&hd[16..28], b"IECSdaeH\x40\x00\x00\x00");
        assert_eq!(le(&hd, 28), hd.len() as u32);
        assert_eq!(le(&hd, 32), 0x60);
        assert!(hd[52..80].iter().all(|&b| b == 0xff));

        // three items: 12 + 4 + 12 + 24 = 52, padded to 64
        let vagi = le(&hd, 48) as usize;
        assert_eq!(vagi, 80);
        assert_eq!(&hd[vagi .. vagi + 12], b"IECSigaV\x40\x00\x00\x00");
        assert_eq!(le(&hd, vagi + 12), 2);
        assert_eq!([le(&hd, vagi + 16), le(&hd, vagi + 20), le(&hd, vagi + 24)], [28, 36, 44]);
        assert_eq!(&hd[vagi + 36 .. vagi + 44], &[0x20, 0, 0, 0, 0x44, 0xac, 1, 0xff]);
        assert!(hd[vagi + 52 .. vagi + 64].iter().all(|&b| b == 0xff));

        // 12 + 20 = 32, no fill
        let smpl = le(&hd, 44) as usize;
        assert_eq!(smpl, vagi + 64);
        assert_eq!(le(&hd, smpl + 8), 32);

        // 12 + 4 = 16, no fill
        let sset = le(&hd, 40) as usize;
        assert_eq!(sset, smpl + 32);
        assert_eq!(le(&hd, sset + 8), 16);

        // 12 + 36 = 48, no fill
        let prog = le(&hd, 36) as usize;
        assert_eq!(prog, sset + 16);
        assert_eq!(le(&hd, prog + 8), 48);
        assert_eq!(prog + 48, hd.len());
    }

    #[test]
    fn round_trips() {
        let bank = sample();
        let hd = bank.encode().unwrap();
        let decoded = AudioBank::decode(&hd).unwrap();

        assert_eq!(decoded.version, bank.version);
        assert_eq!(decoded.vag_info, bank.vag_info);
        assert_eq!(decoded.sample, bank.sample);
        assert_eq!(decoded.sample_set, bank.sample_set);
        assert_eq!(decoded.program, bank.program);
        assert_eq!(decoded.header.bd_file_size, 0x60);
        assert_eq!(decoded.header.hd_file_size as usize, hd.len());

        assert_eq!(decoded.encode().unwrap(), hd);
    }

    #[test]
    fn opaque_payloads_shed_their_fill() {
        let bank = AudioBank{
            program: ProgramChunk(vec![1, 2, 3]),
            sample: SampleChunk(vec![9; 5]),
            ..sample()
        };
        let hd = bank.encode().unwrap();
        let decoded = AudioBank::decode(&hd).unwrap();
        assert_eq!(decoded.program, bank.program);
        assert_eq!(decoded.sample, bank.sample);
        assert_eq!(decoded.encode().unwrap(), hd);
    }

    #[test]
    fn strip_fill_stays_inside_one_pad() {
        assert_eq!(strip_fill(&[1, 0xff, 0xff]), [1]);
        assert_eq!(strip_fill(&[0xff; 20]), [0xff; 5]);
        assert_eq!(strip_fill(&[]), [0u8; 0]);
    }

    #[test]
    fn vag_info_count_is_one_short() {
        for n in [0, 1, 5] {
            let items = (0..n).map(|i| item(i * 0x10, 11025, i % 2 == 0)).collect::<Vec<_>>();
            let bank = AudioBank{vag_info: VagInfoChunk{items: items.clone()}, ..sample()};
            let hd = bank.encode().unwrap();
            let vagi = le(&hd, 48) as usize;
            assert_eq!(le(&hd, vagi + 12), n.wrapping_sub(1));
            assert_eq!(AudioBank::decode(&hd).unwrap().vag_info.items, items);
        }
    }

    #[test]
    fn header_is_always_64_bytes() {
        let hd = AudioBank::default().encode().unwrap();
        assert_eq!(le(&hd, 16 + 8), 64);
        assert_eq!(le(&hd, 48), 80);
    }

    #[test]
    fn streams_slice_the_body() {
        let bank = sample();
        let mut bd = vec![0u8; 0x50];
        bd[0x20] = 0xaa;
        bd[0x40] = 0xbb;

        let streams = bank.audio_streams(&bd).unwrap();
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].data.len(), 0x20);
        assert_eq!(streams[0].sample_rate, 22050);
        assert_eq!(streams[1].data[0], 0xaa);
        assert_eq!(streams[1].sample_rate, 44100);

        // the last stream takes everything left, padding included
        assert_eq!(streams[2].data.len(), 0x10);
        assert_eq!(streams[2].data[0], 0xbb);
    }

    #[test]
    fn streams_past_the_body_are_rejected() {
        let bank = sample();
        assert!(matches!(bank.audio_streams(&[0; 0x30]), Err(Error::InconsistentSizeFields(_))));

        let mut bank = sample();
        bank.vag_info.items.swap(0, 1);
        assert!(matches!(bank.audio_streams(&[0; 0x50]), Err(Error::InconsistentSizeFields(_))));
    }

    #[test]
    fn bad_tags_are_rejected() {
        let hd = sample().encode().unwrap();

        let mut bad = hd.clone();
        bad[0] = b'X';
        assert!(matches!(AudioBank::decode(&bad), Err(Error::MagicMismatch{what: "chunk creator", ..})));

        // a header where the version should be
        let mut bad = hd.clone();
        bad[4..8].copy_from_slice(b"daeH");
        assert!(matches!(AudioBank::decode(&bad), Err(Error::MagicMismatch{what: "chunk type", ..})));

        let mut bad = hd.clone();
        bad[4..8].copy_from_slice(b"xxxx");
        assert!(matches!(AudioBank::decode(&bad), Err(Error::UnknownTag{what: "chunk type", ..})));
    }

    #[test]
    fn truncation_is_reported() {
        assert!(matches!(AudioBank::decode(b"IE"), Err(Error::TruncatedInput{what: "chunk creator", ..})));

        let hd = sample().encode().unwrap();
        assert!(matches!(AudioBank::decode(&hd[..hd.len() - 1]), Err(Error::TruncatedInput{..})));

        // header pointing past the end of the file
        let mut bad = hd.clone();
        bad[40..44].copy_from_slice(&0x1000u32.to_le_bytes());
        assert!(matches!(AudioBank::decode(&bad), Err(Error::TruncatedInput{what: "chunk", ..})));
    }

    #[test]
    fn oversized_sample_rates_are_rejected() {
        let bank = AudioBank {
            vag_info: VagInfoChunk{items: vec![item(0, 96_000, false)]},
            ..sample()
        };
        assert!(matches!(bank.encode(), Err(Error::FieldOverflow{what: "sample rate", ..})));
    }

    #[test]
    fn chunk_types_map_from_tags() {
        for ty in ChunkType::ALL {
            assert_eq!(ChunkType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(ChunkType::from_tag(*b"Sqnc"), None);
    }
}
