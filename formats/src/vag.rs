//! Standalone `.VAG` samples: a 48-byte big-endian header and an ADPCM block stream.

use {
    crate::{Error, Result, be::Be32, grab::{field, grab, take}},
    bytemuck::{Pod, Zeroable},
};

pub const MAGIC: [u8; 8] = *b"VAGp\0\0\0\x04";
pub const HEADER_LEN: usize = std::mem::size_of::<RawHeader>();

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    magic: [u8; 8],
    _reserved0: [u8; 4],
    content_len: Be32,
    sample_rate: Be32,
    _reserved1: [u8; 28],
}

/// One mono ADPCM stream and the rate it plays back at.
#[derive(Clone, PartialEq, Eq)]
pub struct Vag {
    pub sample_rate: u32,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Vag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vag")
            .field("sample_rate", &self.sample_rate)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Vag {
    pub fn parse(bytes: &[u8]) -> Result<Vag> {
        let cursor = &mut &bytes[..];
        let header: RawHeader = grab(cursor, "vag header")?;
        if header.magic != MAGIC {return Err(Error::magic("vag magic", &MAGIC, &header.magic))}

        let content_len = header.content_len.get() as usize;
        let data = take(cursor, content_len, "vag data")?.to_vec();
        Ok(Vag{sample_rate: header.sample_rate.get(), data})
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = RawHeader {
            magic: MAGIC,
            _reserved0: [0; 4],
            content_len: field(self.data.len(), "vag content length")?.into(),
            sample_rate: self.sample_rate.into(),
            _reserved1: [0; 28],
        };

        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len());
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(&self.data);
        Ok(out)
    }

    pub fn samples(&self) -> spu_adpcm::Decoder<'_> {
        spu_adpcm::decode(&self.data)
    }

    pub fn write_wav<W: std::io::Write>(&self, out: W) -> std::io::Result<()> {
        let pcm = self.samples().collect::<Vec<_>>();
        spu_adpcm::wav::write_mono16(out, self.sample_rate, &pcm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vag() -> Vag {
        let mut data = vec![0x00, 0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
                            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd];
        data.extend_from_slice(&[0x00, 0x07, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77,
                                 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77]);
        Vag{sample_rate: 22_050, data}
    }

    #[test]
    fn header_layout() {
        let bytes = vag().to_bytes().unwrap();
        assert_eq!(HEADER_LEN, 48);
        assert_eq!(&bytes[0..8], b"VAGp\0\0\0\x04");
        assert_eq!(&bytes[8..12], &[0; 4]);
        assert_eq!(&bytes[12..16], &32u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &22_050u32.to_be_bytes());
        assert!(bytes[20..48].iter().all(|&b| b == 0));
        assert_eq!(Vag::parse(&bytes).unwrap(), vag());
    }

    #[test]
    fn trailing_bytes_past_content_are_ignored() {
        let mut bytes = vag().to_bytes().unwrap();
        bytes.extend_from_slice(&[0xff; 16]);
        assert_eq!(Vag::parse(&bytes).unwrap(), vag());
    }

    #[test]
    fn short_content_is_truncation() {
        let bytes = vag().to_bytes().unwrap();
        assert!(matches!(
            Vag::parse(&bytes[..bytes.len() - 1]),
            Err(Error::TruncatedInput{what: "vag data", needed: 32, available: 31})
        ));
        assert!(matches!(Vag::parse(&bytes[..20]), Err(Error::TruncatedInput{what: "vag header", ..})));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = vag().to_bytes().unwrap();
        bytes[7] = 0x03;
        assert!(matches!(Vag::parse(&bytes), Err(Error::MagicMismatch{what: "vag magic", ..})));
    }

    #[test]
    fn decodes_until_the_end_flag() {
        let vag = vag();
        assert_eq!(vag.samples().count(), spu_adpcm::SAMPLES_PER_BLOCK);

        let mut wav = Vec::new();
        vag.write_wav(&mut wav).unwrap();
        assert_eq!(wav.len(), 44 + 2 * spu_adpcm::SAMPLES_PER_BLOCK);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 22_050);
    }

    #[test]
    fn huge_rate_fails_wav_output() {
        let vag = Vag{sample_rate: 0x8000_0000, data: vec![0; 16]};
        let vag = Vag::parse(&vag.to_bytes().unwrap()).unwrap();
        assert_eq!(vag.sample_rate, 0x8000_0000);
        let err = vag.write_wav(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
