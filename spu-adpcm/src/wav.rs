use std::io::{self, Write};

fn too_big(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("{what} does not fit a wav header"))
}

/// Writes a RIFF/WAVE file holding one channel of 16-bit PCM.
pub fn write_mono16<W: Write>(mut out: W, rate: u32, samples: &[i16]) -> io::Result<()> {
    let pcm = samples.iter()
        .flat_map(|s| s.to_le_bytes())
        .collect::<Vec<u8>>();

    let byte_rate = rate.checked_mul(2).ok_or_else(|| too_big("sample rate"))?;
    let pcm_len = u32::try_from(pcm.len()).map_err(|_| too_big("sample data"))?;

    let fmt_chunk = [
        u32::from_le_bytes(*b"fmt "),
        16,
        0x0001_0001, // pcm, mono
        rate,
        byte_rate,
        0x0010_0002, // 2-byte frames, 16 bits
    ].map(u32::to_le);

    let data_head = [
        u32::from_le_bytes(*b"data"),
        pcm_len,
    ].map(u32::to_le);

    let contents_len = (4 + std::mem::size_of_val(&fmt_chunk) + std::mem::size_of_val(&data_head)) as u32;
    let contents_len = contents_len.checked_add(pcm_len).ok_or_else(|| too_big("sample data"))?;

    let riff_head = [
        u32::from_le_bytes(*b"RIFF"),
        contents_len,
        u32::from_le_bytes(*b"WAVE"),
    ].map(u32::to_le);

    out.write_all(bytemuck::bytes_of(&riff_head))?;
    out.write_all(bytemuck::bytes_of(&fmt_chunk))?;
    out.write_all(bytemuck::bytes_of(&data_head))?;
    out.write_all(&pcm[..])?;
    Ok(())
}

#[cfg(test)]
#[test]
fn rejects_unrepresentable_rate() {
    let mut wav = Vec::new();
    let err = write_mono16(&mut wav, 0x8000_0000, &[0; 28]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(wav.is_empty());
}

#[cfg(test)]
#[test]
fn writes_canonical_header() {
    let mut wav = Vec::new();
    write_mono16(&mut wav, 22_050, &[1, -1, 0x1234]).unwrap();

    assert_eq!(wav.len(), 44 + 6);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36 + 6);
    assert_eq!(&wav[8..16], b"WAVEfmt ");
    assert_eq!(u16::from_le_bytes([wav[20], wav[21]]), 1);
    assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
    assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 22_050);
    assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 44_100);
    assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
    assert_eq!(&wav[36..40], b"data");
    assert_eq!(&wav[44..], &[0x01, 0x00, 0xff, 0xff, 0x34, 0x12]);
}
