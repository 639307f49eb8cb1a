//! `.INT` resource archives.
//!
//! An archive is a run of chunks, each holding the files for one resource type,
//! closed off by a chunk of type [`ResourceType::End`]. A chunk looks like:
//!
//! ```text
//! +0x00  magic 11 22 33 44
//! +0x04  file count (n)
//! +0x08  resource type
//! +0x0c  info offset, from chunk start
//! +0x10  data offset, from the info table
//! +0x14  data size, including the two size words below
//! +0x18  8 zero bytes
//! +0x20  n + 1 file offsets into the uncompressed blob; the last marks its end
//! info   n × (name offset, file length)
//!        NUL-terminated names
//! data   uncompressed size, compressed size, compressed blob
//! ```
//!
//! All fields are little-endian u32s.

use {
    crate::{
        Error, Result,
        compression::Compression,
        grab::{at, field, grab, le_u32, le_u32s, resolve, take},
    },
};

pub const MAGIC: [u8; 4] = [0x11, 0x22, 0x33, 0x44];
const HEADER_LEN: usize = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResourceType {
    End       = 0,
    Textures  = 1,
    Sounds    = 2,
    Stage     = 3,
    RedHat    = 4,
    BlueHat   = 5,
    PinkHat   = 6,
    YellowHat = 7,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = {
        use ResourceType::*;
        [End, Textures, Sounds, Stage, RedHat, BlueHat, PinkHat, YellowHat]
    };

    pub fn name(self) -> &'static str {
        use ResourceType::*;
        match self {
            End       => "end",
            Textures  => "textures",
            Sounds    => "sounds",
            Stage     => "stage",
            RedHat    => "red_hat",
            BlueHat   => "blue_hat",
            PinkHat   => "pink_hat",
            YellowHat => "yellow_hat",
        }
    }
}

impl TryFrom<u32> for ResourceType {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        ResourceType::ALL.get(raw as usize)
            .copied()
            .ok_or_else(|| Error::UnknownTag{what: "resource type", value: raw.to_string()})
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct IntFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl std::fmt::Debug for IntFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntFile")
            .field("name", &self.name)
            .field("len", &self.contents.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntChunk {
    pub resource_type: ResourceType,
    pub files: Vec<IntFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntContainer {
    pub chunks: Vec<IntChunk>,
}

impl IntContainer {
    pub fn files(&self) -> impl Iterator<Item = (ResourceType, &IntFile)> {
        self.chunks.iter()
            .flat_map(|chunk| chunk.files.iter().map(|file| (chunk.resource_type, file)))
    }
}

/// Reads and writes archives, delegating the data blobs to a [`Compression`].
#[derive(Debug, Clone, Default)]
pub struct IntCodec<C> {
    compression: C,
}

impl<C: Compression> IntCodec<C> {
    pub fn new(compression: C) -> Self {
        IntCodec{compression}
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<IntContainer> {
        let mut chunks = Vec::new();
        let mut chunk_start = 0;
        while let Some((chunk, next)) = self.decode_chunk(bytes, chunk_start)? {
            log::debug!("int: {} chunk at {chunk_start:#x}, {} files",
                chunk.resource_type, chunk.files.len());
            chunks.push(chunk);
            chunk_start = next;
        }
        log::debug!("int: end chunk at {chunk_start:#x}");
        Ok(IntContainer{chunks})
    }

    /// Decodes the chunk at `chunk_start`, returning it and where the next one
    /// starts, or `None` for the end chunk.
    fn decode_chunk(&self, bytes: &[u8], chunk_start: usize) -> Result<Option<(IntChunk, usize)>> {
        let cursor = &mut at(bytes, chunk_start, "chunk")?;

        let magic: [u8; 4] = grab(cursor, "chunk magic")?;
        if magic != MAGIC {return Err(Error::magic("chunk magic", &MAGIC, &magic))}

        let file_count = le_u32(cursor, "file count")? as usize;
        let resource_type = ResourceType::try_from(le_u32(cursor, "resource type")?)?;
        if resource_type == ResourceType::End {return Ok(None)}

        let info_offset = le_u32(cursor, "info offset")?;
        let data_offset = le_u32(cursor, "data offset")?;
        let data_size = le_u32(cursor, "data size")? as usize;

        let pad: [u8; 8] = grab(cursor, "chunk padding")?;
        if pad != [0; 8] {return Err(Error::magic("chunk padding", &[0; 8], &pad))}

        let n_offsets = file_count.checked_add(1)
            .ok_or_else(|| Error::sizes(format!("file count {file_count}")))?;
        let file_offsets = le_u32s(cursor, n_offsets, "file offsets")?;

        // data offset counts from the info table, not the chunk
        let info_start = resolve(chunk_start, info_offset, "info offset")?;
        let data_start = resolve(info_start, data_offset, "data offset")?;

        let cursor = &mut at(bytes, info_start, "file info")?;
        let info = le_u32s(cursor, file_count.saturating_mul(2), "file info")?;
        let names_start = bytes.len() - cursor.len();
        let names_len = data_start.checked_sub(names_start)
            .ok_or_else(|| Error::sizes(format!(
                "data at {data_start:#x} starts inside the info table ending {names_start:#x}")))?;
        let names = take(cursor, names_len, "file names")?;
        let names = split_names(names, file_count)?;

        let uncompressed_size = le_u32(cursor, "uncompressed size")?;
        let compressed_size = le_u32(cursor, "compressed size")?;
        let payload_len = data_size.checked_sub(8)
            .ok_or_else(|| Error::sizes(format!("data size {data_size} is below 8")))?;
        let payload = take(cursor, payload_len, "compressed data")?;
        let next = bytes.len() - cursor.len();

        let blob = self.compression.decompress(payload, compressed_size, uncompressed_size)?;

        let files = names.into_iter()
            .enumerate()
            .map(|(i, (name, name_offset))| {
                let start = file_offsets[i] as usize;
                let end = file_offsets[i + 1] as usize;
                if start > end || end > blob.len() {
                    return Err(Error::sizes(format!(
                        "{name}: span {start:#x}..{end:#x} outside a {:#x} byte blob", blob.len())));
                }

                let [name_at, len] = [info[i * 2], info[i * 2 + 1]];
                if len as usize != end - start {
                    log::warn!("int: {name}: info table says {len} bytes, offsets say {}", end - start);
                }
                if name_at as usize != name_offset {
                    log::warn!("int: {name}: info table puts name at {name_at:#x}, found at {name_offset:#x}");
                }
                log::trace!("int: {name}: {:#x}..{end:#x}", start);

                let contents = blob[start..end].to_vec();
                Ok(IntFile{name, contents})
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((IntChunk{resource_type, files}, next)))
    }

    pub fn encode(&self, container: &IntContainer) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in &container.chunks {
            self.encode_chunk(chunk, &mut out)?;
        }

        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&[0; HEADER_LEN - MAGIC.len()]);
        Ok(out)
    }

    fn encode_chunk(&self, chunk: &IntChunk, out: &mut Vec<u8>) -> Result<()> {
        if chunk.resource_type == ResourceType::End {return Err(Error::MisplacedEnd)}

        let n = chunk.files.len();

        let mut file_offsets = Vec::with_capacity(n + 1);
        let mut blob = Vec::new();
        for file in &chunk.files {
            file_offsets.push(field(blob.len(), "file offset")?);
            blob.extend_from_slice(&file.contents);
        }
        file_offsets.push(field(blob.len(), "file offset")?);

        let mut info = Vec::with_capacity(n * 8);
        let mut names = Vec::new();
        for file in &chunk.files {
            check_name(&file.name)?;
            info.extend(field(names.len(), "name offset")?.to_le_bytes());
            info.extend(field(file.contents.len(), "file length")?.to_le_bytes());
            names.extend_from_slice(file.name.as_bytes());
            names.push(0);
        }

        let compressed = self.compression.compress(&blob)?;

        let info_offset = field(HEADER_LEN + file_offsets.len() * 4, "info offset")?;
        let data_offset = field(info.len() + names.len(), "data offset")?;
        let data_size = field(compressed.len() + 8, "data size")?;

        log::debug!("int: packing {} chunk, {n} files, {} -> {} bytes",
            chunk.resource_type, blob.len(), compressed.len());

        let words = [
            field(n, "file count")?,
            chunk.resource_type as u32,
            info_offset,
            data_offset,
            data_size,
        ];

        out.extend_from_slice(&MAGIC);
        out.extend(words.iter().flat_map(|w| w.to_le_bytes()));
        out.extend_from_slice(&[0; 8]);
        out.extend(file_offsets.iter().flat_map(|w| w.to_le_bytes()));
        out.extend_from_slice(&info);
        out.extend_from_slice(&names);
        out.extend(field(blob.len(), "uncompressed size")?.to_le_bytes());
        out.extend(data_size.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(())
    }
}

/// Splits the name blob into `count` names, pairing each with its offset in the blob.
fn split_names(blob: &[u8], count: usize) -> Result<Vec<(String, usize)>> {
    let used = blob.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    if used == 0 && count == 0 {return Ok(Vec::new())}

    let mut names = Vec::with_capacity(count.min(used));
    let mut offset = 0;
    for raw in blob[..used].split(|&b| b == 0) {
        let name = std::str::from_utf8(raw).ok()
            .filter(|name| name.is_ascii())
            .ok_or_else(|| Error::InvalidName(String::from_utf8_lossy(raw).into_owned()))?;
        names.push((name.to_owned(), offset));
        offset += raw.len() + 1;
    }

    if names.len() != count {
        return Err(Error::sizes(format!("{} names for {count} files", names.len())));
    }
    Ok(names)
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.is_ascii() || name.contains('\0') {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}
