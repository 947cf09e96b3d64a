//! Streaming PNG chunk reader and writer
//!
//! A PNG file is the 8-byte signature followed by chunks of
//! `{length: u32 BE, type: [u8; 4], data, crc: u32 BE}`. The reader yields
//! one chunk at a time; the writer frames new chunks (length and CRC over
//! type + data) and copies existing chunks byte for byte, CRC included.

use std::io::{self, ErrorKind, Read, Write};

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Header chunk type, always first
pub const IHDR: [u8; 4] = *b"IHDR";

/// Text metadata chunk type
pub const TEXT: [u8; 4] = *b"tEXt";

/// Terminator chunk type
pub const IEND: [u8; 4] = *b"IEND";

/// Largest chunk length the format allows (2^31 - 1)
pub const MAX_CHUNK_LEN: u32 = 0x7fff_ffff;

/// One chunk as read from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
    /// Checksum exactly as stored; never recomputed
    pub crc: u32,
}

impl Chunk {
    /// Chunk type as text (e.g. "IHDR")
    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Reads chunks from a PNG byte stream
pub struct ChunkReader<R> {
    inner: R,
}

impl<R: Read> ChunkReader<R> {
    /// Consume and validate the signature
    ///
    /// Returns `InvalidData` if the stream is not a PNG.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let mut signature = [0u8; 8];
        inner.read_exact(&mut signature)?;
        if signature != PNG_SIGNATURE {
            return Err(io::Error::new(ErrorKind::InvalidData, "missing PNG signature"));
        }
        Ok(Self { inner })
    }

    /// Read the next chunk, or `None` at a clean end of stream
    ///
    /// A stream that ends partway through a chunk is `UnexpectedEof`.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        let mut length = [0u8; 4];
        if !read_exact_or_eof(&mut self.inner, &mut length)? {
            return Ok(None);
        }
        let length = u32::from_be_bytes(length);
        if length > MAX_CHUNK_LEN {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("chunk length {} exceeds limit", length),
            ));
        }

        let mut kind = [0u8; 4];
        self.inner.read_exact(&mut kind)?;

        let mut data = Vec::new();
        (&mut self.inner).take(u64::from(length)).read_to_end(&mut data)?;
        if data.len() != length as usize {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated chunk data"));
        }

        let mut crc = [0u8; 4];
        self.inner.read_exact(&mut crc)?;

        Ok(Some(Chunk {
            kind,
            data,
            crc: u32::from_be_bytes(crc),
        }))
    }
}

/// Fill `buf`, returning false if the stream was already at EOF
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated chunk header")),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Writes chunks to a PNG byte stream
pub struct ChunkWriter<W> {
    inner: W,
}

impl<W: Write> ChunkWriter<W> {
    /// Write the signature
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(&PNG_SIGNATURE)?;
        Ok(Self { inner })
    }

    /// Frame and write a new chunk, computing its CRC
    pub fn write_chunk(&mut self, kind: [u8; 4], data: &[u8]) -> io::Result<()> {
        let length = u32::try_from(data.len())
            .ok()
            .filter(|len| *len <= MAX_CHUNK_LEN)
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "chunk payload too large"))?;

        self.inner.write_all(&length.to_be_bytes())?;
        self.inner.write_all(&kind)?;
        self.inner.write_all(data)?;
        self.inner.write_all(&chunk_crc(&kind, data).to_be_bytes())
    }

    /// Copy an existing chunk unchanged, keeping its stored CRC
    pub fn copy_chunk(&mut self, chunk: &Chunk) -> io::Result<()> {
        self.inner.write_all(&(chunk.data.len() as u32).to_be_bytes())?;
        self.inner.write_all(&chunk.kind)?;
        self.inner.write_all(&chunk.data)?;
        self.inner.write_all(&chunk.crc.to_be_bytes())
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// CRC of a chunk as the format defines it (over type + data)
pub fn chunk_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn two_chunk_png() -> Vec<u8> {
        let mut writer = ChunkWriter::new(Vec::new()).unwrap();
        writer.write_chunk(IHDR, &[0u8; 13]).unwrap();
        writer.write_chunk(IEND, &[]).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_reader_yields_chunks_in_order() {
        let bytes = two_chunk_png();
        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();

        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(first.kind_str(), "IHDR");
        assert_eq!(first.data.len(), 13);
        assert_eq!(first.crc, chunk_crc(&IHDR, &[0u8; 13]));

        let second = reader.next_chunk().unwrap().unwrap();
        assert_eq!(second.kind, IEND);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_iend_crc_matches_known_value() {
        // IEND with empty payload always carries AE 42 60 82
        assert_eq!(chunk_crc(&IEND, &[]), 0xAE42_6082);
    }

    #[test]
    fn test_written_chunk_carries_computed_crc() {
        let mut writer = ChunkWriter::new(Vec::new()).unwrap();
        writer.write_chunk(IEND, &[]).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(&bytes[bytes.len() - 4..], &[0xAE, 0x42, 0x60, 0x82]);

        let mut writer = ChunkWriter::new(Vec::new()).unwrap();
        writer.write_chunk(TEXT, b"chara\0e30=").unwrap();
        let bytes = writer.finish().unwrap();
        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();
        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.crc, chunk_crc(&TEXT, b"chara\0e30="));
    }

    #[test]
    fn test_rejects_missing_signature() {
        let result = ChunkReader::new(Cursor::new(b"GIF89a..".to_vec()));
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::InvalidData));
    }

    #[test]
    fn test_truncated_chunk_is_error() {
        let mut bytes = two_chunk_png();
        bytes.truncate(PNG_SIGNATURE.len() + 10);
        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();

        let err = reader.next_chunk().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_copy_preserves_bad_crc() {
        let chunk = Chunk {
            kind: *b"zzZz",
            data: vec![1, 2, 3],
            crc: 0xDEAD_BEEF,
        };
        let mut writer = ChunkWriter::new(Vec::new()).unwrap();
        writer.copy_chunk(&chunk).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.next_chunk().unwrap().unwrap(), chunk);
    }
}
