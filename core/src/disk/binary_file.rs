use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::{create_dir_all, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Append-only file that records the offset of every record it writes.
pub struct BinaryWriter {
    writer: BufWriter<File>,
    offset: u64,
    offsets: Vec<u64>,
}

impl BinaryWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file), offset: 0, offsets: Vec::new() })
    }

    /// Append one record and return the offset it starts at.
    pub fn write(&mut self, data: &[u8]) -> Result<u64> {
        let start = self.offset;
        self.writer.write_all(data)?;
        self.offsets.push(start);
        self.offset += data.len() as u64;
        Ok(start)
    }

    pub fn offset(&self) -> u64 { self.offset }

    /// Flush to disk and hand back the start offsets of all records.
    pub fn finish(mut self) -> Result<Vec<u64>> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.offsets)
    }
}

/// Buffered reader with positioned little-endian reads.
///
/// Reading past the end of the file is reported as [`Error::Corrupt`]: every
/// offset handed to it comes from another index file.
pub struct BinaryReader {
    name: String,
    reader: BufReader<File>,
    size: u64,
}

impl BinaryReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::InvalidIndex(format!("missing index file {}", path.display())),
            _ => Error::Io(e),
        })?;
        let size = file.metadata()?.len();
        Ok(Self { name: file_name(path), reader: BufReader::new(file), size })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn size(&self) -> u64 { self.size }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.size {
            return Err(Error::corrupt(&self.name, format!("offset {offset} past end of file ({})", self.size)));
        }
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Move forward `count` bytes without reading them.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let position = self.reader.stream_position()?;
        match position.checked_add(count) {
            Some(end) if end <= self.size => {
                self.reader.seek_relative(count as i64)?;
                Ok(())
            }
            _ => Err(Error::corrupt(&self.name, "unexpected end of file")),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.reader.read_u32::<LittleEndian>().map_err(|e| self.fail(e))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.reader.read_u64::<LittleEndian>().map_err(|e| self.fail(e))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.reader.read_f64::<LittleEndian>().map_err(|e| self.fail(e))
    }

    pub fn read_exact_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.size => {}
            _ => {
                return Err(Error::corrupt(
                    &self.name,
                    format!("span {offset}+{len} past end of file ({})", self.size),
                ))
            }
        }
        self.seek(offset)?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|e| self.fail(e))?;
        Ok(buf)
    }

    pub fn read_to_end_at(&mut self, offset: u64) -> Result<Vec<u8>> {
        self.seek(offset)?;
        let mut buf = Vec::with_capacity((self.size - offset) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn fail(&self, e: io::Error) -> Error {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::corrupt(&self.name, "unexpected end of file")
        } else {
            Error::Io(e)
        }
    }
}
