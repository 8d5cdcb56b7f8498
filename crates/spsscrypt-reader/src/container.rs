//! Container header
//!
//! ```text
//! 0        8          17    20         36
//! +--------+----------+-----+----------+------------------------------+
//! |preamble|ENCRYPTED | tag | (filler) | AES-256-ECB ciphertext ...   |
//! +--------+----------+-----+----------+------------------------------+
//! ```
//!
//! The tag is `SAV`, `SPV`, or `SPS`. Ciphertext is PKCS#7 padded, so a
//! valid container holds at least two blocks after the header.

use std::io::Read;

use spsscrypt_core::FileType;
use spsscrypt_crypto::BLOCK_SIZE;

use crate::error::OpenError;
use crate::stream::RING_SIZE;

pub const HEADER_SIZE: usize = 36;
pub const MAGIC_OFFSET: usize = 8;
pub const CONTAINER_MAGIC: &[u8; 9] = b"ENCRYPTED";
const TAG_OFFSET: usize = MAGIC_OFFSET + CONTAINER_MAGIC.len();

/// Shortest file accepted: header plus two cipher blocks.
pub const MIN_FILE_LEN: usize = HEADER_SIZE + 2 * BLOCK_SIZE;

/// The 36-byte header of an encrypted container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    raw: [u8; HEADER_SIZE],
}

impl ContainerHeader {
    /// The eight bytes before the magic. Their meaning is unknown.
    pub fn preamble(&self) -> &[u8] {
        &self.raw[..MAGIC_OFFSET]
    }

    pub fn type_tag(&self) -> &[u8] {
        &self.raw[TAG_OFFSET..TAG_OFFSET + 3]
    }

    /// Payload kind from the tag, `None` for tags other than SAV/SPV/SPS.
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_tag(self.type_tag())
    }
}

/// Read the header and as much leading ciphertext as fits in the ring.
///
/// Returns the header and the number of ciphertext bytes placed in `ring`.
/// A file with the wrong magic is reported as not encrypted as soon as the
/// magic bytes are present, even when it is shorter than [`MIN_FILE_LEN`].
pub(crate) fn read_header<R: Read>(
    input: &mut R,
    ring: &mut [u8; RING_SIZE],
) -> Result<(ContainerHeader, usize), OpenError> {
    let mut data = Vec::with_capacity(HEADER_SIZE + RING_SIZE);
    input
        .by_ref()
        .take((HEADER_SIZE + RING_SIZE) as u64)
        .read_to_end(&mut data)?;

    if data.len() >= TAG_OFFSET && &data[MAGIC_OFFSET..TAG_OFFSET] != CONTAINER_MAGIC {
        return Err(OpenError::NotEncrypted);
    }
    if data.len() < MIN_FILE_LEN {
        return Err(OpenError::ShortFile { len: data.len() });
    }

    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(&data[..HEADER_SIZE]);

    let ciphertext = &data[HEADER_SIZE..];
    ring[..ciphertext.len()].copy_from_slice(ciphertext);
    Ok((ContainerHeader { raw }, ciphertext.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(tag: &[u8; 3]) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[..MAGIC_OFFSET].copy_from_slice(b"\x01\x02\x03\x04\x05\x06\x07\x08");
        h[MAGIC_OFFSET..TAG_OFFSET].copy_from_slice(CONTAINER_MAGIC);
        h[TAG_OFFSET..TAG_OFFSET + 3].copy_from_slice(tag);
        h
    }

    #[test]
    fn test_reads_header_and_ciphertext() {
        let mut file = header(b"SPV");
        file.extend_from_slice(&[0xAB; 48]);

        let mut ring = [0u8; RING_SIZE];
        let (hdr, fill) = read_header(&mut Cursor::new(file), &mut ring).unwrap();
        assert_eq!(fill, 48);
        assert_eq!(hdr.file_type(), Some(FileType::Viewer));
        assert_eq!(hdr.preamble(), b"\x01\x02\x03\x04\x05\x06\x07\x08");
        assert!(ring[..48].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_ring_limits_first_read() {
        let mut file = header(b"SAV");
        file.extend_from_slice(&vec![7u8; 1000]);

        let mut input = Cursor::new(file);
        let mut ring = [0u8; RING_SIZE];
        let (_, fill) = read_header(&mut input, &mut ring).unwrap();
        assert_eq!(fill, RING_SIZE);
        assert_eq!(input.position() as usize, HEADER_SIZE + RING_SIZE);
    }

    #[test]
    fn test_unknown_tag_is_still_encrypted() {
        let mut file = header(b"XYZ");
        file.extend_from_slice(&[0; 32]);
        let mut ring = [0u8; RING_SIZE];
        let (hdr, _) = read_header(&mut Cursor::new(file), &mut ring).unwrap();
        assert_eq!(hdr.file_type(), None);
        assert_eq!(hdr.type_tag(), b"XYZ");
    }

    #[test]
    fn test_wrong_magic() {
        let mut file = vec![b'x'; 200];
        file[MAGIC_OFFSET..TAG_OFFSET].copy_from_slice(b"encrypted");
        let mut ring = [0u8; RING_SIZE];
        let err = read_header(&mut Cursor::new(file), &mut ring).unwrap_err();
        assert!(matches!(err, OpenError::NotEncrypted));
    }

    #[test]
    fn test_short_file() {
        let mut file = header(b"SAV");
        file.extend_from_slice(&[0; 31]);
        let mut ring = [0u8; RING_SIZE];
        let err = read_header(&mut Cursor::new(file), &mut ring).unwrap_err();
        assert!(matches!(err, OpenError::ShortFile { len: 67 }), "got {err:?}");
    }

    #[test]
    fn test_forty_byte_file_is_short() {
        let mut file = header(b"SAV");
        file.extend_from_slice(&[0; 4]);
        assert_eq!(file.len(), 40);

        let mut ring = [0u8; RING_SIZE];
        let err = read_header(&mut Cursor::new(file), &mut ring).unwrap_err();
        assert!(matches!(err, OpenError::ShortFile { len: 40 }), "got {err:?}");
        assert_eq!(err.status(), -libc::EIO);
    }

    #[test]
    fn test_tiny_file_is_short() {
        let mut ring = [0u8; RING_SIZE];
        let err = read_header(&mut Cursor::new(b"hello".to_vec()), &mut ring).unwrap_err();
        assert!(matches!(err, OpenError::ShortFile { len: 5 }));
    }
}
