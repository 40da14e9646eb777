// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Metadata heaps and the compressed integer encoding shared by blobs.

See ECMA-335 II.24.2.3 (`#Strings`), II.24.2.4 (`#Blob`) and II.23.2
(compressed integers).
*/

use crate::ClrMetadataError;

/// Decode a compressed unsigned integer, advancing `offset`.
pub fn read_compressed_u32(data: &[u8], offset: &mut usize) -> Result<u32, ClrMetadataError> {
    let byte = |i: usize| -> Result<u32, ClrMetadataError> {
        data.get(*offset + i)
            .map(|b| *b as u32)
            .ok_or(ClrMetadataError::BadCompressedInteger)
    };

    let b0 = byte(0)?;

    let (value, len) = if b0 & 0x80 == 0 {
        (b0, 1)
    } else if b0 & 0xc0 == 0x80 {
        (((b0 & 0x3f) << 8) | byte(1)?, 2)
    } else if b0 & 0xe0 == 0xc0 {
        (
            ((b0 & 0x1f) << 24) | (byte(1)? << 16) | (byte(2)? << 8) | byte(3)?,
            4,
        )
    } else {
        return Err(ClrMetadataError::BadCompressedInteger);
    };

    *offset += len;

    Ok(value)
}

/// Encode a compressed unsigned integer.
///
/// Values above `0x1fffffff` are not representable and are rejected.
pub fn write_compressed_u32(dest: &mut Vec<u8>, value: u32) -> Result<(), ClrMetadataError> {
    if value < 0x80 {
        dest.push(value as u8);
    } else if value < 0x4000 {
        dest.extend_from_slice(&[0x80 | (value >> 8) as u8, value as u8]);
    } else if value < 0x2000_0000 {
        dest.extend_from_slice(&[
            0xc0 | (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ]);
    } else {
        return Err(ClrMetadataError::BadCompressedInteger);
    }

    Ok(())
}

/// The `#Strings` heap: NUL terminated UTF-8 identifiers.
#[derive(Clone, Copy)]
pub struct StringsHeap<'a> {
    data: &'a [u8],
}

impl<'a> StringsHeap<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn get(&self, index: u32) -> Result<&'a str, ClrMetadataError> {
        let start = index as usize;

        let remaining = self.data.get(start..).ok_or(ClrMetadataError::HeapIndex {
            heap: "#Strings",
            index,
        })?;

        let end = remaining
            .iter()
            .position(|b| *b == 0)
            .ok_or(ClrMetadataError::HeapIndex {
                heap: "#Strings",
                index,
            })?;

        std::str::from_utf8(&remaining[..end]).map_err(|_| ClrMetadataError::BadUtf8)
    }
}

/// The `#Blob` heap: length prefixed byte sequences.
#[derive(Clone, Copy)]
pub struct BlobHeap<'a> {
    data: &'a [u8],
}

impl<'a> BlobHeap<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn get(&self, index: u32) -> Result<&'a [u8], ClrMetadataError> {
        let err = || ClrMetadataError::HeapIndex {
            heap: "#Blob",
            index,
        };

        let mut offset = index as usize;
        if offset >= self.data.len() {
            return Err(err());
        }

        let len = read_compressed_u32(self.data, &mut offset)? as usize;

        self.data.get(offset..offset + len).ok_or_else(err)
    }
}
