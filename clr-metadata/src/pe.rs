// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Locating CLI metadata inside PE images.

Managed modules are ordinary PE files whose CLI header (data directory
14) points at the metadata root. The metadata root starts with the `BSJB`
signature and is followed by a table of named streams.
*/

use {
    crate::ClrMetadataError,
    goblin::pe::{section_table::SectionTable, PE},
    scroll::{IOwrite, Pread, SizeWith},
    std::ops::Range,
};

/// `BSJB`, the metadata root signature.
pub const METADATA_SIGNATURE: u32 = 0x424a_5342;

/// `IMAGE_COR20_HEADER`, the CLI header.
#[derive(Clone, Copy, Debug, Default, IOwrite, Pread, SizeWith)]
pub struct CliHeader {
    /// Size of this structure.
    pub cb: u32,
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    pub metadata_rva: u32,
    pub metadata_size: u32,
    pub flags: u32,
    pub entry_point_token: u32,
    /// Resources, strong name, code manager, vtable fixup, export address
    /// and native header directories as (rva, size) pairs.
    pub directories: [u32; 12],
}

/// Convert an RVA to a file offset using the section table.
pub fn rva_to_offset(sections: &[SectionTable], rva: u32) -> Result<usize, ClrMetadataError> {
    sections
        .iter()
        .find_map(|section| {
            let size = section.virtual_size.max(section.size_of_raw_data);
            let end = section.virtual_address.checked_add(size)?;

            if rva >= section.virtual_address && rva < end {
                (rva - section.virtual_address)
                    .checked_add(section.pointer_to_raw_data)
                    .map(|offset| offset as usize)
            } else {
                None
            }
        })
        .ok_or(ClrMetadataError::UnmappedRva(rva))
}

/// Find the byte range of the metadata root within a PE image.
pub fn find_metadata(data: &[u8]) -> Result<Range<usize>, ClrMetadataError> {
    let pe = PE::parse(data)?;

    let clr = pe
        .header
        .optional_header
        .as_ref()
        .and_then(|header| {
            header
                .data_directories
                .get_clr_runtime_header()
                .as_ref()
                .map(|d| (d.virtual_address, d.size))
        })
        .filter(|(rva, size)| *rva != 0 && *size != 0)
        .ok_or(ClrMetadataError::NoCliHeader)?;

    let header_offset = rva_to_offset(&pe.sections, clr.0)?;

    let header = data.pread_with::<CliHeader>(header_offset, scroll::LE)?;

    let start = rva_to_offset(&pe.sections, header.metadata_rva)?;
    let end = start.saturating_add(header.metadata_size as usize);

    if end > data.len() {
        return Err(ClrMetadataError::Scroll(scroll::Error::TooBig {
            size: end,
            len: data.len(),
        }));
    }

    Ok(start..end)
}

/// A stream header from the metadata root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamHeader {
    pub name: String,
    /// Range relative to the start of the metadata root.
    pub range: Range<usize>,
}

/// The parsed metadata root.
#[derive(Clone, Debug)]
pub struct MetadataRoot {
    /// Runtime version string, e.g. `v4.0.30319`.
    pub version: String,
    pub streams: Vec<StreamHeader>,
}

impl MetadataRoot {
    pub fn parse(data: &[u8]) -> Result<Self, ClrMetadataError> {
        let offset = &mut 0;

        let signature = data.gread_with::<u32>(offset, scroll::LE)?;
        if signature != METADATA_SIGNATURE {
            return Err(ClrMetadataError::BadMetadataSignature(signature));
        }

        let _major = data.gread_with::<u16>(offset, scroll::LE)?;
        let _minor = data.gread_with::<u16>(offset, scroll::LE)?;
        let _reserved = data.gread_with::<u32>(offset, scroll::LE)?;
        let version_length = data.gread_with::<u32>(offset, scroll::LE)? as usize;

        let version_bytes = data
            .get(*offset..offset.saturating_add(version_length))
            .ok_or(ClrMetadataError::BadMetadataSignature(signature))?;
        let version = String::from_utf8_lossy(version_bytes)
            .trim_end_matches('\0')
            .to_string();
        *offset += version_length;

        let _flags = data.gread_with::<u16>(offset, scroll::LE)?;
        let stream_count = data.gread_with::<u16>(offset, scroll::LE)?;

        let mut streams = Vec::with_capacity(stream_count as usize);

        for _ in 0..stream_count {
            let stream_offset = data.gread_with::<u32>(offset, scroll::LE)? as usize;
            let size = data.gread_with::<u32>(offset, scroll::LE)? as usize;

            let remaining = data.get(*offset..).unwrap_or_default();
            let name_len = remaining
                .iter()
                .position(|b| *b == 0)
                .ok_or(ClrMetadataError::BadUtf8)?;
            let name = std::str::from_utf8(&remaining[..name_len])
                .map_err(|_| ClrMetadataError::BadUtf8)?
                .to_string();

            // Names are NUL terminated and padded to a 4 byte boundary.
            *offset += (name_len + 4) & !3;

            let end = stream_offset.saturating_add(size);
            if end > data.len() {
                return Err(ClrMetadataError::Scroll(scroll::Error::TooBig {
                    size: end,
                    len: data.len(),
                }));
            }

            streams.push(StreamHeader {
                name,
                range: stream_offset..end,
            });
        }

        Ok(Self { version, streams })
    }

    /// Find a stream by name.
    pub fn stream(&self, name: &str) -> Option<Range<usize>> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.range.clone())
    }
}
