/* Copyright (C) 2018 Olivier Goffart <ogoffart@woboq.com>

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! Serialization of language containers.

use crate::format::{
    padding, FileHeader, SectionHeader, StringHeader, StringKey, ATTR_TAG, KEYS_TAG, LANG_TAG,
    LAST_TAG, STRS_TAG, WORD,
};
use byteorder::{NativeEndian, WriteBytesExt};
use std::io::{self, Write};

/// A single string to be stored in a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrString {
    pub id: u32,
    /// The text, in any encoding. Plural variants are separated by a zero byte.
    pub value: Vec<u8>,
}

impl TrString {
    pub fn new(id: u32, value: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

/// The contents of a language container, before serialization.
///
/// Sections are written in the order attributes, strings, keys; an empty section is left out
/// of the file. Strings keep the order in which they were pushed.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub serial: u32,
    pub attrs: Vec<TrString>,
    pub strings: Vec<TrString>,
    pub keys: Vec<TrString>,
}

fn to_u32(value: usize) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "section too large for a language file",
        )
    })
}

impl File {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            ..Default::default()
        }
    }

    /// Writes the container to `out`. Errors of the sink are returned as they are.
    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        tracing::debug!(
            serial = self.serial,
            attrs = self.attrs.len(),
            strings = self.strings.len(),
            keys = self.keys.len(),
            "writing language file"
        );

        out.write_u32::<NativeEndian>(LANG_TAG)?;
        FileHeader::new(self.serial).write(&mut out)?;

        write_section(&mut out, ATTR_TAG, &self.attrs)?;
        write_section(&mut out, STRS_TAG, &self.strings)?;
        write_section(&mut out, KEYS_TAG, &self.keys)?;

        SectionHeader {
            id: LAST_TAG,
            ints: 0,
        }
        .write(&mut out)
    }

    /// Serializes the container into memory.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

fn write_section<W: Write>(out: &mut W, id: u32, block: &[TrString]) -> io::Result<()> {
    if block.is_empty() {
        return Ok(());
    }

    let mut keys = Vec::with_capacity(block.len());
    let mut offset = 0usize;
    for string in block {
        keys.push(StringKey {
            id: string.id,
            offset: to_u32(offset)?,
            length: to_u32(string.value.len())?,
        });
        offset += string.value.len() + 1;
    }
    let padding = padding(offset);

    let string_offset = StringHeader::WORDS + block.len() * StringKey::WORDS;
    let data_words = (offset + padding) / WORD;
    let header = StringHeader {
        id,
        ints: to_u32(string_offset - SectionHeader::WORDS + data_words)?,
        string_count: to_u32(block.len())?,
        string_offset: to_u32(string_offset)?,
    };

    header.write(&mut *out)?;
    for key in &keys {
        key.write(&mut *out)?;
    }
    for string in block {
        out.write_all(&string.value)?;
        out.write_all(&[0])?;
    }
    out.write_all(&[0; WORD][..padding])
}
