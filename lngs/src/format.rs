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

//! Binary layout of the language container.
//!
//! ```text
//! LANG[ hdr....]....[last]
//! ```
//!
//! The file starts with the `LANG` word, immediately followed by the ` hdr` section, then by
//! any number of other sections, and ends with the `last` section. All values are 32-bit words
//! stored in the native byte order of the machine which wrote the file; there is no byte order
//! marker, so a container is only readable on a machine of the same endianness.
//!
//! Every section starts with two words:
//!
//! ```text
//!  INDEX  OFFSET  SIZE    MEANING
//!  [0]         0      4   Section identifier
//!  [1]         4      4   Size of the rest of section, after that word, in words
//!  [2]         8  [1]*4   Section contents
//! ```
//!
//! ` hdr` section:
//!
//! ```text
//!  [2]         8      4   Version of the file syntax; any 1.x file is read as a 1.0 file
//!  [3]        12      4   Serial number of the strings definition the file was built from
//! ```
//!
//! `last` section has no contents, its size is always zero.
//!
//! String sections (`attr`, `strs`, `keys`):
//!
//! ```text
//!  [2]         8      4   Strings count
//!  [3]        12      4   Offset to the string data, in words, from the beginning of the section
//!  [4]        16 [2]*12   String keys
//!              0      4    - identifier of the string
//!              4      4    - offset of the string from the beginning of the data, in bytes
//!              8      4    - length of the string in bytes, without the terminating zero
//!  [5]     [3]*4    ?*4   String data, each string followed by a zero byte, padded to a word
//! ```

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use std::io::{self, Write};

/// Size of a word, in bytes.
pub const WORD: usize = 4;

/// `LANG`, the first word of every container.
pub const LANG_TAG: u32 = 0x474E_414C;
/// ` hdr`, the file header section.
pub const HDR_TAG: u32 = 0x7264_6820;
/// `attr`, the attributes section.
pub const ATTR_TAG: u32 = 0x7274_7461;
/// `strs`, the translated strings section.
pub const STRS_TAG: u32 = 0x7372_7473;
/// `keys`, the original identifiers of the strings.
pub const KEYS_TAG: u32 = 0x7379_656B;
/// `last`, the terminating section.
pub const LAST_TAG: u32 = 0x7473_616C;

/// Version 1.0 of the file syntax, as written by this crate.
pub const VERSION: u32 = 0x0000_0100;

/// Culture code of the container, e.g. `en-US`.
pub const ATTR_CULTURE: u32 = 0;
/// Name of the language, in that language.
pub const ATTR_LANGUAGE: u32 = 1;
/// GetText `Plural-Forms` of the language, e.g. `nplurals=2; plural=(n != 1);`.
pub const ATTR_PLURALS: u32 = 2;

/// Major component of a version word.
pub const fn version_major(version: u32) -> u32 {
    version >> 8
}

/// Minor component of a version word.
pub const fn version_minor(version: u32) -> u32 {
    version & 0xFF
}

/// Reads the word starting at byte `at`, or `None` if it would not fit in `data`.
pub(crate) fn word(data: &[u8], at: usize) -> Option<u32> {
    let end = at.checked_add(WORD)?;
    data.get(at..end).map(NativeEndian::read_u32)
}

/// Number of zero bytes needed to bring `len` to a word boundary.
pub(crate) const fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

fn write_words<W: Write>(mut out: W, words: &[u32]) -> io::Result<()> {
    for &w in words {
        out.write_u32::<NativeEndian>(w)?;
    }
    Ok(())
}

/// The two words common to every section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub id: u32,
    /// Words following this field up to the end of the section.
    pub ints: u32,
}

impl SectionHeader {
    pub const WORDS: usize = 2;

    pub(crate) fn read(data: &[u8], at: usize) -> Option<Self> {
        Some(Self {
            id: word(data, at)?,
            ints: word(data, at + WORD)?,
        })
    }

    pub fn write<W: Write>(&self, out: W) -> io::Result<()> {
        write_words(out, &[self.id, self.ints])
    }
}

/// The ` hdr` section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub id: u32,
    pub ints: u32,
    pub version: u32,
    pub serial: u32,
}

impl FileHeader {
    pub const WORDS: usize = 4;

    pub fn new(serial: u32) -> Self {
        Self {
            id: HDR_TAG,
            ints: (Self::WORDS - SectionHeader::WORDS) as u32,
            version: VERSION,
            serial,
        }
    }

    pub(crate) fn read(data: &[u8], at: usize) -> Option<Self> {
        Some(Self {
            id: word(data, at)?,
            ints: word(data, at + WORD)?,
            version: word(data, at + 2 * WORD)?,
            serial: word(data, at + 3 * WORD)?,
        })
    }

    pub fn write<W: Write>(&self, out: W) -> io::Result<()> {
        write_words(out, &[self.id, self.ints, self.version, self.serial])
    }
}

/// Header of the `attr`, `strs` and `keys` sections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringHeader {
    pub id: u32,
    pub ints: u32,
    pub string_count: u32,
    /// Words from the beginning of the section to the string data.
    pub string_offset: u32,
}

impl StringHeader {
    pub const WORDS: usize = 4;

    pub(crate) fn read(data: &[u8], at: usize) -> Option<Self> {
        Some(Self {
            id: word(data, at)?,
            ints: word(data, at + WORD)?,
            string_count: word(data, at + 2 * WORD)?,
            string_offset: word(data, at + 3 * WORD)?,
        })
    }

    pub fn write<W: Write>(&self, out: W) -> io::Result<()> {
        write_words(
            out,
            &[self.id, self.ints, self.string_count, self.string_offset],
        )
    }
}

/// Location of a single string inside of its section's string data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringKey {
    pub id: u32,
    /// Bytes from the beginning of the string data.
    pub offset: u32,
    /// Bytes, not counting the terminating zero.
    pub length: u32,
}

impl StringKey {
    pub const WORDS: usize = 3;
    pub const SIZE: usize = Self::WORDS * WORD;

    pub(crate) fn read(data: &[u8], at: usize) -> Option<Self> {
        Some(Self {
            id: word(data, at)?,
            offset: word(data, at + WORD)?,
            length: word(data, at + 2 * WORD)?,
        })
    }

    pub fn write<W: Write>(&self, out: W) -> io::Result<()> {
        write_words(out, &[self.id, self.offset, self.length])
    }
}
