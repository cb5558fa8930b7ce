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

//! Error types returned when opening language containers.

use thiserror::Error;

/// The reason a byte buffer was rejected as a language container.
///
/// Every variant is fail-closed: the container that produced it is left without any
/// readable section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The buffer cannot even hold the file tag and the header section.
    #[error("buffer of {0} bytes is too short for a language file")]
    TooShort(usize),
    /// The size of the buffer is not a whole number of words.
    #[error("buffer of {0} bytes is not word-aligned")]
    Misaligned(usize),
    /// The first word is not `LANG`.
    #[error("file tag {0:#010x} is not a language file tag")]
    BadFileTag(u32),
    /// The first section is not the ` hdr` section.
    #[error("section {0:#010x} found where the file header was expected")]
    BadHeaderTag(u32),
    /// The header declares fewer words than the header structure needs.
    #[error("file header declares {0} words, too small for a header")]
    HeaderTooSmall(u32),
    /// The major version of the file is not supported by this reader.
    #[error("unsupported file version {major}.{minor}")]
    UnsupportedVersion {
        /// Major component of the version word.
        major: u32,
        /// Minor component of the version word.
        minor: u32,
    },
    /// A section's declared length runs past the end of the buffer.
    #[error("section {tag:#010x} at byte {offset} runs past the end of the file")]
    SectionOverrun {
        /// Identifier of the offending section.
        tag: u32,
        /// Byte offset of the section header.
        offset: usize,
    },
    /// The section walk reached the end of the buffer without a `last` section.
    #[error("missing terminating section")]
    MissingTerminator,
    /// The counts and offsets of a string section are inconsistent.
    #[error("malformed string table in section {0:#010x}")]
    BadStringTable(u32),
    /// A string key points outside of its section's string data.
    #[error("string {id} in section {tag:#010x} points outside of the string data")]
    KeyOutOfBounds {
        /// Identifier of the section.
        tag: u32,
        /// Identifier of the string.
        id: u32,
    },
    /// The byte following a string is not a zero byte.
    #[error("string {id} in section {tag:#010x} is not zero-terminated")]
    MissingNul {
        /// Identifier of the section.
        tag: u32,
        /// Identifier of the string.
        id: u32,
    },
}

/// Errors of the storages which load containers from the file system.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The container file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The container file was read but is not a valid container.
    #[error("invalid language file: {0}")]
    Format(#[from] FormatError),
    /// The container does not belong to the expected revision of the strings.
    #[error("serial mismatch: expected {expected}, found {found}")]
    SerialMismatch {
        /// The serial the caller asked for.
        expected: u32,
        /// The serial stored in the file.
        found: u32,
    },
}

/// A convenience `Result` type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
