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

//! # Binary language resources
//!
//! This crate reads and writes LNG files: compact, word-aligned containers holding the
//! translated strings of an application, addressed by numeric identifiers, together with a
//! few attributes (the culture, the language name and the GetText `Plural-Forms` rule).
//!
//! The file is opened in place: [`LangFile`] validates the whole buffer once and then answers
//! lookups by returning slices of it, so no string is ever copied. The plural rule is decoded
//! on first use by the [`plurals`] engine, which understands the C-like expressions of GetText.
//!
//! Applications usually do not hold a [`LangFile`] directly but one of the [`storage`]s,
//! which load the file of the user's language from disk, optionally with an embedded
//! fallback, and the [`locale`] helpers give the ordered list of languages to try.
//!
//! ```
//! use lngs::{writer, LangFile, Strings, ATTR_PLURALS};
//!
//! let mut file = writer::File::new(1);
//! file.attrs.push(writer::TrString::new(ATTR_PLURALS, "nplurals=2; plural=(n != 1);"));
//! file.strings.push(writer::TrString::new(1000, "Big Error"));
//! file.strings.push(writer::TrString::new(1001, "{} file\0{} files"));
//! let bytes = file.to_vec().unwrap();
//!
//! let lang = LangFile::from_bytes(bytes).unwrap();
//! assert_eq!(lang.get_string(1000), "Big Error");
//! assert_eq!(lang.get_plural_string(1001, 1), "{} file");
//! assert_eq!(lang.get_plural_string(1001, 0), "{} files");
//! ```
//!
//! The `xlngs` tool converts GetText catalogs into language files.

mod error;
pub mod format;
mod lang_file;
pub mod locale;
pub mod plurals;
pub mod storage;
pub mod writer;

pub use error::{Error, FormatError, Result};
pub use format::{ATTR_CULTURE, ATTR_LANGUAGE, ATTR_PLURALS};
pub use lang_file::LangFile;

/// Read access to a set of translated strings.
///
/// Implemented by [`LangFile`] and by the [`storage`]s, so that code presenting strings to the
/// user does not care where they come from. Every method returns an empty string (or `None`)
/// when there is nothing to return; absence is never an error.
pub trait Strings {
    /// The string `id`, or its singular form if it has plural variants.
    fn get_string(&self, id: u32) -> &str;

    /// The variant of the string `id` matching the quantity `count`.
    ///
    /// Falls back to the singular form when the string has fewer variants than the plural
    /// rule asks for.
    fn get_plural_string(&self, id: u32, count: i64) -> &str;

    /// The attribute `id`, see [`ATTR_CULTURE`], [`ATTR_LANGUAGE`] and [`ATTR_PLURALS`].
    fn get_attr(&self, id: u32) -> &str;

    /// The symbolic key of the string `id`, if the file was built with keys.
    fn get_key(&self, id: u32) -> &str;

    /// Reverse lookup of [`Strings::get_key`].
    fn find_key(&self, key: &str) -> Option<u32>;
}

impl<T: Strings + ?Sized> Strings for &T {
    fn get_string(&self, id: u32) -> &str {
        (**self).get_string(id)
    }

    fn get_plural_string(&self, id: u32, count: i64) -> &str {
        (**self).get_plural_string(id, count)
    }

    fn get_attr(&self, id: u32) -> &str {
        (**self).get_attr(id)
    }

    fn get_key(&self, id: u32) -> &str {
        (**self).get_key(id)
    }

    fn find_key(&self, key: &str) -> Option<u32> {
        (**self).find_key(key)
    }
}
