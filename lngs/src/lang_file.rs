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

//! Reading language containers.

use crate::error::FormatError;
use crate::format::{
    self, word, FileHeader, SectionHeader, StringHeader, StringKey, ATTR_PLURALS, ATTR_TAG,
    HDR_TAG, KEYS_TAG, LANG_TAG, LAST_TAG, STRS_TAG, WORD,
};
use crate::plurals::PluralForms;
use crate::Strings;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Position of a validated string section inside of the container's bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Section {
    count: u32,
    /// Byte offset of the first string key.
    keys: usize,
    /// Byte offset of the string data.
    strings: usize,
    /// Size of the string data, padding included.
    strings_len: usize,
}

impl Section {
    /// Validates the string section spanning `data[at..end]`.
    fn read(data: &[u8], at: usize, end: usize, tag: u32) -> Result<Self, FormatError> {
        let section = &data[..end];
        let bad_table = FormatError::BadStringTable(tag);
        let header = StringHeader::read(section, at).ok_or_else(|| bad_table.clone())?;

        let section_words = (end - at) / WORD;
        let string_offset = header.string_offset as usize;
        if string_offset < StringHeader::WORDS || string_offset > section_words {
            return Err(bad_table);
        }
        let key_words = (header.string_count as usize)
            .checked_mul(StringKey::WORDS)
            .ok_or_else(|| bad_table.clone())?;
        if string_offset - StringHeader::WORDS < key_words {
            return Err(bad_table);
        }

        let out = Section {
            count: header.string_count,
            keys: at + StringHeader::WORDS * WORD,
            strings: at + string_offset * WORD,
            strings_len: (section_words - string_offset) * WORD,
        };

        let blob = &section[out.strings..];
        for key in out.iter(section) {
            let start = key.offset as usize;
            let stop = start
                .checked_add(key.length as usize)
                .filter(|&stop| start <= out.strings_len && stop <= out.strings_len)
                .ok_or(FormatError::KeyOutOfBounds { tag, id: key.id })?;
            if stop < out.strings_len && blob[stop] != 0 {
                return Err(FormatError::MissingNul { tag, id: key.id });
            }
        }

        Ok(out)
    }

    fn iter(self, data: &[u8]) -> impl Iterator<Item = StringKey> + '_ {
        (0..self.count as usize)
            .filter_map(move |index| StringKey::read(data, self.keys + index * StringKey::SIZE))
    }

    fn get(self, data: &[u8], id: u32) -> Option<StringKey> {
        self.iter(data).find(|key| key.id == id)
    }

    fn string(self, data: &[u8], key: StringKey) -> &[u8] {
        let start = self.strings + key.offset as usize;
        data.get(start..start + key.length as usize).unwrap_or(&[])
    }

    fn find(self, data: &[u8], id: u32) -> &[u8] {
        self.get(data, id)
            .map(|key| self.string(data, key))
            .unwrap_or(&[])
    }

    fn entries(self, data: &[u8]) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.iter(data).map(move |key| (key.id, self.string(data, key)))
    }
}

/// Result of validating a whole container.
#[derive(Debug, Default, Clone, Copy)]
struct Index {
    serial: u32,
    attrs: Section,
    strings: Section,
    keys: Section,
}

impl Index {
    fn read(data: &[u8]) -> Result<Self, FormatError> {
        const HEADER_SIZE: usize = WORD + FileHeader::WORDS * WORD;

        if data.len() < HEADER_SIZE {
            return Err(FormatError::TooShort(data.len()));
        }
        if data.len() % WORD != 0 {
            return Err(FormatError::Misaligned(data.len()));
        }

        let file_tag = word(data, 0).ok_or(FormatError::TooShort(data.len()))?;
        if file_tag != LANG_TAG {
            return Err(FormatError::BadFileTag(file_tag));
        }
        let header = FileHeader::read(data, WORD).ok_or(FormatError::TooShort(data.len()))?;
        if header.id != HDR_TAG {
            return Err(FormatError::BadHeaderTag(header.id));
        }
        if (header.ints as usize) + SectionHeader::WORDS < FileHeader::WORDS {
            return Err(FormatError::HeaderTooSmall(header.ints));
        }
        if format::version_major(header.version) != format::version_major(format::VERSION) {
            return Err(FormatError::UnsupportedVersion {
                major: format::version_major(header.version),
                minor: format::version_minor(header.version),
            });
        }

        let mut index = Index {
            serial: header.serial,
            ..Default::default()
        };

        let mut at = WORD;
        let mut section = SectionHeader {
            id: header.id,
            ints: header.ints,
        };
        loop {
            let end = (section.ints as usize)
                .checked_add(SectionHeader::WORDS)
                .and_then(|words| words.checked_mul(WORD))
                .and_then(|size| at.checked_add(size))
                .filter(|&end| end <= data.len())
                .ok_or(FormatError::SectionOverrun {
                    tag: section.id,
                    offset: at,
                })?;

            match section.id {
                ATTR_TAG => index.attrs = Section::read(data, at, end, ATTR_TAG)?,
                STRS_TAG => index.strings = Section::read(data, at, end, STRS_TAG)?,
                KEYS_TAG => index.keys = Section::read(data, at, end, KEYS_TAG)?,
                _ => {}
            }

            at = end;
            section = SectionHeader::read(data, at).ok_or(FormatError::MissingTerminator)?;
            if section.id == LAST_TAG {
                return Ok(index);
            }
        }
    }
}

/// An opened language container.
///
/// A `LangFile` is either closed, and then every lookup returns an empty string, or open over
/// the bytes of a valid container. The bytes are either borrowed, in which case the borrow
/// checker keeps them alive for as long as the file, or owned.
///
/// Values are stored as bytes. The `*_bytes` methods return them as they are; lookups through
/// the [`Strings`] trait return an empty string for a value which is not valid UTF-8.
///
/// ```
/// use lngs::{writer, LangFile, Strings, ATTR_PLURALS};
///
/// let mut file = writer::File::new(1);
/// file.attrs.push(writer::TrString::new(ATTR_PLURALS, "nplurals=2; plural=(n != 1);"));
/// file.strings.push(writer::TrString::new(1001, "one file\0{} files"));
/// let bytes = file.to_vec().unwrap();
///
/// let lang = LangFile::from_bytes(&bytes[..]).unwrap();
/// assert_eq!(lang.get_string(1001), "one file");
/// assert_eq!(lang.get_plural_string(1001, 3), "{} files");
/// ```
#[derive(Debug, Default)]
pub struct LangFile<'a> {
    data: Cow<'a, [u8]>,
    index: Option<Index>,
    plurals: OnceLock<PluralForms>,
}

impl<'a> LangFile<'a> {
    /// A closed file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the container stored in `data`.
    pub fn from_bytes(data: impl Into<Cow<'a, [u8]>>) -> Result<Self, FormatError> {
        let mut file = Self::new();
        file.open(data)?;
        Ok(file)
    }

    /// Validates `data` and makes it the content of this file.
    ///
    /// On failure the file is closed and no part of `data` is reachable through it.
    pub fn open(&mut self, data: impl Into<Cow<'a, [u8]>>) -> Result<(), FormatError> {
        self.close();
        let data = data.into();
        let index = match Index::read(&data) {
            Ok(index) => index,
            Err(err) => {
                tracing::debug!(error = %err, size = data.len(), "rejected language file");
                return Err(err);
            }
        };
        tracing::debug!(
            serial = index.serial,
            attrs = index.attrs.count,
            strings = index.strings.count,
            keys = index.keys.count,
            "opened language file"
        );
        self.data = data;
        self.index = Some(index);
        Ok(())
    }

    /// Forgets the content of the file and the decoded plural rule.
    pub fn close(&mut self) {
        self.data = Cow::Borrowed(&[]);
        self.index = None;
        self.plurals = OnceLock::new();
    }

    pub fn is_open(&self) -> bool {
        self.index.is_some()
    }

    /// Serial number of the strings definition the file was built from; `0` when closed.
    pub fn serial(&self) -> u32 {
        self.index.map_or(0, |index| index.serial)
    }

    /// Number of entries in the strings section.
    pub fn size(&self) -> u32 {
        self.index.map_or(0, |index| index.strings.count)
    }

    fn section(&self, pick: fn(&Index) -> Section) -> Section {
        self.index.as_ref().map(pick).unwrap_or_default()
    }

    /// The decoded `Plural-Forms` attribute, decoded on first use.
    ///
    /// A file without a usable attribute behaves as `nplurals=1; plural=0`.
    pub fn plural_forms(&self) -> &PluralForms {
        self.plurals.get_or_init(|| {
            let entry = self.get_attr(ATTR_PLURALS);
            let forms = PluralForms::decode(entry);
            if forms.is_valid() {
                forms
            } else {
                if !entry.is_empty() {
                    tracing::warn!(plural_forms = entry, "unusable plural forms, using one form");
                }
                PluralForms::decode("nplurals=1; plural=0")
            }
        })
    }

    /// Index of the plural variant used for `count`.
    pub fn calc_substring(&self, count: i64) -> i64 {
        self.plural_forms().eval(count)
    }

    /// All attributes, in file order.
    pub fn attrs(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.section(|index| index.attrs).entries(&self.data)
    }

    /// All strings, in file order. Plural variants are separated with a zero byte.
    pub fn strings(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.section(|index| index.strings).entries(&self.data)
    }

    /// All keys, in file order.
    pub fn keys(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.section(|index| index.keys).entries(&self.data)
    }

    /// The string `id` with all of its plural variants; empty if there is none.
    pub fn string_bytes(&self, id: u32) -> &[u8] {
        self.section(|index| index.strings).find(&self.data, id)
    }

    /// Byte version of [`Strings::get_plural_string`].
    pub fn plural_bytes(&self, id: u32, count: i64) -> &[u8] {
        let value = self.string_bytes(id);
        if value.is_empty() {
            return value;
        }
        usize::try_from(self.calc_substring(count))
            .ok()
            .and_then(|variant| value.split(|&b| b == 0).nth(variant))
            .unwrap_or_else(|| first_variant(value))
    }

    pub fn attr_bytes(&self, id: u32) -> &[u8] {
        self.section(|index| index.attrs).find(&self.data, id)
    }

    pub fn key_bytes(&self, id: u32) -> &[u8] {
        self.section(|index| index.keys).find(&self.data, id)
    }
}

fn first_variant(value: &[u8]) -> &[u8] {
    value.split(|&b| b == 0).next().unwrap_or(value)
}

fn text(value: &[u8]) -> &str {
    std::str::from_utf8(value).unwrap_or("")
}

impl Strings for LangFile<'_> {
    fn get_string(&self, id: u32) -> &str {
        text(first_variant(self.string_bytes(id)))
    }

    fn get_plural_string(&self, id: u32, count: i64) -> &str {
        text(self.plural_bytes(id, count))
    }

    fn get_attr(&self, id: u32) -> &str {
        text(self.attr_bytes(id))
    }

    fn get_key(&self, id: u32) -> &str {
        text(self.key_bytes(id))
    }

    fn find_key(&self, key: &str) -> Option<u32> {
        if key.is_empty() {
            return None;
        }
        self.keys()
            .find(|(_, candidate)| *candidate == key.as_bytes())
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ATTR_CULTURE, ATTR_LANGUAGE, VERSION};
    use crate::writer::{File, TrString};
    use byteorder::{NativeEndian, WriteBytesExt};

    fn words(values: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        for &v in values {
            out.write_u32::<NativeEndian>(v).unwrap();
        }
        out
    }

    fn head(tag_file: u32, tag_hdr: u32, hdr_ints: u32, version: u32) -> Vec<u32> {
        vec![tag_file, tag_hdr, hdr_ints, version, 123]
    }

    fn sample() -> Vec<u8> {
        let mut file = File::new(5);
        file.attrs.push(TrString::new(ATTR_CULTURE, "pl-PL"));
        file.attrs.push(TrString::new(ATTR_LANGUAGE, "polski"));
        file.attrs.push(TrString::new(
            ATTR_PLURALS,
            "nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<12 || n%100>14) ? 1 : 2)",
        ));
        file.strings.push(TrString::new(1001, "plik\0pliki\0plików"));
        file.strings.push(TrString::new(1002, "Otwórz"));
        file.strings.push(TrString::new(1003, "jeden"));
        file.keys.push(TrString::new(1001, "FILES"));
        file.keys.push(TrString::new(1002, "OPEN"));
        file.to_vec().unwrap()
    }

    #[test]
    fn lookups() {
        let data = sample();
        let file = LangFile::from_bytes(&data[..]).unwrap();
        assert!(file.is_open());
        assert_eq!(file.serial(), 5);
        assert_eq!(file.size(), 3);
        assert_eq!(file.get_attr(ATTR_CULTURE), "pl-PL");
        assert_eq!(file.get_attr(ATTR_LANGUAGE), "polski");
        assert_eq!(file.get_attr(7), "");
        assert_eq!(file.get_string(1001), "plik");
        assert_eq!(file.get_string(1002), "Otwórz");
        assert_eq!(file.get_string(1), "");
        assert_eq!(file.get_plural_string(1001, 1), "plik");
        assert_eq!(file.get_plural_string(1001, 3), "pliki");
        assert_eq!(file.get_plural_string(1001, 5), "plików");
        assert_eq!(file.get_plural_string(1001, 22), "pliki");
        assert_eq!(file.get_plural_string(1, 22), "");
        assert_eq!(file.get_key(1002), "OPEN");
        assert_eq!(file.get_key(1003), "");
        assert_eq!(file.find_key("FILES"), Some(1001));
        assert_eq!(file.find_key("NOPE"), None);
        assert_eq!(file.find_key(""), None);
    }

    #[test]
    fn single_variant_for_every_count() {
        let data = sample();
        let file = LangFile::from_bytes(&data[..]).unwrap();
        for count in [-5, 0, 1, 2, 5, 22, 1000] {
            assert_eq!(file.get_plural_string(1003, count), "jeden");
        }
    }

    #[test]
    fn without_plural_forms() {
        let mut file = File::new(0);
        file.strings.push(TrString::new(1, "one\0many"));
        let data = file.to_vec().unwrap();
        let file = LangFile::from_bytes(data).unwrap();
        assert_eq!(file.plural_forms().nplurals, 1);
        for count in 0..10 {
            assert_eq!(file.get_plural_string(1, count), "one");
        }
    }

    #[test]
    fn broken_plural_forms() {
        let mut file = File::new(0);
        file.attrs.push(TrString::new(ATTR_PLURALS, "nplurals=2; plural=n=1"));
        file.strings.push(TrString::new(1, "one\0many"));
        let data = file.to_vec().unwrap();
        let file = LangFile::from_bytes(data).unwrap();
        assert_eq!(file.get_plural_string(1, 5), "one");
    }

    #[test]
    fn close_and_reopen() {
        let data = sample();
        let mut file = LangFile::from_bytes(&data[..]).unwrap();
        assert_eq!(file.calc_substring(5), 2);
        file.close();
        assert!(!file.is_open());
        assert_eq!(file.size(), 0);
        assert_eq!(file.get_string(1002), "");
        assert_eq!(file.get_attr(ATTR_CULTURE), "");
        assert_eq!(file.find_key("OPEN"), None);

        let mut other = File::new(9);
        other.strings.push(TrString::new(1002, "Open\0Opens"));
        file.open(other.to_vec().unwrap()).unwrap();
        assert_eq!(file.serial(), 9);
        // the rule of the previous file is gone
        assert_eq!(file.calc_substring(5), 0);
        assert_eq!(file.get_plural_string(1002, 5), "Open");
    }

    #[test]
    fn failed_open_closes() {
        let data = sample();
        let mut file = LangFile::from_bytes(&data[..]).unwrap();
        let err = file.open(&data[..data.len() - 4]).unwrap_err();
        assert_eq!(err, FormatError::MissingTerminator);
        assert!(!file.is_open());
        assert_eq!(file.size(), 0);
        assert_eq!(file.get_string(1002), "");
    }

    #[test]
    fn closed_file_is_empty() {
        let file = LangFile::new();
        assert!(!file.is_open());
        assert_eq!(file.serial(), 0);
        assert_eq!(file.get_plural_string(1, 1), "");
        assert_eq!(file.attrs().count(), 0);
    }

    #[test]
    fn minor_versions_are_read() {
        for version in [VERSION, 0x0000_0101, 0x0000_01FF] {
            let mut data = head(LANG_TAG, HDR_TAG, 2, version);
            data.extend([LAST_TAG, 0]);
            let file = LangFile::from_bytes(words(&data)).unwrap();
            assert_eq!(file.serial(), 123);
        }
    }

    #[test]
    fn unknown_sections_are_skipped() {
        let mut data = head(LANG_TAG, HDR_TAG, 2, VERSION);
        data.extend([0x6f666e69, 3, 1, 2, 3]);
        data.extend([STRS_TAG, 2 + 3 + 1, 1, 4 + 3, 7, 0, 2]);
        let mut bytes = words(&data);
        bytes.extend_from_slice(b"hi\0\0");
        bytes.extend(words(&[LAST_TAG, 0]));
        let file = LangFile::from_bytes(bytes).unwrap();
        assert_eq!(file.get_string(7), "hi");
    }

    #[test]
    fn bad_files() {
        let valuee = {
            let mut out = words(&head(LANG_TAG, HDR_TAG, 2, VERSION));
            out.extend(words(&[ATTR_TAG, 7, 1, 7, 1000, 0, 5]));
            out.extend_from_slice(b"valuee\0\0");
            out.extend(words(&[STRS_TAG, 2, 0, 4, LAST_TAG, 0]));
            out
        };
        let with_last = |mut data: Vec<u32>| {
            data.extend([LAST_TAG, 0]);
            words(&data)
        };
        let hdr = head(LANG_TAG, HDR_TAG, 2, VERSION);
        let after_hdr = |tail: &[u32]| {
            let mut data = hdr.clone();
            data.extend_from_slice(tail);
            words(&data)
        };

        let cases: Vec<(&str, Vec<u8>, FormatError)> = vec![
            ("empty", vec![], FormatError::TooShort(0)),
            ("zero", words(&head(0, 0, 2, 0)), FormatError::BadFileTag(0)),
            (
                "file_tag",
                words(&head(LANG_TAG, 0, 2, 0)),
                FormatError::BadHeaderTag(0),
            ),
            (
                "header_2.0",
                with_last(head(LANG_TAG, HDR_TAG, 2, 0x0000_0200)),
                FormatError::UnsupportedVersion { major: 2, minor: 0 },
            ),
            (
                "header_0.9",
                with_last(head(LANG_TAG, HDR_TAG, 2, 0x0000_0009)),
                FormatError::UnsupportedVersion { major: 0, minor: 9 },
            ),
            (
                "header_small",
                with_last(head(LANG_TAG, HDR_TAG, 1, VERSION)),
                FormatError::HeaderTooSmall(1),
            ),
            (
                "header_big",
                words(&head(LANG_TAG, HDR_TAG, 4, VERSION)),
                FormatError::SectionOverrun {
                    tag: HDR_TAG,
                    offset: 4,
                },
            ),
            ("no_last", words(&hdr), FormatError::MissingTerminator),
            (
                "misaligned",
                {
                    let mut out = with_last(hdr.clone());
                    out.push(0);
                    out
                },
                FormatError::Misaligned(29),
            ),
            (
                "broken_strs_1",
                after_hdr(&[STRS_TAG, 2, 0, 5, LAST_TAG, 0]),
                FormatError::BadStringTable(STRS_TAG),
            ),
            (
                "broken_strs_2",
                after_hdr(&[STRS_TAG, STRS_TAG, 2, 1, 4, LAST_TAG, 0]),
                FormatError::SectionOverrun {
                    tag: STRS_TAG,
                    offset: 20,
                },
            ),
            (
                "broken_attr_1",
                after_hdr(&[ATTR_TAG, 5, 1, 7, 1000, 0, 5, STRS_TAG, 2, 0, 4, LAST_TAG, 0]),
                FormatError::KeyOutOfBounds {
                    tag: ATTR_TAG,
                    id: 1000,
                },
            ),
            (
                "broken_attr_2",
                valuee,
                FormatError::MissingNul {
                    tag: ATTR_TAG,
                    id: 1000,
                },
            ),
            (
                "broken_keys_1",
                after_hdr(&[KEYS_TAG, 2, 1, 4, LAST_TAG, 0]),
                FormatError::BadStringTable(KEYS_TAG),
            ),
            (
                "broken_keys_2",
                after_hdr(&[ATTR_TAG, 5, 1, 7, 1000, 10, 5, LAST_TAG, 0]),
                FormatError::KeyOutOfBounds {
                    tag: ATTR_TAG,
                    id: 1000,
                },
            ),
            (
                "string_header_cut",
                after_hdr(&[STRS_TAG, 0, LAST_TAG, 0]),
                FormatError::BadStringTable(STRS_TAG),
            ),
        ];

        for (name, data, expected) in cases {
            let mut file = LangFile::new();
            assert_eq!(file.open(&data[..]), Err(expected), "{}", name);
            assert!(!file.is_open(), "{}", name);
            assert_eq!(file.size(), 0, "{}", name);
        }
    }

    #[test]
    fn legacy_encoding() {
        // "café" in Latin-1
        let mut data = words(&head(LANG_TAG, HDR_TAG, 2, VERSION));
        data.extend(words(&[STRS_TAG, 2 + 6 + 2, 2, 4 + 6, 7, 0, 4, 8, 5, 2]));
        data.extend_from_slice(b"caf\xe9\0ok\0");
        data.extend(words(&[LAST_TAG, 0]));
        let file = LangFile::from_bytes(data).unwrap();
        assert_eq!(file.size(), 2);
        assert_eq!(file.string_bytes(7), b"caf\xe9");
        assert_eq!(file.plural_bytes(7, 3), b"caf\xe9");
        assert_eq!(file.get_string(7), "");
        assert_eq!(file.get_string(8), "ok");
    }

    #[test]
    fn byte_lookups() {
        let data = sample();
        let file = LangFile::from_bytes(&data[..]).unwrap();
        assert_eq!(file.string_bytes(1001), "plik\0pliki\0plików".as_bytes());
        assert_eq!(file.plural_bytes(1001, 5), "plików".as_bytes());
        assert_eq!(file.plural_bytes(1, 5), b"");
        assert_eq!(file.attr_bytes(ATTR_CULTURE), b"pl-PL");
        assert_eq!(file.key_bytes(1001), b"FILES");
    }

    #[test]
    fn string_filling_the_whole_blob() {
        // the end of the string data terminates the last string
        let mut data = words(&head(LANG_TAG, HDR_TAG, 2, VERSION));
        data.extend(words(&[STRS_TAG, 2 + 3 + 1, 1, 4 + 3, 12, 0, 4]));
        data.extend_from_slice(b"abcd");
        data.extend(words(&[LAST_TAG, 0]));
        let file = LangFile::from_bytes(data).unwrap();
        assert_eq!(file.get_string(12), "abcd");
    }
}
