use anyhow::{anyhow, Context};
use lngs::writer::TrString;
use lngs::{ATTR_CULTURE, ATTR_LANGUAGE, ATTR_PLURALS};
use std::collections::HashMap;
use std::path::Path;

/// Translations of a GetText catalog, indexed by their `msgctxt`.
#[derive(Debug, Default)]
pub struct Catalog {
    pub metadata: HashMap<String, String>,
    translations: HashMap<String, String>,
}

struct POMOEntry {
    msgstr: Option<String>,
    msgstr_plural: Vec<String>,
    msgctxt: Option<String>,
}

impl Catalog {
    /// Loads a `.mo` (or `.gmo`) file, or a `.po` file for any other extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let binary = path
            .extension()
            .is_some_and(|ext| ext == "mo" || ext == "gmo");
        let options = rspolib::FileOptions::from(path);
        let catalog = if binary {
            rspolib::mofile(options)
                .map(Catalog::from)
                .map_err(|err| anyhow!("{}", err))
        } else {
            rspolib::pofile(options)
                .map(Catalog::from)
                .map_err(|err| anyhow!("{}", err))
        };
        catalog.with_context(|| format!("cannot read message file {}", path.display()))
    }

    fn new(
        entries: impl IntoIterator<Item = POMOEntry>,
        metadata: HashMap<String, String>,
    ) -> Self {
        let translations = entries
            .into_iter()
            .filter_map(|entry| {
                let key = entry.msgctxt?;
                let translation = if entry.msgstr_plural.is_empty() {
                    entry.msgstr?
                } else {
                    entry.msgstr_plural.join("\0")
                };
                // untranslated entries come with empty strings
                if translation.split('\0').all(str::is_empty) {
                    return None;
                }
                Some((key, translation))
            })
            .collect();
        Catalog {
            metadata,
            translations,
        }
    }

    /// The translation of the string `key`, plural variants separated by a zero byte.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.translations.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    /// Attributes of the language file, sorted by id.
    pub fn attributes(&self, language: Option<&str>) -> Vec<TrString> {
        let mut attrs = Vec::new();
        if let Some(culture) = self.metadata.get("Language").map(|lang| gnu2iso(lang.trim())) {
            if !culture.is_empty() {
                attrs.push(TrString::new(ATTR_CULTURE, culture));
            }
        }
        if let Some(plurals) = self.metadata.get("Plural-Forms") {
            attrs.push(TrString::new(ATTR_PLURALS, plurals.trim()));
        }
        if let Some(language) = language {
            attrs.push(TrString::new(ATTR_LANGUAGE, language));
        }
        attrs.sort_by_key(|attr| attr.id);
        attrs
    }
}

impl From<rspolib::MOFile> for Catalog {
    fn from(mofile: rspolib::MOFile) -> Self {
        Catalog::new(
            mofile.entries.into_iter().map(
                |rspolib::MOEntry {
                     msgstr,
                     msgstr_plural,
                     msgctxt,
                     ..
                 }| POMOEntry {
                    msgstr,
                    msgstr_plural,
                    msgctxt,
                },
            ),
            mofile.metadata,
        )
    }
}

impl From<rspolib::POFile> for Catalog {
    fn from(pofile: rspolib::POFile) -> Self {
        Catalog::new(
            pofile.entries.into_iter().map(
                |rspolib::POEntry {
                     msgstr,
                     msgstr_plural,
                     msgctxt,
                     ..
                 }| POMOEntry {
                    msgstr,
                    msgstr_plural,
                    msgctxt,
                },
            ),
            pofile.metadata,
        )
    }
}

/// `pl_PL.UTF-8` becomes `pl-PL`.
pub fn gnu2iso(lang: &str) -> String {
    let end = lang.find('.').unwrap_or(lang.len());
    lang[..end].replace('_', "-")
}

/// Replaces letters with accented look-alikes, for spotting untranslated strings.
pub fn warp(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a' => 'ȧ',
            'b' => 'Ƌ',
            'c' => 'ç',
            'd' => 'đ',
            'e' => 'ê',
            'f' => 'ƒ',
            'g' => 'ğ',
            'h' => 'ĥ',
            'i' => 'ï',
            'j' => 'ĵ',
            'k' => 'ķ',
            'l' => 'ĺ',
            'n' => 'ñ',
            'o' => 'ô',
            'r' => 'ȓ',
            's' => 'ş',
            't' => 'ŧ',
            'u' => 'ũ',
            'w' => 'ŵ',
            'y' => 'ÿ',
            'z' => 'ȥ',
            'A' => 'Ä',
            'B' => 'ß',
            'C' => 'Ç',
            'D' => 'Ð',
            'E' => 'Ȅ',
            'F' => 'Ƒ',
            'G' => 'Ġ',
            'H' => 'Ħ',
            'I' => 'Í',
            'J' => 'Ĵ',
            'K' => 'Ķ',
            'L' => 'Ƚ',
            'N' => 'Ñ',
            'O' => 'Ö',
            'R' => 'Ŕ',
            'S' => 'Ş',
            'T' => 'Ⱦ',
            'U' => 'Ù',
            'W' => 'Ŵ',
            'Y' => 'Ý',
            'Z' => 'Ȥ',
            '"' => '?',
            other => other,
        })
        .collect()
}
