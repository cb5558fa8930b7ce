use crate::catalog::{warp, Catalog};
use lngs::writer::{File, TrString};
use lngs::{LangFile, Strings};

#[derive(Debug, Clone, Default)]
pub struct MakeOptions {
    /// Value of the `LANGUAGE` attribute.
    pub language: Option<String>,
    /// Store a warped copy of the original text for missing translations.
    pub warp: bool,
    /// Copy the keys section of the reference file.
    pub with_keys: bool,
}

/// Builds the language file for `catalog`.
///
/// `reference` is a language file with keys, usually the one of the original language; its
/// serial and identifiers are used for the result.
pub fn make(reference: &LangFile, catalog: &Catalog, options: &MakeOptions) -> File {
    let mut file = File::new(reference.serial());
    file.attrs = catalog.attributes(options.language.as_deref());

    let mut missing = 0;
    for (id, original) in reference.strings() {
        let key = reference.get_key(id);
        if key.is_empty() {
            tracing::warn!(id, "string without a key in the reference file");
            continue;
        }
        match catalog.get(key) {
            Some(translation) => file.strings.push(TrString::new(id, translation)),
            None => {
                missing += 1;
                tracing::warn!(key, "translation missing");
                if options.warp {
                    let singular = original.split(|&b| b == 0).next().unwrap_or_default();
                    let singular = String::from_utf8_lossy(singular);
                    file.strings.push(TrString::new(id, warp(&singular)));
                }
            }
        }
    }

    if options.with_keys {
        file.keys = reference
            .keys()
            .map(|(id, key)| TrString::new(id, key))
            .collect();
    }

    tracing::info!(
        serial = file.serial,
        translated = file.strings.len() - if options.warp { missing } else { 0 },
        missing,
        "language file ready"
    );
    file
}
