use lngs::{LangFile, ATTR_CULTURE, ATTR_LANGUAGE, ATTR_PLURALS};
use std::io::prelude::*;

fn attr_name(id: u32) -> Option<&'static str> {
    match id {
        ATTR_CULTURE => Some("Culture"),
        ATTR_LANGUAGE => Some("Language"),
        ATTR_PLURALS => Some("Plural-Forms"),
        _ => None,
    }
}

/// Describes the content of a language file.
pub fn describe<W: Write>(mut output: W, file: &LangFile) -> std::io::Result<()> {
    writeln!(output, "serial: {}", file.serial())?;
    for (id, value) in file.attrs() {
        let value = String::from_utf8_lossy(value);
        match attr_name(id) {
            Some(name) => writeln!(output, "{}: {}", name, value)?,
            None => writeln!(output, "attribute {}: {}", id, value)?,
        }
    }

    let forms = file.plural_forms();
    match &forms.plural {
        Some(plural) => writeln!(
            output,
            "plural rule: nplurals={}; plural={}",
            forms.nplurals, plural
        )?,
        None => writeln!(output, "plural rule: none")?,
    }

    let plurals = file.strings().filter(|(_, s)| s.contains(&0)).count();
    writeln!(output, "strings: {} ({} with plurals)", file.size(), plurals)?;
    writeln!(output, "keys: {}", file.keys().count())
}
