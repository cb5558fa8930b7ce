use chrono::{DateTime, Datelike, TimeZone};
use lngs::LangFile;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::io::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct OutputDetails {
    pub copyright_holder: Option<String>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub bugs_address: Option<String>,
}

struct Message<'a> {
    key: Cow<'a, str>,
    msgid: Cow<'a, str>,
    plural: Option<Cow<'a, str>>,
}

/// Writes a GetText template with one entry per key of `reference`.
pub fn generate<W, Tz>(
    mut output: W,
    details: &OutputDetails,
    reference: &LangFile,
    now: &DateTime<Tz>,
) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let values: HashMap<u32, &[u8]> = reference.strings().collect();
    let mut messages: Vec<_> = reference
        .keys()
        .filter_map(|(id, key)| {
            let mut variants = values.get(&id)?.split(|&b| b == 0);
            Some(Message {
                key: String::from_utf8_lossy(key),
                msgid: String::from_utf8_lossy(variants.next().unwrap_or_default()),
                plural: variants.next().map(String::from_utf8_lossy),
            })
        })
        .collect();
    messages.sort_by(|a, b| a.key.cmp(&b.key));

    let has_plurals = messages.iter().any(|m| m.plural.is_some());
    write_header(&mut output, details, now, has_plurals)?;

    for m in messages {
        writeln!(output)?;
        writeln!(output, "msgctxt {}", escape(&m.key))?;
        writeln!(output, "msgid {}", escape(&m.msgid))?;
        if let Some(plural) = m.plural {
            writeln!(output, "msgid_plural {}", escape(&plural))?;
            writeln!(output, "msgstr[0] \"\"")?;
            writeln!(output, "msgstr[1] \"\"")?;
        } else {
            writeln!(output, "msgstr \"\"")?;
        }
    }
    Ok(())
}

fn write_header<W, Tz>(
    output: &mut W,
    details: &OutputDetails,
    now: &DateTime<Tz>,
    has_plurals: bool,
) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let package = details.package_name.as_deref().unwrap_or("PACKAGE");
    writeln!(
        output,
        "# Copyright (C) {} {}",
        now.year(),
        details
            .copyright_holder
            .as_deref()
            .unwrap_or("THE PACKAGE'S COPYRIGHT HOLDER")
    )?;
    writeln!(
        output,
        "# This file is distributed under the same license as the {} package.",
        package
    )?;
    writeln!(output, "# FIRST AUTHOR <EMAIL@ADDRESS>, {}.", now.year())?;
    writeln!(output, "#")?;
    writeln!(output, "#, fuzzy")?;
    writeln!(output, "msgid \"\"")?;
    writeln!(output, "msgstr \"\"")?;
    writeln!(
        output,
        "\"Project-Id-Version: {} {}\\n\"",
        package,
        details.package_version.as_deref().unwrap_or("VERSION")
    )?;
    writeln!(
        output,
        "\"Report-Msgid-Bugs-To: {}\\n\"",
        details.bugs_address.as_deref().unwrap_or_default()
    )?;
    writeln!(
        output,
        "\"POT-Creation-Date: {}\\n\"",
        now.format("%Y-%m-%d %H:%M%z")
    )?;
    writeln!(output, "\"PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE\\n\"")?;
    writeln!(output, "\"Last-Translator: FULL NAME <EMAIL@ADDRESS>\\n\"")?;
    writeln!(output, "\"Language-Team: LANGUAGE <LL@li.org>\\n\"")?;
    writeln!(output, "\"Language: \\n\"")?;
    writeln!(output, "\"MIME-Version: 1.0\\n\"")?;
    writeln!(output, "\"Content-Type: text/plain; charset=UTF-8\\n\"")?;
    writeln!(output, "\"Content-Transfer-Encoding: 8bit\\n\"")?;
    if has_plurals {
        writeln!(output, "\"Plural-Forms: nplurals=2; plural=(n != 1);\\n\"")?;
    }
    Ok(())
}

fn escape(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\")
            .replace('\"', "\\\"")
            .replace('\t', "\\t")
            .replace('\r', "\\r")
            .replace('\n', "\\n\"\n\"")
    )
}
