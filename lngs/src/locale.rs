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

//! Ordered lists of languages to try.
//!
//! All functions return BCP 47-like tags (`pl-PL`, `en`) ordered from the most to the least
//! preferred, with each tag followed by its shorter parents, and always ending with `en` if
//! nothing earlier named it. The list is meant for [`FileBased::open_first_of`].
//!
//! [`FileBased::open_first_of`]: crate::storage::FileBased::open_first_of

/// Appends `locale` and its parents, stopping at the first one already present.
fn append_locale(out: &mut Vec<String>, locale: &str) {
    let mut candidate = locale;
    while !candidate.is_empty() && !out.iter().any(|known| known == candidate) {
        out.push(candidate.to_owned());
        match candidate.rfind('-') {
            Some(pos) => candidate = &candidate[..pos],
            None => break,
        }
    }
}

/// `["de-AT", "pl"]` becomes `["de-AT", "de", "pl", "en"]`.
pub fn expand_locales<I, S>(langs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for lang in langs {
        append_locale(&mut out, lang.as_ref());
    }
    append_locale(&mut out, "en");
    out
}

/// The languages of the user, from `LANGUAGE`, `LC_ALL`, `LC_MESSAGES` and `LANG`.
pub fn system_locales() -> Vec<String> {
    let locales = locales_from(|name| std::env::var(name).ok());
    tracing::debug!(?locales, "system locales");
    locales
}

fn is_c_locale(value: &str) -> bool {
    ["C", "POSIX"].iter().any(|name| {
        value
            .strip_prefix(name)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

fn locales_from(var: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut langs = Vec::new();
    for name in ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"] {
        let Some(value) = var(name) else { continue };
        if value.is_empty() || is_c_locale(&value) {
            continue;
        }
        // LC_ALL can be a list of all the categories when they differ
        if value.starts_with("LC_") && value.contains(';') && value.contains('=') {
            continue;
        }
        for item in value.split(':') {
            let end = item.find(['.', '@']).unwrap_or(item.len());
            langs.push(item[..end].replace('_', "-"));
        }
    }
    expand_locales(langs)
}

#[derive(Debug)]
struct Range<'a> {
    lang: &'a str,
    quality: u32,
}

/// Thousandths of the `q` parameter: `0.5` is `500`, three decimals at most.
fn quality(value: &str) -> u32 {
    let mut q = 0u32;
    let mut scale = 1000;
    let mut seen_dot = false;
    for c in value.chars() {
        match c {
            '0'..='9' => {
                q = q.saturating_mul(10).saturating_add(c as u32 - '0' as u32);
                if seen_dot {
                    scale /= 10;
                    if scale == 1 {
                        return q;
                    }
                }
            }
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    q.saturating_mul(scale)
}

fn parse_range(item: &str) -> Range<'_> {
    let mut params = item.split(';');
    let lang = params.next().unwrap_or_default().trim();
    let quality = params
        .filter_map(|param| param.split_once('='))
        .filter(|(name, _)| name.trim() == "q")
        .last()
        .map_or(1000, |(_, value)| self::quality(value.trim()));
    Range { lang, quality }
}

/// Inserts the first missing parent after the last range it is a prefix of.
fn insert_parent(langs: &mut Vec<String>) -> bool {
    let missing = langs.iter().find_map(|lang| {
        let parent = &lang[..lang.rfind('-')?];
        (!langs.iter().any(|known| known == parent)).then(|| parent.to_owned())
    });
    let Some(parent) = missing else {
        return false;
    };
    let position = langs
        .iter()
        .rposition(|lang| {
            lang.strip_prefix(parent.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
        })
        .map_or(langs.len(), |pos| pos + 1);
    langs.insert(position, parent);
    true
}

/// The languages of an HTTP `Accept-Language` header.
///
/// Ranges are ordered by their `q` weight, keeping the order of the header for equal
/// weights.
///
/// ```
/// assert_eq!(
///     lngs::locale::http_accept_language("pl-PL, de-AT;q=0.5, pl;q=0.8"),
///     ["pl-PL", "pl", "de-AT", "de", "en"]
/// );
/// ```
pub fn http_accept_language(header: &str) -> Vec<String> {
    let mut ranges: Vec<_> = header
        .split(',')
        .map(parse_range)
        .filter(|range| !range.lang.is_empty())
        .collect();
    ranges.sort_by(|a, b| b.quality.cmp(&a.quality));

    let mut langs: Vec<String> = Vec::with_capacity(ranges.len() + 1);
    for range in ranges {
        if !langs.iter().any(|known| known == range.lang) {
            langs.push(range.lang.to_owned());
        }
    }
    while insert_parent(&mut langs) {}

    if !langs.iter().any(|known| known == "en") {
        langs.push("en".to_owned());
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn expansion() {
        assert_eq!(expand_locales(["en-US-NONISO"]), ["en-US-NONISO", "en-US", "en"]);
        assert_eq!(
            expand_locales(["de-AT", "pl", "de-DE", "en-GB"]),
            ["de-AT", "de", "pl", "de-DE", "en-GB", "en"]
        );
        assert_eq!(expand_locales(["en", "fr"]), ["en", "fr"]);
        assert_eq!(expand_locales(Vec::<String>::new()), ["en"]);
        assert_eq!(expand_locales(["", "pl"]), ["pl", "en"]);
    }

    fn env(vars: &[(&str, &str)]) -> Vec<String> {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        locales_from(|name| vars.get(name).map(|value| value.to_string()))
    }

    #[test]
    fn environment() {
        assert_eq!(env(&[]), ["en"]);
        assert_eq!(env(&[("LANG", "pl_PL.UTF-8")]), ["pl-PL", "pl", "en"]);
        assert_eq!(
            env(&[("LANGUAGE", "de_AT:fr"), ("LANG", "pl_PL.UTF-8")]),
            ["de-AT", "de", "fr", "pl-PL", "pl", "en"]
        );
        assert_eq!(env(&[("LC_ALL", "C"), ("LANG", "C.UTF-8")]), ["en"]);
        assert_eq!(env(&[("LC_ALL", "POSIX"), ("LANG", "sr_RS@latin")]), ["sr-RS", "sr", "en"]);
        assert_eq!(
            env(&[("LC_ALL", "LC_CTYPE=pl_PL;LC_MESSAGES=C"), ("LC_MESSAGES", "fr_CA")]),
            ["fr-CA", "fr", "en"]
        );
        // only "C" itself or "C.<codeset>"
        assert_eq!(env(&[("LANG", "Cy")]), ["Cy", "en"]);
    }

    #[test]
    fn quality_values() {
        assert_eq!(quality("1"), 1000);
        assert_eq!(quality("0.5"), 500);
        assert_eq!(quality("0.25"), 250);
        assert_eq!(quality("0.125"), 125);
        assert_eq!(quality("0.1259"), 125);
        assert_eq!(quality("0"), 0);
        assert_eq!(quality(".5"), 500);
        assert_eq!(quality("0.5x"), 500);
        assert_eq!(quality("zero"), 0);
    }

    #[test]
    fn accept_language() {
        assert_eq!(http_accept_language(""), ["en"]);
        assert_eq!(http_accept_language("en"), ["en"]);
        assert_eq!(
            http_accept_language("da, en-gb;q=0.8, en;q=0.7"),
            ["da", "en-gb", "en"]
        );
        assert_eq!(
            http_accept_language("fr-CH, fr;q=0.9, en;q=0.8, de;q=0.7, *;q=0.5"),
            ["fr-CH", "fr", "en", "de", "*"]
        );
        assert_eq!(
            http_accept_language("pl;q=0.5, de-AT, de-DE;q=0.9, pl"),
            ["de-AT", "pl", "de-DE", "de", "en"]
        );
        assert_eq!(
            http_accept_language("sr-Latn-RS, en-US"),
            ["sr-Latn-RS", "sr-Latn", "sr", "en-US", "en"]
        );
        assert_eq!(
            http_accept_language(" de-AT ; q = 0.3 ;level=1, ,fr"),
            ["fr", "de-AT", "de", "en"]
        );
    }
}
