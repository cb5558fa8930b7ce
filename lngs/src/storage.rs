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

//! Where language files come from.
//!
//! A [`FileBased`] storage loads the file of one language from a directory laid out by a
//! [`PathManager`], a [`Builtin`] storage serves a file embedded in the executable, and
//! [`WithFallback`] stacks two storages so that strings missing from a partial translation
//! still show up, in the original language.
//!
//! ```no_run
//! use lngs::storage::{Builtin, FileBased, SubdirPath, WithFallback};
//! use lngs::{locale, Strings};
//!
//! static ENGLISH: &[u8] = &[/* include_bytes!("app.en.lng") */];
//!
//! let mut translation = FileBased::new(SubdirPath::new("/usr/share/app/locale", "app.lng"));
//! translation.open_first_of(locale::system_locales(), Some(1));
//! let mut builtin = Builtin::new(ENGLISH);
//! builtin.init().unwrap();
//!
//! let strings = WithFallback::new(translation, builtin);
//! println!("{}", strings.get_string(1000));
//! ```

use crate::{Error, FormatError, LangFile, Result, Strings, ATTR_CULTURE, ATTR_LANGUAGE};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maps language tags to file paths.
pub trait PathManager {
    /// The path of the file for `lang`.
    fn expand(&self, lang: &str) -> PathBuf;
    /// All existing files that look like they belong to this layout.
    fn known(&self) -> Vec<PathBuf>;
}

fn dir_entries(base: &Path) -> impl Iterator<Item = PathBuf> {
    fs::read_dir(base)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
}

/// `<base>/<lang>/<file_name>`
#[derive(Debug, Clone)]
pub struct SubdirPath {
    base: PathBuf,
    file_name: String,
}

impl SubdirPath {
    pub fn new(base: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            file_name: file_name.into(),
        }
    }
}

impl PathManager for SubdirPath {
    fn expand(&self, lang: &str) -> PathBuf {
        self.base.join(lang).join(&self.file_name)
    }

    fn known(&self) -> Vec<PathBuf> {
        let mut out: Vec<_> = dir_entries(&self.base)
            .filter(|path| path.is_dir())
            .map(|dir| dir.join(&self.file_name))
            .filter(|path| path.is_file())
            .collect();
        out.sort();
        out
    }
}

/// `<base>/<file_name>.<lang>`
#[derive(Debug, Clone)]
pub struct ExtensionPath {
    base: PathBuf,
    file_name: String,
}

impl ExtensionPath {
    pub fn new(base: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            file_name: file_name.into(),
        }
    }
}

impl PathManager for ExtensionPath {
    fn expand(&self, lang: &str) -> PathBuf {
        self.base.join(format!("{}.{}", self.file_name, lang))
    }

    fn known(&self) -> Vec<PathBuf> {
        let mut out: Vec<_> = dir_entries(&self.base)
            .filter(|path| path.is_file())
            .filter(|path| path.file_stem() == Some(OsStr::new(&self.file_name)))
            .collect();
        out.sort();
        out
    }
}

/// A language available on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Culture {
    /// The `CULTURE` attribute, e.g. `pl-PL`.
    pub lang: String,
    /// The `LANGUAGE` attribute, the name of the language in that language.
    pub name: String,
}

type Listener = Box<dyn Fn() + Send + Sync>;

/// Strings of one language, loaded from a file.
///
/// Update listeners are called after every attempt to open a file, including failed ones, so
/// that a user interface can refresh its texts.
pub struct FileBased<P> {
    paths: P,
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
    file: LangFile<'static>,
    listeners: BTreeMap<u32, Listener>,
    last_token: u32,
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

impl<P: PathManager> FileBased<P> {
    pub fn new(paths: P) -> Self {
        Self {
            paths,
            path: None,
            modified: None,
            file: LangFile::new(),
            listeners: BTreeMap::new(),
            last_token: 0xba5e_0000,
        }
    }

    pub fn path_manager(&self) -> &P {
        &self.paths
    }

    /// The currently loaded file, closed if the last `open` failed.
    pub fn file(&self) -> &LangFile<'static> {
        &self.file
    }

    /// Loads the file of `lang`.
    ///
    /// With `Some(serial)`, files built from a different revision of the strings are rejected.
    pub fn open(&mut self, lang: &str, serial: Option<u32>) -> Result<()> {
        let path = self.paths.expand(lang);
        self.file.close();
        self.modified = None;

        let result = self.load(&path, serial);
        match &result {
            Ok(()) => tracing::info!(lang, path = %path.display(), "loaded language file"),
            Err(Error::Io(err)) => {
                tracing::debug!(lang, path = %path.display(), error = %err, "no language file");
            }
            Err(err) => {
                tracing::warn!(lang, path = %path.display(), error = %err, "rejected language file");
            }
        }

        self.path = Some(path);
        self.notify();
        result
    }

    fn load(&mut self, path: &Path, serial: Option<u32>) -> Result<()> {
        let modified = modification_time(path);
        let file = LangFile::from_bytes(fs::read(path)?)?;
        if let Some(expected) = serial {
            if file.serial() != expected {
                return Err(Error::SerialMismatch {
                    expected,
                    found: file.serial(),
                });
            }
        }
        self.file = file;
        self.modified = modified;
        Ok(())
    }

    /// Opens the first language of `langs` which has a usable file.
    pub fn open_first_of<I, S>(&mut self, langs: I, serial: Option<u32>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        langs
            .into_iter()
            .any(|lang| self.open(lang.as_ref(), serial).is_ok())
    }

    /// Whether the file last opened was not modified since.
    pub fn fresh(&self) -> bool {
        self.path.as_deref().and_then(modification_time) == self.modified
    }

    /// Lists the languages with a valid file whose `CULTURE` matches its location.
    pub fn known(&self) -> Vec<Culture> {
        self.paths
            .known()
            .into_iter()
            .filter_map(|path| {
                let data = fs::read(&path).ok()?;
                let file = LangFile::from_bytes(data).ok()?;
                let culture = Culture {
                    lang: file.get_attr(ATTR_CULTURE).to_owned(),
                    name: file.get_attr(ATTR_LANGUAGE).to_owned(),
                };
                if self.paths.expand(&culture.lang) != path {
                    tracing::debug!(
                        path = %path.display(),
                        lang = %culture.lang,
                        "misplaced language file"
                    );
                    return None;
                }
                Some(culture)
            })
            .collect()
    }

    /// Registers a callback run after each `open`. Returns the token for
    /// [`FileBased::remove_onupdate`], never `0`.
    pub fn add_onupdate(&mut self, listener: impl Fn() + Send + Sync + 'static) -> u32 {
        self.last_token = self.last_token.wrapping_add(1);
        if self.last_token == 0 {
            self.last_token = 1;
        }
        self.listeners.insert(self.last_token, Box::new(listener));
        self.last_token
    }

    pub fn remove_onupdate(&mut self, token: u32) {
        self.listeners.remove(&token);
    }

    fn notify(&self) {
        for listener in self.listeners.values() {
            listener();
        }
    }
}

impl<P> Strings for FileBased<P> {
    fn get_string(&self, id: u32) -> &str {
        self.file.get_string(id)
    }

    fn get_plural_string(&self, id: u32, count: i64) -> &str {
        self.file.get_plural_string(id, count)
    }

    fn get_attr(&self, id: u32) -> &str {
        self.file.get_attr(id)
    }

    fn get_key(&self, id: u32) -> &str {
        self.file.get_key(id)
    }

    fn find_key(&self, key: &str) -> Option<u32> {
        self.file.find_key(key)
    }
}

/// Strings embedded in the executable, typically with `include_bytes!`.
#[derive(Debug)]
pub struct Builtin {
    resource: &'static [u8],
    file: LangFile<'static>,
}

impl Builtin {
    /// A storage for `resource`; nothing is readable before [`Builtin::init`].
    pub fn new(resource: &'static [u8]) -> Self {
        Self {
            resource,
            file: LangFile::new(),
        }
    }

    pub fn init(&mut self) -> std::result::Result<(), FormatError> {
        self.file.open(self.resource)
    }

    pub fn file(&self) -> &LangFile<'static> {
        &self.file
    }
}

impl Strings for Builtin {
    fn get_string(&self, id: u32) -> &str {
        self.file.get_string(id)
    }

    fn get_plural_string(&self, id: u32, count: i64) -> &str {
        self.file.get_plural_string(id, count)
    }

    fn get_attr(&self, id: u32) -> &str {
        self.file.get_attr(id)
    }

    fn get_key(&self, id: u32) -> &str {
        self.file.get_key(id)
    }

    fn find_key(&self, key: &str) -> Option<u32> {
        self.file.find_key(key)
    }
}

/// Looks strings up in `primary` first, then in `fallback`.
#[derive(Debug, Default)]
pub struct WithFallback<A, B> {
    pub primary: A,
    pub fallback: B,
}

impl<A, B> WithFallback<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

fn or_else<'a>(value: &'a str, fallback: impl FnOnce() -> &'a str) -> &'a str {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

impl<A: Strings, B: Strings> Strings for WithFallback<A, B> {
    fn get_string(&self, id: u32) -> &str {
        or_else(self.primary.get_string(id), || self.fallback.get_string(id))
    }

    fn get_plural_string(&self, id: u32, count: i64) -> &str {
        or_else(self.primary.get_plural_string(id, count), || {
            self.fallback.get_plural_string(id, count)
        })
    }

    fn get_attr(&self, id: u32) -> &str {
        or_else(self.primary.get_attr(id), || self.fallback.get_attr(id))
    }

    fn get_key(&self, id: u32) -> &str {
        or_else(self.primary.get_key(id), || self.fallback.get_key(id))
    }

    fn find_key(&self, key: &str) -> Option<u32> {
        self.primary
            .find_key(key)
            .or_else(|| self.fallback.find_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{File, TrString};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn lang_file(serial: u32, culture: &str, name: &str, strings: &[(u32, &str)]) -> Vec<u8> {
        let mut file = File::new(serial);
        file.attrs.push(TrString::new(ATTR_CULTURE, culture));
        file.attrs.push(TrString::new(ATTR_LANGUAGE, name));
        for &(id, value) in strings {
            file.strings.push(TrString::new(id, value));
        }
        file.to_vec().unwrap()
    }

    fn install(paths: &impl PathManager, lang: &str, data: &[u8]) -> PathBuf {
        let path = paths.expand(lang);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        path
    }

    fn setup() -> (tempfile::TempDir, SubdirPath) {
        let dir = tempfile::tempdir().unwrap();
        let paths = SubdirPath::new(dir.path(), "app.lng");
        install(&paths, "pl", &lang_file(3, "pl", "polski", &[(1, "Plik")]));
        install(&paths, "en", &lang_file(3, "en", "English", &[(1, "File")]));
        (dir, paths)
    }

    #[test]
    fn path_layouts() {
        let subdir = SubdirPath::new("/base", "app.lng");
        assert_eq!(subdir.expand("de-DE"), Path::new("/base/de-DE/app.lng"));
        let extension = ExtensionPath::new("/base", "app");
        assert_eq!(extension.expand("de-DE"), Path::new("/base/app.de-DE"));
    }

    #[test]
    fn open_first_of() {
        let (_dir, paths) = setup();
        let mut storage = FileBased::new(paths);
        assert!(storage.open_first_of(["de-DE", "de", "pl", "en"], Some(3)));
        assert_eq!(storage.get_attr(ATTR_CULTURE), "pl");
        assert_eq!(storage.get_string(1), "Plik");

        assert!(!storage.open_first_of(["de-DE", "de"], None));
        assert!(!storage.file().is_open());
        assert_eq!(storage.get_string(1), "");
    }

    #[test]
    fn open_errors() {
        let (_dir, paths) = setup();
        let mut storage = FileBased::new(paths);

        match storage.open("pl", Some(4)) {
            Err(Error::SerialMismatch { expected, found }) => {
                assert_eq!((expected, found), (4, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!storage.file().is_open());

        assert!(matches!(storage.open("xx", None), Err(Error::Io(_))));

        let path = storage.path_manager().expand("bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"LANG").unwrap();
        assert!(matches!(storage.open("bad", None), Err(Error::Format(_))));
        assert!(!storage.fresh());

        storage.open("en", None).unwrap();
        assert_eq!(storage.get_string(1), "File");
    }

    #[test]
    fn listeners() {
        let (_dir, paths) = setup();
        let mut storage = FileBased::new(paths);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let first = storage.add_onupdate(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = calls.clone();
        let second = storage.add_onupdate(move || {
            counter.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(first, 0xba5e_0001);
        assert_eq!(second, 0xba5e_0002);

        storage.open("pl", None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        // failures are reported too
        assert!(storage.open("xx", None).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 22);

        storage.remove_onupdate(second);
        storage.remove_onupdate(12345);
        storage.open("en", None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 23);
    }

    #[test]
    fn known_cultures() {
        let (_dir, paths) = setup();
        install(&paths, "xx", &lang_file(3, "pl", "polski", &[]));
        install(&paths, "yy", b"not a language file");
        fs::create_dir_all(paths.expand("zz").parent().unwrap()).unwrap();

        let storage = FileBased::new(paths);
        assert_eq!(
            storage.known(),
            vec![
                Culture {
                    lang: "en".into(),
                    name: "English".into()
                },
                Culture {
                    lang: "pl".into(),
                    name: "polski".into()
                },
            ]
        );
    }

    #[test]
    fn known_with_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ExtensionPath::new(dir.path(), "app");
        install(&paths, "de-AT", &lang_file(1, "de-AT", "Deutsch", &[]));
        install(&paths, "fr", &lang_file(1, "fr", "français", &[]));
        fs::write(dir.path().join("other.fr"), lang_file(1, "fr", "français", &[])).unwrap();

        let storage = FileBased::new(paths);
        let langs: Vec<_> = storage.known().into_iter().map(|c| c.lang).collect();
        assert_eq!(langs, vec!["de-AT", "fr"]);
    }

    #[test]
    fn freshness() {
        let (_dir, paths) = setup();
        let mut storage = FileBased::new(paths);
        assert!(storage.fresh());
        storage.open("pl", None).unwrap();
        assert!(storage.fresh());

        let path = storage.path_manager().expand("pl");
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        assert!(!storage.fresh());

        storage.open("pl", None).unwrap();
        assert!(storage.fresh());
    }

    #[test]
    fn builtin_fallback() {
        let english: &'static [u8] = Box::leak(
            lang_file(3, "en", "English", &[(1, "File"), (2, "Open"), (3, "one\0many")])
                .into_boxed_slice(),
        );
        let mut builtin = Builtin::new(english);
        assert_eq!(builtin.get_string(1), "");
        builtin.init().unwrap();

        let (_dir, paths) = setup();
        let mut translation = FileBased::new(paths);
        translation.open("pl", None).unwrap();

        let strings = WithFallback::new(translation, builtin);
        assert_eq!(strings.get_string(1), "Plik");
        assert_eq!(strings.get_string(2), "Open");
        // the built-in file has a single plural form
        assert_eq!(strings.get_plural_string(3, 5), "one");
        assert_eq!(strings.get_string(4), "");
        assert_eq!(strings.get_attr(ATTR_LANGUAGE), "polski");
        assert_eq!(strings.find_key("OPEN"), None);
    }

    #[test]
    fn broken_builtin() {
        let mut builtin = Builtin::new(b"LANG");
        assert_eq!(builtin.init(), Err(FormatError::TooShort(4)));
        assert!(!builtin.file().is_open());
    }
}
