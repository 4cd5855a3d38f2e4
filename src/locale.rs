// src/locale.rs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a repository encodes the language of a content file.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Convention {
    /// `content/fr/post.md`: one path segment is the language code.
    #[default]
    #[serde(alias = "folder/")]
    #[value(alias = "folder/")]
    DirectorySegment,
    /// `content/post.fr.md`: the second-to-last suffix is the language code.
    #[serde(alias = ".lang")]
    #[value(alias = ".lang")]
    SuffixTag,
}

impl Convention {
    pub fn as_str(self) -> &'static str {
        match self {
            Convention::DirectorySegment => "directory-segment",
            Convention::SuffixTag => "suffix-tag",
        }
    }
}

/// ISO 639-1 two-letter codes, the pool used when none is configured.
const ISO_639_1: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg",
    "bh", "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv",
    "cy", "da", "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi",
    "fj", "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr",
    "ht", "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja",
    "jv", "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw",
    "ky", "la", "lb", "lg", "li", "ln", "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml",
    "mn", "mr", "ms", "mt", "my", "na", "nb", "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv",
    "ny", "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "ps", "pt", "qu", "rm", "rn", "ro",
    "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk", "sl", "sm", "sn", "so", "sq", "sr",
    "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to", "tr",
    "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh", "yi",
    "yo", "za", "zh", "zu",
];

/// Immutable set of recognized language codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePool {
    codes: BTreeSet<String>,
    explicit: bool,
}

impl LanguagePool {
    /// Every ISO 639-1 code; placeholders later come from observed languages.
    pub fn iso639() -> Self {
        Self {
            codes: ISO_639_1.iter().map(|code| code.to_string()).collect(),
            explicit: false,
        }
    }

    /// A user-chosen pool, which also defines the expected languages per basefile.
    pub fn explicit<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            explicit: true,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn codes(&self) -> &BTreeSet<String> {
        &self.codes
    }
}

/// Path Classifier: maps a repository-relative path to (basefile, language).
#[derive(Debug, Clone)]
pub struct Classifier {
    convention: Convention,
    pool: LanguagePool,
}

impl Classifier {
    pub fn new(convention: Convention, pool: LanguagePool) -> Self {
        Self { convention, pool }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn pool(&self) -> &LanguagePool {
        &self.pool
    }

    pub fn classify(&self, path: &str) -> Result<(String, String)> {
        classify(path, self.convention, &self.pool)
    }
}

pub fn classify(path: &str, convention: Convention, pool: &LanguagePool) -> Result<(String, String)> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((filename, dirs)) = segments.split_last() else {
        return Err(Error::classification(path, "empty path"));
    };

    match convention {
        Convention::DirectorySegment => dirs
            .iter()
            .find(|segment| pool.contains(segment))
            .map(|lang| (filename.to_string(), lang.to_string()))
            .ok_or_else(|| Error::classification(path, "no directory names a known language")),
        Convention::SuffixTag => {
            let parts: Vec<&str> = filename.split('.').collect();
            if parts.len() < 3 {
                return Err(Error::classification(
                    path,
                    "filename has no language suffix",
                ));
            }
            let lang_idx = parts.len() - 2;
            let lang = parts[lang_idx];
            if !pool.contains(lang) {
                return Err(Error::classification(
                    path,
                    format!("suffix `{lang}` is not a known language"),
                ));
            }
            let basefile = parts
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != lang_idx)
                .map(|(_, part)| *part)
                .collect::<Vec<_>>()
                .join(".");
            Ok((basefile, lang.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> LanguagePool {
        LanguagePool::explicit(["en", "fr", "zh"])
    }

    #[test]
    fn directory_segment_uses_filename_as_basefile() {
        let got = classify("content/fr/blog/post.md", Convention::DirectorySegment, &pool()).unwrap();
        assert_eq!(got, ("post.md".to_string(), "fr".to_string()));
    }

    #[test]
    fn directory_segment_without_language_fails() {
        let err = classify("content/blog/post.md", Convention::DirectorySegment, &pool()).unwrap_err();
        assert!(matches!(err, Error::Classification { ref path, .. } if path == "content/blog/post.md"));
    }

    #[test]
    fn directory_segment_ignores_filename() {
        assert!(classify("content/en", Convention::DirectorySegment, &pool()).is_err());
    }

    #[test]
    fn suffix_tag_strips_language() {
        let got = classify("content/file.fr.md", Convention::SuffixTag, &pool()).unwrap();
        assert_eq!(got, ("file.md".to_string(), "fr".to_string()));

        let got = classify("content/my.notes.zh.md", Convention::SuffixTag, &pool()).unwrap();
        assert_eq!(got, ("my.notes.md".to_string(), "zh".to_string()));
    }

    #[test]
    fn suffix_tag_rejects_unknown_or_missing_suffix() {
        assert!(classify("content/file.md", Convention::SuffixTag, &pool()).is_err());
        assert!(classify("content/file.de.md", Convention::SuffixTag, &pool()).is_err());
    }

    #[test]
    fn iso_pool_is_not_explicit() {
        let pool = LanguagePool::iso639();
        assert!(!pool.is_explicit());
        assert!(pool.contains("ja"));
        assert!(!pool.contains("content"));
        assert_eq!(pool.codes().len(), ISO_639_1.len());
    }

    #[test]
    fn legacy_convention_names_deserialize() {
        #[derive(Deserialize)]
        struct Wrap {
            convention: Convention,
        }
        let w: Wrap = toml::from_str("convention = \"folder/\"").unwrap();
        assert_eq!(w.convention, Convention::DirectorySegment);
        let w: Wrap = toml::from_str("convention = \".lang\"").unwrap();
        assert_eq!(w.convention, Convention::SuffixTag);
        let w: Wrap = toml::from_str("convention = \"suffix-tag\"").unwrap();
        assert_eq!(w.convention, Convention::SuffixTag);
    }
}
