// src/rename.rs

use crate::error::{Error, Result};

const RENAME_SIGN: &str = " => ";

/// Splits a diffstat path into (original, renamed). Plain paths come back
/// unchanged with no rename.
///
/// Accepts both shapes git prints: `dir/{old => new}/file.md` and
/// `old/file.md => new/file.md`.
pub fn resolve_rename(raw: &str) -> Result<(String, Option<String>)> {
    let markers = raw.matches(RENAME_SIGN).count();
    if markers == 0 {
        return Ok((raw.to_string(), None));
    }
    if markers > 1 || raw.matches('{').count() > 1 || raw.matches('}').count() > 1 {
        return Err(Error::parse(raw, "more than one rename marker"));
    }

    if let (Some(open), Some(close)) = (raw.find('{'), raw.find('}')) {
        if open > close {
            return Err(Error::parse(raw, "unbalanced braces"));
        }
        let inner = &raw[open + 1..close];
        let Some((old, new)) = inner.split_once(RENAME_SIGN) else {
            return Err(Error::parse(raw, "rename marker outside braces"));
        };
        let (prefix, suffix) = (&raw[..open], &raw[close + 1..]);
        let original = join_parts(prefix, old.trim(), suffix);
        let renamed = join_parts(prefix, new.trim(), suffix);
        return Ok((original, Some(renamed)));
    }

    if raw.contains('{') || raw.contains('}') {
        return Err(Error::parse(raw, "unbalanced braces"));
    }
    let (old, new) = raw
        .split_once(RENAME_SIGN)
        .ok_or_else(|| Error::parse(raw, "missing rename marker"))?;
    Ok((old.trim().to_string(), Some(new.trim().to_string())))
}

/// Reassembles a path around one side of a bracketed rename. An empty side
/// (`{ => sub}`) must not leave a doubled separator behind.
fn join_parts(prefix: &str, middle: &str, suffix: &str) -> String {
    let joined = format!("{prefix}{middle}{suffix}");
    let mut out = String::with_capacity(joined.len());
    for ch in joined.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out.trim_start_matches('/').to_string()
}

/// Formats a rename the way `git diff --stat` does, factoring out the common
/// directory prefix and suffix.
pub fn rename_annotation(old: &str, new: &str) -> String {
    let prefix_len = common_prefix_dirs(old, new);
    let suffix_len = common_suffix_dirs(&old[prefix_len..], &new[prefix_len..]);

    if prefix_len == 0 && suffix_len == 0 {
        return format!("{old}{RENAME_SIGN}{new}");
    }

    let old_mid = &old[prefix_len..old.len() - suffix_len];
    let new_mid = &new[prefix_len..new.len() - suffix_len];
    format!(
        "{}{{{}{}{}}}{}",
        &old[..prefix_len],
        old_mid,
        RENAME_SIGN,
        new_mid,
        &old[old.len() - suffix_len..]
    )
}

/// Length of the shared leading directories, including the trailing `/`.
fn common_prefix_dirs(a: &str, b: &str) -> usize {
    let mut len = 0;
    for ((idx, ca), cb) in a.char_indices().zip(b.chars()) {
        if ca != cb {
            break;
        }
        if ca == '/' {
            len = idx + 1;
        }
    }
    len
}

/// Length of the shared trailing directories, including the leading `/`.
fn common_suffix_dirs(a: &str, b: &str) -> usize {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let mut len = 0;
    let mut matched = 0;
    while matched < ab.len() && matched < bb.len() {
        let ca = ab[ab.len() - 1 - matched];
        if ca != bb[bb.len() - 1 - matched] {
            break;
        }
        matched += 1;
        if ca == b'/' {
            len = matched;
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_is_not_a_rename() {
        let got = resolve_rename("content/en/post.md").unwrap();
        assert_eq!(got, ("content/en/post.md".to_string(), None));
    }

    #[test]
    fn bracketed_rename() {
        let (old, new) = resolve_rename("content/{en => fr}/post.md").unwrap();
        assert_eq!(old, "content/en/post.md");
        assert_eq!(new.as_deref(), Some("content/fr/post.md"));
    }

    #[test]
    fn bracketed_rename_with_empty_side() {
        let (old, new) = resolve_rename("content/{ => en}/post.md").unwrap();
        assert_eq!(old, "content/post.md");
        assert_eq!(new.as_deref(), Some("content/en/post.md"));
    }

    #[test]
    fn whole_path_rename() {
        let (old, new) = resolve_rename("docs/a.md => content/en/a.md").unwrap();
        assert_eq!(old, "docs/a.md");
        assert_eq!(new.as_deref(), Some("content/en/a.md"));
    }

    #[test]
    fn multiple_markers_are_ambiguous() {
        let err = resolve_rename("a/{b => c}/{d => e}/f.md").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(resolve_rename("a => b => c").is_err());
    }

    #[test]
    fn annotation_matches_git_diffstat() {
        assert_eq!(
            rename_annotation("content/en/old.md", "content/en/new.md"),
            "content/en/{old.md => new.md}"
        );
        assert_eq!(
            rename_annotation("content/en/post.md", "content/fr/post.md"),
            "content/{en => fr}/post.md"
        );
        assert_eq!(rename_annotation("a.md", "b.md"), "a.md => b.md");
    }

    #[test]
    fn annotation_resolves_back() {
        for (old, new) in [
            ("content/en/old.md", "content/en/new.md"),
            ("content/post.md", "content/en/post.md"),
            ("docs/x/a.md", "content/en/a.md"),
        ] {
            let (o, n) = resolve_rename(&rename_annotation(old, new)).unwrap();
            assert_eq!(o, old);
            assert_eq!(n.as_deref(), Some(new));
        }
    }
}
