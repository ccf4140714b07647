use crate::{error::FetchError, release::Asset};
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use regex::Regex;

/// The platforms that get packaged: macOS on ARM64 and x86-64, Linux on x86-64, and Windows on
/// x86-64.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "memos-*-darwin-arm64.tar.gz",
    "memos-*-darwin-x86_64.tar.gz",
    "memos-*-linux-x86_64.tar.gz",
    "memos-*-windows-x86_64.zip",
];

/// The checksum manifest is whichever asset has a name ending with this.
pub const MANIFEST_SUFFIX: &str = "SHA256SUMS.txt";

/// Selects release assets whose names match at least one of a set of shell-style globs.
#[derive(Debug)]
pub(crate) struct AssetMatcher {
    globs: Vec<Glob>,
}

#[derive(Debug)]
struct Glob {
    pattern: String,
    re: Regex,
}

impl AssetMatcher {
    pub(crate) fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let globs = patterns
            .iter()
            .map(|p| Glob::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { globs })
    }

    /// Returns the matching assets in release order. An asset that matches more than one glob is
    /// returned once per matching glob.
    pub(crate) fn matches<'a>(&self, assets: &'a [Asset]) -> Result<Vec<&'a Asset>> {
        let mut matched = vec![];
        for asset in assets {
            for glob in &self.globs {
                if glob.re.is_match(&asset.name) {
                    debug!("asset `{}` matches `{}`", asset.name, glob.pattern);
                    matched.push(asset);
                }
            }
        }

        if matched.is_empty() {
            return Err(FetchError::NoAssetsMatched {
                patterns: self.globs.iter().map(|g| g.pattern.as_str()).join(", "),
                assets: assets.iter().map(|a| a.name.as_str()).join(", "),
            }
            .into());
        }

        Ok(matched)
    }
}

impl Glob {
    fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(&glob_to_regex(pattern)?).map_err(|e| FetchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }
}

// Translates a shell glob into an anchored regex. Asset names are flat, so `*` matches anything,
// including `/`. Supported syntax is `*`, `?`, `[...]` (with `!` or `^` for negation), `{a,b}`
// alternation and `\` to escape the next character. Everything else is literal. A `]` right after
// the opening `[` or its negation marker is part of the class.
fn glob_to_regex(pattern: &str) -> Result<String, FetchError> {
    let invalid = |reason: &str| FetchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut re = String::from("^");
    let mut in_braces = false;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| invalid("trailing `\\`"))?;
                push_literal(&mut re, escaped);
            }
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                let mut class = String::new();
                if chars.next_if(|cc| *cc == '!' || *cc == '^').is_some() {
                    class.push('^');
                }
                let mut first = true;
                let mut closed = false;
                while let Some(cc) = chars.next() {
                    match cc {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = chars.next().ok_or_else(|| invalid("trailing `\\`"))?;
                            if escaped == '-' {
                                class.push_str("\\-");
                            } else {
                                push_class_char(&mut class, escaped);
                            }
                        }
                        _ => push_class_char(&mut class, cc),
                    }
                    first = false;
                }
                if !closed {
                    return Err(invalid("unterminated `[`"));
                }
                re.push('[');
                re.push_str(&class);
                re.push(']');
            }
            '{' if !in_braces => {
                in_braces = true;
                re.push_str("(?:");
            }
            ',' if in_braces => re.push('|'),
            '}' if in_braces => {
                in_braces = false;
                re.push(')');
            }
            _ => push_literal(&mut re, c),
        }
    }
    if in_braces {
        return Err(invalid("unterminated `{`"));
    }
    re.push('$');

    Ok(re)
}

fn push_literal(re: &mut String, c: char) {
    re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
}

// Inside a class only `-` keeps a special meaning. Everything the regex crate treats specially in
// a class is escaped.
fn push_class_char(class: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
        class.push('\\');
    }
    class.push(c);
}

/// Finds the checksum manifest among the release assets.
pub(crate) fn find_manifest<'a>(assets: &'a [Asset], tag: &str) -> Result<&'a Asset> {
    assets
        .iter()
        .find(|a| a.name.ends_with(MANIFEST_SUFFIX))
        .ok_or_else(|| {
            FetchError::ManifestNotFound {
                suffix: MANIFEST_SUFFIX.to_string(),
                tag: tag.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use url::Url;

    fn assets(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Asset {
                name: (*n).to_string(),
                url: Url::parse(&format!("https://example.com/assets/{i}")).unwrap(),
            })
            .collect()
    }

    const RELEASE: &[&str] = &[
        "memos-v0.22.0-darwin-arm64.tar.gz",
        "memos-v0.22.0-darwin-x86_64.tar.gz",
        "memos-v0.22.0-freebsd-x86_64.tar.gz",
        "memos-v0.22.0-linux-arm64.tar.gz",
        "memos-v0.22.0-linux-x86_64.tar.gz",
        "memos-v0.22.0-linux-x86_64.tar.gz.sig",
        "memos-v0.22.0-windows-arm64.zip",
        "memos-v0.22.0-windows-x86_64.zip",
        "memos_SHA256SUMS.txt",
    ];

    #[test]
    fn default_patterns_select_supported_platforms() -> Result<()> {
        let assets = assets(RELEASE);
        let matcher = AssetMatcher::new(DEFAULT_PATTERNS)?;
        let names = matcher
            .matches(&assets)?
            .into_iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "memos-v0.22.0-darwin-arm64.tar.gz",
                "memos-v0.22.0-darwin-x86_64.tar.gz",
                "memos-v0.22.0-linux-x86_64.tar.gz",
                "memos-v0.22.0-windows-x86_64.zip",
            ],
        );
        Ok(())
    }

    #[test]
    fn no_matches_is_an_error() -> Result<()> {
        let assets = assets(&["server-v2-linux-amd64.tar.gz", "checksums.txt"]);
        let matcher = AssetMatcher::new(DEFAULT_PATTERNS)?;
        let err = matcher.matches(&assets).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::NoAssetsMatched { .. }),
        ));
        assert!(err.to_string().contains("server-v2-linux-amd64.tar.gz"));
        Ok(())
    }

    #[test]
    fn overlapping_patterns_repeat_the_asset() -> Result<()> {
        let assets = assets(&["memos-v1-linux-x86_64.tar.gz", "memos-v1-linux-arm64.tar.gz"]);
        let matcher = AssetMatcher::new(&["memos-*-linux-*.tar.gz", "*x86_64*"])?;
        let names = matcher
            .matches(&assets)?
            .into_iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "memos-v1-linux-x86_64.tar.gz",
                "memos-v1-linux-x86_64.tar.gz",
                "memos-v1-linux-arm64.tar.gz",
            ],
        );
        Ok(())
    }

    #[rstest]
    #[case::star("memos-*.zip", "memos-v1-windows.zip", true)]
    #[case::star_is_anchored("memos-*.zip", "memos-v1-windows.zip.sig", false)]
    #[case::dot_is_literal("memos-*.tar.gz", "memos-v1-linux-x86_64.tarxgz", false)]
    #[case::question_mark("memos-v?-linux.tar.gz", "memos-v1-linux.tar.gz", true)]
    #[case::question_mark_is_one_char("memos-v?-linux.tar.gz", "memos-v10-linux.tar.gz", false)]
    #[case::class("memos-v[0-9]-linux", "memos-v7-linux", true)]
    #[case::negated_class("memos-v[!0-9]-linux", "memos-v7-linux", false)]
    #[case::braces("memos-*.{zip,tar.gz}", "memos-v1-linux.tar.gz", true)]
    #[case::braces_no_match("memos-*.{zip,tar.gz}", "memos-v1-linux.tar.xz", false)]
    #[case::regex_chars_are_literal("memos+(1)", "memos+(1)", true)]
    #[case::escaped_star(r"memos-\*.zip", "memos-*.zip", true)]
    #[case::escaped_star_is_not_a_wildcard(r"memos-\*.zip", "memos-v1.zip", false)]
    #[case::escaped_class_open(r"memos-\[1].zip", "memos-[1].zip", true)]
    #[case::bracket_first_in_class("memos-[]x]-linux", "memos-]-linux", true)]
    #[case::bracket_after_negation("memos-[!]x]-linux", "memos-]-linux", false)]
    #[case::bracket_after_negation_other("memos-[!]x]-linux", "memos-y-linux", true)]
    #[case::caret_in_class("memos-[a^]-linux", "memos-^-linux", true)]
    #[case::escaped_dash_in_class(r"memos-[a\-c]-linux", "memos-b-linux", false)]
    fn glob_matching(#[case] pattern: &str, #[case] name: &str, #[case] expect: bool) -> Result<()> {
        let glob = Glob::new(pattern)?;
        assert_eq!(glob.re.is_match(name), expect, "{pattern} vs {name}");
        Ok(())
    }

    #[rstest]
    #[case::unterminated_class("memos-[0-9")]
    #[case::unterminated_braces("memos-{zip,tar")]
    #[case::only_bracket_in_class("memos-[]")]
    #[case::trailing_backslash(r"memos-\")]
    fn invalid_globs(#[case] pattern: &str) {
        let err = AssetMatcher::new(&[pattern]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::InvalidPattern { .. }),
        ));
    }

    #[test]
    fn finds_manifest() -> Result<()> {
        let assets = assets(RELEASE);
        assert_eq!(find_manifest(&assets, "v0.22.0")?.name, "memos_SHA256SUMS.txt");
        Ok(())
    }

    #[test]
    fn missing_manifest() {
        let assets = assets(&RELEASE[..RELEASE.len() - 1]);
        let err = find_manifest(&assets, "v0.22.0").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::ManifestNotFound { .. }),
        ));
    }
}
