// Release assets are named with Go's GOOS/GOARCH vocabulary (`darwin-arm64`, `linux-x86_64`, ...)
// but the packager wants Rust target triples. Detection is plain substring matching, so a name
// that contains several tokens from the same table resolves to whichever entry comes first. The
// tables are ordered slices rather than maps so that this tie-break never changes.
//
// "386" is checked before every other arch token, so `memos-v0.386.0-linux-x86_64` is i686.

const UNKNOWN: &str = "unknown";

const OSES: &[&str] = &["darwin", "linux", "windows"];

const VENDORS: &[(&str, &str)] = &[("windows", "pc"), ("linux", "unknown"), ("darwin", "apple")];

const ARCHES: &[(&str, &str)] = &[
    ("386", "i686"),
    ("x86_64", "x86_64"),
    ("x64", "x86_64"),
    ("x86", "i686"),
    ("arm64", "aarch64"),
    ("aarch64", "aarch64"),
    ("riscv64", "riscv64gc"),
];

const VARIANTS: &[(&str, &str)] = &[("windows", "msvc"), ("linux", "gnu")];

/// Converts a release file name like `memos-v0.22.0-linux-x86_64.tar.gz` into a target triple
/// like `x86_64-unknown-linux-gnu`.
///
/// This never fails. Any segment that can't be determined from the name is `unknown`, and the
/// variant segment is dropped entirely when there isn't one (macOS).
pub fn target_triple(file_name: &str) -> String {
    let triple = [
        arch(file_name),
        vendor(file_name),
        os(file_name),
        variant(file_name),
    ]
    .join("-");

    match triple.strip_suffix('-') {
        Some(t) => t.to_string(),
        None => triple,
    }
}

/// Returns true if the file name mentions Windows anywhere, in which case the binary inside has an
/// `.exe` suffix. Unlike the OS segment of the triple, this does not care whether another OS token
/// comes first.
pub fn is_windows(file_name: &str) -> bool {
    file_name.contains("windows")
}

fn os(file_name: &str) -> &'static str {
    OSES.iter()
        .find(|os| file_name.contains(*os))
        .copied()
        .unwrap_or(UNKNOWN)
}

fn vendor(file_name: &str) -> &'static str {
    first_match(VENDORS, file_name).unwrap_or(UNKNOWN)
}

fn arch(file_name: &str) -> &'static str {
    first_match(ARCHES, file_name).unwrap_or(UNKNOWN)
}

fn variant(file_name: &str) -> &'static str {
    first_match(VARIANTS, file_name).unwrap_or("")
}

fn first_match(table: &[(&str, &'static str)], file_name: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(token, _)| file_name.contains(token))
        .map(|(_, value)| *value)
}
