//! Archive file naming rules
//!
//! Multi-volume RAR sets come in two naming schemes: `name.part1.rar`,
//! `name.part2.rar`, ... and the older `name.rar`, `name.r00`, `name.r01`, ...
//! Both are described by [`VOLUME_PATTERNS`] and resolved purely from file
//! names so they can be tested without touching the filesystem.

use std::sync::LazyLock;

use regex::Regex;

/// Role of a file within a RAR volume set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// First volume of a `.partN.rar` set
    FirstPart,
    /// Any later volume of a `.partN.rar` set
    Part,
    /// A bare `.rar` file (single archive or head of an `.rNN` set)
    Rar,
    /// An old-style `.rNN` continuation volume
    Continuation,
}

/// A file name pattern and the volume role it identifies
#[derive(Debug, Clone, Copy)]
pub struct VolumePattern {
    /// Role assigned to matching names
    pub kind: VolumeKind,
    /// Case-insensitive pattern matched against the file name
    pub pattern: &'static str,
}

/// Volume patterns, checked in order; the first match wins
pub const VOLUME_PATTERNS: &[VolumePattern] = &[
    VolumePattern {
        kind: VolumeKind::FirstPart,
        pattern: r"(?i)\.part0*1\.rar$",
    },
    VolumePattern {
        kind: VolumeKind::Part,
        pattern: r"(?i)\.part\d+\.rar$",
    },
    VolumePattern {
        kind: VolumeKind::Rar,
        pattern: r"(?i)\.rar$",
    },
    VolumePattern {
        kind: VolumeKind::Continuation,
        pattern: r"(?i)\.r\d+$",
    },
];

#[allow(clippy::expect_used)]
static COMPILED_PATTERNS: LazyLock<Vec<(VolumeKind, Regex)>> = LazyLock::new(|| {
    VOLUME_PATTERNS
        .iter()
        .map(|p| {
            let regex = Regex::new(p.pattern).expect("volume regex is valid"); // Static pattern, safe to panic
            (p.kind, regex)
        })
        .collect()
});

/// Classify a file name, returning the matched role and the name without the
/// matched suffix (the set's base name)
pub fn classify(file_name: &str) -> Option<(VolumeKind, &str)> {
    COMPILED_PATTERNS.iter().find_map(|(kind, regex)| {
        regex
            .find(file_name)
            .map(|m| (*kind, &file_name[..m.start()]))
    })
}

/// Whether a file name has a `.rar` extension (any volume scheme)
pub fn is_rar(file_name: &str) -> bool {
    has_extension(file_name, "rar")
}

/// Whether a file name has an `.iso` extension
pub fn is_iso(file_name: &str) -> bool {
    has_extension(file_name, "iso")
}

fn has_extension(file_name: &str, ext: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Pick the root volume out of the names found in one directory
///
/// The root is a `.part1.rar` volume or a bare `.rar` that is not part of a
/// `.partN.rar` set. Names are compared in sorted order so the choice does not
/// depend on directory listing order. Returns `None` when only later volumes
/// are present.
pub fn find_root_volume<S: AsRef<str>>(file_names: &[S]) -> Option<String> {
    let mut names: Vec<&str> = file_names.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();

    names
        .into_iter()
        .find(|name| {
            matches!(
                classify(name),
                Some((VolumeKind::FirstPart | VolumeKind::Rar, _))
            )
        })
        .map(str::to_string)
}

/// Number of volumes in the set headed by `root`, counted from its siblings
///
/// - `.part1.rar`: siblings with the same base name that are `.partN.rar` volumes
/// - bare `.rar`: siblings with the same base name that are `.rNN` or
///   `.partN.rar` volumes, plus one for the root itself
/// - anything else counts as a single volume
pub fn count_volumes<S: AsRef<str>>(root: &str, siblings: &[S]) -> u32 {
    let count = match classify(root) {
        Some((VolumeKind::FirstPart, base)) => siblings
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| {
                matches!(
                    classify(name),
                    Some((VolumeKind::FirstPart | VolumeKind::Part, other)) if other == base
                )
            })
            .count(),
        Some((VolumeKind::Rar, base)) => {
            siblings
                .iter()
                .map(AsRef::as_ref)
                .filter(|name| *name != root)
                .filter(|name| {
                    matches!(
                        classify(name),
                        Some((
                            VolumeKind::Continuation | VolumeKind::FirstPart | VolumeKind::Part,
                            other
                        )) if other == base
                    )
                })
                .count()
                + 1
        }
        _ => 1,
    };

    u32::try_from(count).unwrap_or(u32::MAX).max(1)
}
