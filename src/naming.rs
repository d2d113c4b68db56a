//! Game name and version extraction from release folder names
//!
//! Scene release folders look like `Some.Game.v1.2.3-CODEX` or
//! `Another.Game.REPACK.4GB-GROUP`. The cleanup is an ordered table of
//! [`NameRule`]s so each pattern can be exercised on its own.

use std::sync::LazyLock;

use regex::Regex;

/// Version used when the folder name carries no version token
pub const UNKNOWN_VERSION: &str = "unknown";

/// One cleanup step applied to the folder name after the version is removed
#[derive(Debug, Clone, Copy)]
pub struct NameRule {
    /// Short identifier used in logs and tests
    pub name: &'static str,
    /// Regular expression matched against the working name
    pub pattern: &'static str,
    /// Replacement text
    pub replacement: &'static str,
    /// Replace every match instead of only the first
    pub all: bool,
}

/// Cleanup rules, applied in order
pub const NAME_RULES: &[NameRule] = &[
    NameRule {
        name: "scene_group",
        pattern: r"(?i)-(CODEX|PLAZA|RELOADED|GOG|SKIDROW|RAZOR1911|DODI|FLT|HOODLUM|PROPHET|TiNYiSO)$",
        replacement: "",
        all: false,
    },
    NameRule {
        name: "release_group",
        pattern: r"-([A-Za-z0-9_]+)$",
        replacement: "",
        all: false,
    },
    NameRule {
        name: "size",
        pattern: r"(?i)\b\d+(\.\d+)?(MB|GB|TB)\b",
        replacement: "",
        all: false,
    },
    NameRule {
        name: "release_tag",
        pattern: r"(?i)\b(PROPER|REPACK|MULTI\d*|UPDATE|PATCH|DLC|COMPLETE)\b",
        replacement: "",
        all: false,
    },
    NameRule {
        name: "dot_separator",
        pattern: r"\.",
        replacement: " ",
        all: true,
    },
    NameRule {
        name: "whitespace",
        pattern: r"\s+",
        replacement: " ",
        all: true,
    },
];

/// Version token: `v` followed by dotted digits; the capture excludes the `v`
#[allow(clippy::expect_used)]
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v(\d+(?:\.\d+)*)").expect("version regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static COMPILED_RULES: LazyLock<Vec<(NameRule, Regex)>> = LazyLock::new(|| {
    NAME_RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(rule.pattern).expect("name rule regex is valid"); // Static pattern, safe to panic
            (*rule, regex)
        })
        .collect()
});

/// Game name and version derived from a release folder name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseName {
    /// Cleaned, human-readable game name
    pub game_name: String,
    /// Version without the leading `v`, or [`UNKNOWN_VERSION`]
    pub version: String,
}

impl ReleaseName {
    /// Whether a version token was found
    pub fn has_version(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}

/// Apply a single rule to `input`
pub fn apply_rule(rule: &NameRule, regex: &Regex, input: &str) -> String {
    if rule.all {
        regex.replace_all(input, rule.replacement).into_owned()
    } else {
        regex.replace(input, rule.replacement).into_owned()
    }
}

/// Derive the game name and version from a release folder name
///
/// The first version token is captured and removed, the cleanup rules run in
/// table order and the result is trimmed. If cleanup leaves nothing behind the
/// raw folder name is used so placement never targets the library root.
pub fn parse_release_name(folder_name: &str) -> ReleaseName {
    let (version, mut working) = match VERSION_PATTERN.captures(folder_name) {
        Some(caps) => {
            let version = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
            let stripped = VERSION_PATTERN.replace(folder_name, "").into_owned();
            (version, stripped)
        }
        None => (UNKNOWN_VERSION.to_string(), folder_name.to_string()),
    };

    for (rule, regex) in COMPILED_RULES.iter() {
        working = apply_rule(rule, regex, &working);
    }

    let mut game_name = working.trim().to_string();
    if game_name.is_empty() {
        game_name = folder_name.trim().to_string();
    }

    tracing::debug!(folder_name, %game_name, %version, "parsed release name");

    ReleaseName { game_name, version }
}
