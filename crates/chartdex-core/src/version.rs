//! Semantic version parsing and constraint matching
//!
//! Chart repositories carry versions written by many different tools, so
//! parsing is lenient: a leading `v` is accepted and missing minor or patch
//! components default to zero (`v1.2` is `1.2.0`).
//!
//! Constraints follow the usual chart tooling grammar:
//!
//! - comparison: `=`, `!=`, `>`, `<`, `>=`, `<=` (also `=<`, `=>`)
//! - tilde and caret: `~1.2`, `~>1.2`, `^1.2.3`
//! - wildcards: `*`, `1.x`, `1.2.X`
//! - hyphen ranges: `1.2 - 1.4.5`
//! - AND with `,` or whitespace, OR with `||`
//!
//! A bare version (`1.2.3`) means exact equality. Pre-release versions only
//! satisfy a constraint that names a pre-release on the same
//! `major.minor.patch`.

use semver::{BuildMetadata, Prerelease, Version, VersionReq};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Parse a version string leniently
///
/// Returns `None` for anything that is not a (possibly abbreviated)
/// semantic version.
pub fn parse_version(input: &str) -> Option<Version> {
    let input = input.trim();
    let input = input.strip_prefix('v').unwrap_or(input);

    let (rest, build) = match input.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (input, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let mut parts = core.split('.');
    let major = numeric(parts.next()?)?;
    let minor = parts.next().map_or(Some(0), numeric)?;
    let patch = parts.next().map_or(Some(0), numeric)?;
    if parts.next().is_some() {
        return None;
    }

    let mut version = Version::new(major, minor, patch);
    if let Some(pre) = pre {
        if pre.is_empty() {
            return None;
        }
        version.pre = Prerelease::new(pre).ok()?;
    }
    if let Some(build) = build {
        if build.is_empty() {
            return None;
        }
        version.build = BuildMetadata::new(build).ok()?;
    }
    Some(version)
}

fn numeric(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// A compiled version constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    groups: Vec<Group>,
}

/// One `||` alternative: everything in `require` must match and nothing in
/// `exclude` may match
#[derive(Debug, Clone)]
struct Group {
    require: VersionReq,
    exclude: Vec<VersionReq>,
}

impl Group {
    fn matches(&self, version: &Version) -> bool {
        self.require.matches(version) && !self.exclude.iter().any(|req| req.matches(version))
    }
}

impl Constraint {
    /// Constraint matching every stable version
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            groups: vec![Group {
                require: VersionReq::STAR,
                exclude: Vec::new(),
            }],
        }
    }

    /// Compile a constraint expression. An empty expression matches anything.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::any());
        }

        let groups = trimmed
            .split("||")
            .map(|group| parse_group(group).map_err(|message| invalid(input, message)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            groups,
        })
    }

    /// Check whether a version satisfies the constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.groups.iter().any(|group| group.matches(version))
    }

    /// The expression this constraint was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Constraint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(constraint: &str, message: String) -> CoreError {
    CoreError::InvalidConstraint {
        constraint: constraint.to_string(),
        message,
    }
}

fn is_operator(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '=' | '<' | '>' | '!' | '~' | '^'))
}

/// Split a group into terms, re-attaching operators written with a space
/// (`>= 1.2`) to their version
fn tokenize(group: &str) -> Vec<String> {
    let raw: Vec<&str> = group
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    let mut tokens = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if is_operator(raw[i]) && i + 1 < raw.len() {
            tokens.push(format!("{}{}", raw[i], raw[i + 1]));
            i += 2;
        } else {
            tokens.push(raw[i].to_string());
            i += 1;
        }
    }
    tokens
}

fn parse_group(group: &str) -> std::result::Result<Group, String> {
    let tokens = tokenize(group);
    if tokens.is_empty() {
        return Err("empty constraint group".to_string());
    }

    let mut require = Vec::new();
    let mut exclude = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // Hyphen range: `a - b`
        if tokens.get(i + 1).map(String::as_str) == Some("-") {
            let upper = tokens
                .get(i + 2)
                .ok_or_else(|| format!("hyphen range '{} -' has no upper bound", tokens[i]))?;
            push_term(">=", &tokens[i], &mut require, &mut exclude)?;
            push_term("<=", upper, &mut require, &mut exclude)?;
            i += 3;
            continue;
        }

        let token = &tokens[i];
        let split = token
            .find(|c: char| !matches!(c, '=' | '<' | '>' | '!' | '~' | '^'))
            .ok_or_else(|| format!("operator '{}' has no version", token))?;
        let (op, version) = token.split_at(split);
        push_term(op, version, &mut require, &mut exclude)?;
        i += 1;
    }

    let require = if require.is_empty() {
        VersionReq::STAR
    } else {
        VersionReq::parse(&require.join(", ")).map_err(|e| e.to_string())?
    };
    let exclude = exclude
        .iter()
        .map(|term| VersionReq::parse(term).map_err(|e| e.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Group { require, exclude })
}

/// Normalize one `op version` term into the comparator syntax of the
/// `semver` crate and file it under required or excluded
fn push_term(
    op: &str,
    version: &str,
    require: &mut Vec<String>,
    exclude: &mut Vec<String>,
) -> std::result::Result<(), String> {
    let version = version.strip_prefix('v').unwrap_or(version);

    // Truncate at the first wildcard component: `1.2.x` is the partial `1.2`
    let partial: Vec<&str> = version
        .split('.')
        .take_while(|part| !matches!(*part, "*" | "x" | "X"))
        .collect();
    let version = partial.join(".");

    let (negate, op) = match op {
        "" | "=" | "==" => (false, "="),
        "!=" => (true, "="),
        ">" | "<" | ">=" | "<=" | "~" | "^" => (false, op),
        "=<" => (false, "<="),
        "=>" => (false, ">="),
        "~>" => (false, "~"),
        other => return Err(format!("unknown operator '{}'", other)),
    };

    if version.is_empty() {
        // A bare wildcard matches every version
        if negate {
            exclude.push("*".to_string());
        }
        return Ok(());
    }

    let term = format!("{}{}", op, version);
    if negate {
        exclude.push(term);
    } else {
        require.push(term);
    }
    Ok(())
}
