// src/version/mod.rs

//! Version ordering for version-named manifest directories
//!
//! Version directories in the manifest tree are named by whatever the
//! publisher chose, so ordering is two-tier:
//!
//! 1. **Standard form**: `[v][N!]N[.N[.N]]` with optional pre-release
//!    (`a`, `b`, `rc`, ...), post-release (`.postN`, `-N`) and dev (`.devN`)
//!    qualifiers. The release and pre-release are normalized into a
//!    [`semver::Version`] (missing segments padded with zero, so
//!    `1.0 == 1.0.0`); epoch, post and dev are compared around it.
//! 2. **Fallback**: anything else (four or more release segments, free-form
//!    suffixes) becomes the tuple of leading integer dot-segments, cut at the
//!    first non-numeric segment, compared lexicographically. A string with no
//!    leading integer segment becomes `[0]`.
//!
//! Both tiers share one sort key `(epoch, tuple, qualifiers)`. A standard
//! version's tuple is its release with trailing zeros dropped, a fallback
//! version carries epoch 0 and no qualifiers. Standard pairs therefore
//! order exactly as their semver forms do, while `1.2.40 < 1.2.40.0` still
//! holds across tiers and the order stays total.

use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;

/// Maximum number of release segments accepted by the standard form
const MAX_RELEASE_SEGMENTS: usize = 3;

/// Pre-release phase, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl PreRelease {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "a" | "alpha" => Some(Self::Alpha),
            "b" | "beta" => Some(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Some(Self::Rc),
            _ => None,
        }
    }
}

/// Dev qualifier: a dev build sorts before the same version without one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

/// A version in the standard numeric form
#[derive(Debug, Clone, Eq)]
pub struct StandardVersion {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreRelease, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    semver: Version,
}

impl StandardVersion {
    /// Parse the standard form, returning `None` for anything outside it
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let body = lowered.strip_prefix('v').unwrap_or(&lowered);

        let (epoch, body) = match body.split_once('!') {
            Some((e, rest)) => (parse_digits(e)?, rest),
            None => (0, body),
        };

        let release_len = body
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .count();
        let release_str = body[..release_len].trim_end_matches('.');
        let tail = &body[release_str.len()..];

        let release = release_str
            .split('.')
            .map(parse_digits)
            .collect::<Option<Vec<u64>>>()?;
        if release.len() > MAX_RELEASE_SEGMENTS {
            return None;
        }

        let (pre, post, dev) = parse_qualifiers(tail)?;
        let semver = to_semver(&release, pre, post, dev)?;

        Some(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            semver,
        })
    }

    /// The normalized semver form of release and pre-release
    pub fn as_semver(&self) -> &Version {
        &self.semver
    }

    fn dev_key(&self) -> DevKey {
        self.dev.map_or(DevKey::None, DevKey::Dev)
    }

    /// Release segments with trailing zeros dropped, keeping at least one
    fn tuple(&self) -> Vec<u64> {
        let len = self
            .release
            .iter()
            .rposition(|n| *n != 0)
            .map_or(1, |i| i + 1);
        self.release[..len].to_vec()
    }
}

impl Ord for StandardVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.semver.cmp(&other.semver))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }
}

impl PartialOrd for StandardVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for StandardVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for StandardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        Ok(())
    }
}

/// Build the semver form, padding the release to major.minor.patch
///
/// Pre-release tags are `a.N`, `b.N` and `rc.N`, which sort in phase order.
/// A dev build with no other qualifier gets the numeric tag `0`, and numeric
/// identifiers sort before alphanumeric ones, so it lands ahead of `a.0`.
fn to_semver(
    release: &[u64],
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
) -> Option<Version> {
    let segment = |i: usize| release.get(i).copied().unwrap_or(0);
    let mut version = Version::new(segment(0), segment(1), segment(2));
    version.pre = match (pre, post, dev) {
        (Some((kind, n)), _, _) => Prerelease::new(&format!("{}.{}", kind.as_str(), n)).ok()?,
        (None, None, Some(_)) => Prerelease::new("0").ok()?,
        _ => Prerelease::EMPTY,
    };
    Some(version)
}

type Qualifiers = (Option<(PreRelease, u64)>, Option<u64>, Option<u64>);

/// Parse the qualifier tail following the release segments
///
/// Accepts, in order, an optional pre-release, post-release and dev part.
/// Separators (`.`, `-`, `_`) are optional between parts, and a qualifier
/// without a number counts as 0. A bare `-N` right after the release is a
/// post-release.
fn parse_qualifiers(tail: &str) -> Option<Qualifiers> {
    let implicit_post =
        tail.starts_with('-') && tail[1..].starts_with(|c: char| c.is_ascii_digit());
    let tokens = tokenize(tail)?;
    let mut tokens = tokens.iter().map(String::as_str).peekable();

    if implicit_post {
        let post = tokens.next()?.parse().ok()?;
        let dev = match tokens.next() {
            Some("dev") => Some(take_number(&mut tokens)),
            Some(_) => return None,
            None => None,
        };
        return tokens.next().is_none().then_some((None, Some(post), dev));
    }

    let mut pre = None;
    if let Some(kind) = tokens.peek().and_then(|t| PreRelease::from_word(t)) {
        tokens.next();
        pre = Some((kind, take_number(&mut tokens)));
    }

    let mut post = None;
    if matches!(tokens.peek(), Some(&("post" | "rev" | "r"))) {
        tokens.next();
        post = Some(take_number(&mut tokens));
    }

    let mut dev = None;
    if tokens.peek() == Some(&"dev") {
        tokens.next();
        dev = Some(take_number(&mut tokens));
    }

    tokens.next().is_none().then_some((pre, post, dev))
}

fn take_number<'a, I: Iterator<Item = &'a str>>(tokens: &mut Peekable<I>) -> u64 {
    match tokens.peek().and_then(|t| t.parse().ok()) {
        Some(n) => {
            tokens.next();
            n
        }
        None => 0,
    }
}

/// Split a qualifier tail into alternating word and number tokens
///
/// Returns `None` on a doubled separator or any character outside
/// `[a-z0-9._-]`.
fn tokenize(tail: &str) -> Option<Vec<String>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut after_separator = false;
    for c in tail.chars() {
        if matches!(c, '.' | '-' | '_') {
            if after_separator {
                return None;
            }
            after_separator = true;
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            return None;
        }
        let same_class = tokens
            .last()
            .and_then(|t| t.chars().last())
            .is_some_and(|last| last.is_ascii_digit() == c.is_ascii_digit());
        match tokens.last_mut() {
            Some(token) if same_class && !after_separator => token.push(c),
            _ => tokens.push(c.to_string()),
        }
        after_separator = false;
    }
    if after_separator {
        return None;
    }
    Some(tokens)
}

/// How a version string was interpreted
#[derive(Debug, Clone)]
enum VersionKind {
    Standard(StandardVersion),
    Fallback(Vec<u64>),
}

/// A version directory name together with its ordering interpretation
#[derive(Debug, Clone)]
pub struct MirrorVersion {
    raw: String,
    kind: VersionKind,
}

impl MirrorVersion {
    /// Parse a candidate version directory name
    ///
    /// Returns `None` when the name does not look like a version at all (no
    /// digit anywhere). Such names are excluded from version discovery rather
    /// than folded into the `[0]` fallback.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().is_empty() || !s.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self::parse_lenient(s))
    }

    /// Interpret any string as a version, never failing
    pub fn parse_lenient(s: &str) -> Self {
        let kind = match StandardVersion::parse(s) {
            Some(v) => VersionKind::Standard(v),
            None => VersionKind::Fallback(fallback_key(s)),
        };
        Self {
            raw: s.to_string(),
            kind,
        }
    }

    /// The original string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the string parsed in the standard form
    pub fn is_standard(&self) -> bool {
        matches!(self.kind, VersionKind::Standard(_))
    }

    /// Integer tuple used when comparing across tiers
    pub fn tuple(&self) -> Vec<u64> {
        match &self.kind {
            VersionKind::Standard(v) => v.tuple(),
            VersionKind::Fallback(key) => key.clone(),
        }
    }

    fn epoch(&self) -> u64 {
        match &self.kind {
            VersionKind::Standard(v) => v.epoch,
            VersionKind::Fallback(_) => 0,
        }
    }

    /// Pre-release, post and dev parts; a fallback sorts as a plain release
    fn qualifiers(&self) -> (Prerelease, Option<u64>, DevKey) {
        match &self.kind {
            VersionKind::Standard(v) => (v.semver.pre.clone(), v.post, v.dev_key()),
            VersionKind::Fallback(_) => (Prerelease::EMPTY, None, DevKey::None),
        }
    }
}

impl Ord for MirrorVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (VersionKind::Standard(a), VersionKind::Standard(b)) => a.cmp(b),
            (VersionKind::Fallback(a), VersionKind::Fallback(b)) => a.cmp(b),
            _ => self
                .epoch()
                .cmp(&other.epoch())
                .then_with(|| self.tuple().cmp(&other.tuple()))
                .then_with(|| self.qualifiers().cmp(&other.qualifiers())),
        }
    }
}

impl PartialOrd for MirrorVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MirrorVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MirrorVersion {}

impl fmt::Display for MirrorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Compare two version strings with the two-tier ordering
pub fn compare(a: &str, b: &str) -> Ordering {
    MirrorVersion::parse_lenient(a).cmp(&MirrorVersion::parse_lenient(b))
}

/// Whether `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// Select the latest version from a set of version strings
///
/// Versions that compare equal (`1.0` and `1.0.0`) are tie-broken on the raw
/// string so the result does not depend on iteration order.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .map(|v| (v, MirrorVersion::parse_lenient(v)))
        .max_by(|(raw_a, a), (raw_b, b)| a.cmp(b).then_with(|| raw_a.cmp(raw_b)))
        .map(|(raw, _)| raw)
}

fn fallback_key(s: &str) -> Vec<u64> {
    let parts: Vec<u64> = s
        .split('.')
        .map_while(|part| part.parse::<u64>().ok())
        .collect();
    if parts.is_empty() { vec![0] } else { parts }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
