// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Recipe version ordering.
//!
//! Recipe versions are rarely valid semantic versions (`1.10`, `2.3+git`,
//! `1.0rc1`, `20240101`), so they are compared segment by segment instead.
//! A version is split into runs of digits and runs of letters; everything
//! else is a separator.
//!
//! # Ordering Rules
//!
//! - Numeric runs compare as numbers, so `1.10` is newer than `1.9`.
//! - Letter runs compare lexically, ignoring case.
//! - A numeric run is newer than a letter run in the same position.
//! - When one version is a prefix of the other, a trailing numeric run makes
//!   the longer one newer (`1.2.1 > 1.2`) and a trailing letter run makes it
//!   older (`1.0rc1 < 1.0`).
//! - Trailing zero runs are insignificant (`1.0 == 1.0.0`).
//! - Anything after the first `+` is a local suffix. It only breaks ties
//!   between equal release parts, and a version with a suffix is newer than
//!   one without (`1.0 < 1.0+git < 1.1`).

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter, Result as FmtResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Text(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Greater,
            (Self::Text(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orderable recipe version.
#[derive(Debug, Clone)]
pub struct RecipeVersion {
    raw: String,
    release: Vec<Segment>,
    local: Vec<Segment>,
}

impl RecipeVersion {
    /// Parse version string. Never fails; unparseable input simply yields
    /// fewer segments.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (release, local) = match raw.split_once('+') {
            Some((release, local)) => (segments(release), segments(local)),
            None => (segments(&raw), Vec::new()),
        };

        Self {
            raw,
            release,
            local,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut run = String::new();
            while let Some(&c) = chars.peek().filter(|c| c.is_ascii_digit()) {
                run.push(c);
                chars.next();
            }
            segments.push(Segment::Number(run.parse().unwrap_or(u64::MAX)));
        } else if c.is_alphabetic() {
            let mut run = String::new();
            while let Some(&c) = chars.peek().filter(|c| c.is_alphabetic()) {
                run.extend(c.to_lowercase());
                chars.next();
            }
            segments.push(Segment::Text(run));
        } else {
            chars.next();
        }
    }

    segments
}

fn compare(lhs: &[Segment], rhs: &[Segment]) -> Ordering {
    let mut lhs = lhs.iter();
    let mut rhs = rhs.iter();

    loop {
        match (lhs.next(), rhs.next()) {
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            },
            // INVARIANT: Trailing zero runs do not change a version.
            (Some(Segment::Number(0)), None) | (None, Some(Segment::Number(0))) => continue,
            (Some(Segment::Number(_)), None) => return Ordering::Greater,
            (Some(Segment::Text(_)), None) => return Ordering::Less,
            (None, Some(Segment::Number(_))) => return Ordering::Less,
            (None, Some(Segment::Text(_))) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

impl Ord for RecipeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.release, &other.release).then_with(|| {
            match (self.local.is_empty(), other.local.is_empty()) {
                (true, true) => Ordering::Equal,
                (false, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
                (false, false) => compare(&self.local, &other.local),
            }
        })
    }
}

impl PartialOrd for RecipeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RecipeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RecipeVersion {}

impl Display for RecipeVersion {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.raw)
    }
}
