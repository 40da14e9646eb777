// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Collecting and printing availability violations. */

use {crate::version::PlatformVersion, linked_hash_map::LinkedHashMap, std::io::Write};

/// Why an API use is a violation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The API appeared in a version newer than the bundle's minimum.
    IntroducedAfterMinimum(PlatformVersion),
    /// The API is not available on the target platform at all.
    Unavailable,
}

/// Violations keyed by display name, in discovery order.
///
/// Only the first outcome recorded for a name is kept.
#[derive(Clone, Debug, Default)]
pub struct Violations {
    entries: LinkedHashMap<String, Outcome>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation unless one already exists for `name`.
    ///
    /// Returns whether the violation was recorded.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, outcome: Outcome) -> bool {
        let name = name.into();

        if self.entries.contains_key(&name) {
            false
        } else {
            self.entries.insert(name, outcome);
            true
        }
    }

    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Write one line per violation and return the process exit code.
///
/// The exit code is 1 if any violation exists, 0 otherwise.
pub fn report(violations: &Violations, out: &mut impl Write) -> std::io::Result<i32> {
    for (name, outcome) in violations.iter() {
        match outcome {
            Outcome::Unavailable => writeln!(out, "{} is Unavailable", name)?,
            Outcome::IntroducedAfterMinimum(version) => {
                writeln!(out, "{} was introduced in {}", name, version)?
            }
        }
    }

    Ok(if violations.is_empty() { 0 } else { 1 })
}
