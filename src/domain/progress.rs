//! Selection and progress value objects

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::domain::location::Location;

/// Number of selection entries fully processed (handled, merged, persisted).
///
/// Only ever moves forward by one via [`Progress::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(usize);

impl Progress {
    pub const ZERO: Self = Self(0);

    pub fn new(step: usize) -> Self {
        Self(step)
    }

    pub fn step(self) -> usize {
        self.0
    }

    #[must_use]
    pub fn advance(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn is_fresh(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered, immutable list of locations resolved for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    locations: Vec<Location>,
}

impl Selection {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.locations.iter()
    }

    /// Half-open index window `[start, end)` a run starting at `progress`
    /// may process with at most `limit` items.
    pub fn window(&self, progress: Progress, limit: Option<usize>) -> (usize, usize) {
        let start = progress.step();
        let end = match limit {
            Some(limit) => start.saturating_add(limit).min(self.len()),
            None => self.len(),
        };
        (start, end.max(start))
    }

    pub fn is_complete(&self, progress: Progress) -> bool {
        progress.step() >= self.len()
    }
}

impl Index<usize> for Selection {
    type Output = Location;

    fn index(&self, index: usize) -> &Self::Output {
        &self.locations[index]
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.iter()
    }
}

impl FromIterator<Location> for Selection {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
