//! Aliases a replayed commit may be attributed to.

use std::fmt;

use rand::Rng;

use crate::error::{Error, Result};

/// A non-empty set of usernames eligible as commit author.
///
/// Which contributor wrote a given change is unknown, so each replayed commit
/// gets one of them picked at random.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorSet(Vec<String>);

impl ContributorSet {
    /// build a set, dropping blanks and duplicates
    pub fn new<I, S>(aliases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = alias.into().trim().to_string();
            if !alias.is_empty() && !unique.contains(&alias) {
                unique.push(alias);
            }
        }

        if unique.is_empty() {
            return Err(Error::NoContributors);
        }
        Ok(Self(unique))
    }

    /// pick one alias uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let index = rng.gen_range(0..self.0.len());
        &self.0[index]
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ContributorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}
