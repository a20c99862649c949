//! Random subdomain labels

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::{Error, Result};

/// Generate a random label of exactly `length` characters from `[A-Za-z0-9]`.
///
/// No uniqueness guarantee: two runs may produce the same label, and nothing
/// downstream deduplicates.
pub fn generate(length: usize) -> Result<String> {
    if length == 0 {
        return Err(Error::validation("subdomain length must be at least 1"));
    }

    Ok(rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect())
}
