//! Prompt composition: house style around a resolved panel prompt.

use crate::config::StyleConfig;

impl StyleConfig {
    /// `"<prefix> <resolved> <technical>"`, skipping empty parts.
    pub fn compose(&self, resolved: &str) -> String {
        [self.prefix.trim(), resolved.trim(), self.technical.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
