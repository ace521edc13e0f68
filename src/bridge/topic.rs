use std::collections::HashSet;

use crate::utils::error::BridgeError;

pub type ClientId = String;

/// A validated MQTT topic filter.
///
/// Filters are split into levels on `/`. A `+` matches exactly one level,
/// a `#` matches any number of remaining levels (including none) and may
/// only appear as the final level. Wildcard characters may not occur inside
/// a level (`a+/b` is invalid).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    raw: String,
}

impl TopicFilter {
    /// Validates `raw` against the MQTT filter rules and wraps it.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let invalid = |reason| BridgeError::InvalidFilter {
            filter: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("filter must not be empty"));
        }
        if raw.contains('\0') {
            return Err(invalid("filter must not contain NUL"));
        }

        let levels: Vec<&str> = raw.split('/').collect();
        for (i, level) in levels.iter().enumerate() {
            if level.contains('#') {
                if *level != "#" {
                    return Err(invalid("'#' must occupy a whole level"));
                }
                if i != levels.len() - 1 {
                    return Err(invalid("'#' is only allowed as the last level"));
                }
            }
            if level.contains('+') && *level != "+" {
                return Err(invalid("'+' must occupy a whole level"));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches a concrete topic against this filter.
    ///
    /// `#` also matches the parent level (`a/#` matches `a`). Filters that
    /// start with a wildcard never match topics starting with `$`, so a
    /// client subscribed to `#` does not receive `$SYS` traffic.
    pub fn matches(&self, topic: &str) -> bool {
        if topic.starts_with('$') && (self.raw.starts_with('+') || self.raw.starts_with('#')) {
            return false;
        }

        let mut filter_levels = self.raw.split('/');
        let mut topic_levels = topic.split('/');

        loop {
            match (filter_levels.next(), topic_levels.next()) {
                (Some("#"), _) => return true,
                (Some("+"), Some(_)) => continue,
                (Some(f), Some(t)) if f == t => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

/// Returns true if `topic` contains no wildcard characters.
///
/// Publishes must name a concrete topic; only subscriptions may carry
/// wildcards.
pub fn is_concrete(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains('+') && !topic.contains('#')
}

/// One active upstream filter and the clients subscribed to it.
///
/// The bridge holds exactly one MQTT subscription per `Subscription`,
/// however many clients share it. Adding and removing subscribers has no
/// effect on subscribers that are already present or absent.
#[derive(Debug)]
pub struct Subscription {
    pub filter: TopicFilter,
    pub subscribers: HashSet<ClientId>,
}

impl Subscription {
    pub fn new(filter: TopicFilter) -> Self {
        Self {
            filter,
            subscribers: HashSet::new(),
        }
    }

    pub fn add(&mut self, id: ClientId) {
        self.subscribers.insert(id);
    }

    pub fn remove(&mut self, id: &ClientId) {
        self.subscribers.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
