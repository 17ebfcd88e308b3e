//! Pipeline configuration.
//!
//! The configuration is parsed once into an immutable record; the option
//! subsets each enrichment step needs are derived explicitly instead of
//! handing a shared mutable bag down the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::whitelist::{EventFilterSource, Whitelist};

/// Configuration for the vinylify stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VinylifyConfig {
    /// Run enrichment steps as deferred (non-blocking) operations rather
    /// than blocking transforms. Selected once at pipeline construction.
    #[serde(rename = "async")]
    pub async_mode: bool,

    /// Whitelist source for the filter stage. Consumed during setup; the
    /// enrichment steps never see it.
    pub event_filter: EventFilterSource,

    /// Follow symlinks when attaching metadata.
    pub follow_symlinks: bool,

    /// Enable the content-read step.
    pub read: bool,

    /// Read contents fully into memory rather than handing out an open file.
    pub buffer: bool,

    /// Strip a leading UTF-8 BOM from buffered contents.
    #[serde(rename = "stripBOM")]
    pub strip_bom: bool,

    /// When set, drop items whose modification time does not postdate this
    /// cutoff.
    pub since: Option<DateTime<Utc>>,
}

impl Default for VinylifyConfig {
    fn default() -> Self {
        Self {
            async_mode: true,
            event_filter: EventFilterSource::List(vec![
                "add".to_owned(),
                "change".to_owned(),
                "unlink".to_owned(),
            ]),
            follow_symlinks: true,
            read: true,
            buffer: true,
            strip_bom: true,
            since: None,
        }
    }
}

impl VinylifyConfig {
    /// Create a configuration with documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a dynamic JSON option bag.
    ///
    /// The `eventFilter` entry goes through [`EventFilterSource::from_value`],
    /// so a source that is neither string nor array fails with
    /// [`Error::InvalidArgument`] before anything else is looked at, while
    /// non-string entries inside an array are dropped silently like any
    /// other unknown token. The remaining keys deserialize onto the
    /// documented defaults.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self> {
        let filter = match value.get("eventFilter") {
            Some(raw) => Some(EventFilterSource::from_value(raw)?),
            None => None,
        };
        if let Some(bag) = value.as_object_mut() {
            bag.remove("eventFilter");
        }
        let mut config: Self =
            serde_json::from_value(value).map_err(|err| Error::InvalidArgument(err.to_string()))?;
        if let Some(filter) = filter {
            config.event_filter = filter;
        }
        Ok(config)
    }

    /// Set async mode.
    pub fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Set the whitelist source.
    pub fn with_event_filter(mut self, source: impl Into<EventFilterSource>) -> Self {
        self.event_filter = source.into();
        self
    }

    /// Set symlink following for the metadata step.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enable or disable the content-read step.
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Set buffered vs streaming contents.
    pub fn with_buffer(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Enable or disable BOM stripping.
    pub fn with_strip_bom(mut self, strip: bool) -> Self {
        self.strip_bom = strip;
        self
    }

    /// Set the modification-time cutoff.
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Normalize the whitelist source into a canonical kind set.
    pub fn whitelist(&self) -> Whitelist {
        Whitelist::normalize(&self.event_filter)
    }

    /// Derive the option subset for the metadata step.
    pub fn stat_options(&self) -> StatOptions {
        StatOptions {
            follow_symlinks: self.follow_symlinks,
        }
    }

    /// Derive the option subset for the content-read step.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            buffer: self.buffer,
            strip_bom: self.strip_bom,
        }
    }
}

/// Options the metadata-attach step sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatOptions {
    /// Follow symlinks rather than stat-ing the link itself.
    pub follow_symlinks: bool,
}

/// Options the content-read step sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Read fully into memory.
    pub buffer: bool,
    /// Strip a leading UTF-8 BOM from buffered contents.
    pub strip_bom: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_surface() {
        let config = VinylifyConfig::default();
        assert!(config.async_mode);
        assert!(config.follow_symlinks);
        assert!(config.read);
        assert!(config.buffer);
        assert!(config.strip_bom);
        assert!(config.since.is_none());

        let whitelist = config.whitelist();
        assert!(whitelist.contains(EventKind::Add));
        assert!(whitelist.contains(EventKind::Change));
        assert!(whitelist.contains(EventKind::Unlink));
        assert!(!whitelist.contains(EventKind::AddDir));
        assert!(!whitelist.contains(EventKind::UnlinkDir));
    }

    #[test]
    fn from_value_parses_option_bag() {
        let config = VinylifyConfig::from_value(json!({
            "async": false,
            "eventFilter": "all",
            "read": false,
        }))
        .unwrap();
        assert!(!config.async_mode);
        assert!(!config.read);
        // untouched keys keep their defaults
        assert!(config.buffer);
        assert_eq!(config.whitelist(), Whitelist::full());
    }

    #[test]
    fn from_value_drops_non_string_filter_entries_like_the_typed_path() {
        let config =
            VinylifyConfig::from_value(json!({ "eventFilter": ["add", 3, null] })).unwrap();
        assert_eq!(config.event_filter, EventFilterSource::from(vec!["add"]));
        assert!(config.whitelist().contains(EventKind::Add));
        assert_eq!(config.whitelist().len(), 1);
    }

    #[test]
    fn from_value_rejects_bad_event_filter() {
        let err = VinylifyConfig::from_value(json!({ "eventFilter": 12 })).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn option_subsets_never_expose_filter_or_read_flags() {
        let config = VinylifyConfig::default()
            .with_follow_symlinks(false)
            .with_buffer(false)
            .with_strip_bom(false);
        assert_eq!(
            config.stat_options(),
            StatOptions {
                follow_symlinks: false
            }
        );
        assert_eq!(
            config.read_options(),
            ReadOptions {
                buffer: false,
                strip_bom: false
            }
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = VinylifyConfig::default().with_event_filter("add");
        let text = serde_json::to_string(&config).unwrap();
        let back: VinylifyConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
