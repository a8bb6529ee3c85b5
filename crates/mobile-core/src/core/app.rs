// crates/mobile-core/src/core/app.rs
// ============================================================================
// Module: Mobile Core App Model
// Description: App tenant record, client types, and reserved metadata keys.
// Purpose: Define the canonical shape of a registered mobile application.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`App`] is one registered mobile application tenant. Its `id` is
//! assigned once at creation (`<name>-<unix seconds>`) and doubles as the
//! backing record name. `labels` always carry the app group marker so
//! repositories can list apps with a label selector; `metadata` carries the
//! creation timestamp and the UI icon hint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label key marking a record as belonging to an app group.
pub const APP_GROUP_LABEL: &str = "group";
/// Label value carried by every app record.
pub const APP_GROUP_VALUE: &str = "mobileapp";
/// Label key mirroring the app name for label lookups.
pub const APP_NAME_LABEL: &str = "name";
/// Metadata key holding the creation timestamp.
pub const CREATED_METADATA_KEY: &str = "created";
/// Metadata key holding the UI icon hint.
pub const ICON_METADATA_KEY: &str = "icon";

// ============================================================================
// SECTION: Client Type
// ============================================================================

/// Mobile client platform of an app.
///
/// Unknown platform strings decode as [`ClientType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientType {
    /// Android native client.
    Android,
    /// iOS native client.
    Ios,
    /// Cordova hybrid client.
    Cordova,
    /// Any other or unspecified platform.
    #[default]
    Other,
}

impl ClientType {
    /// Returns the stable wire label for the client type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Cordova => "cordova",
            Self::Other => "other",
        }
    }

    /// Parses a wire label, falling back to [`ClientType::Other`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "android" => Self::Android,
            "ios" => Self::Ios,
            "cordova" => Self::Cordova,
            _ => Self::Other,
        }
    }

    /// Returns the UI icon hint for the client type, if any.
    #[must_use]
    pub const fn icon(self) -> Option<&'static str> {
        match self {
            Self::Android => Some("fa-android"),
            Self::Ios => Some("fa-apple"),
            Self::Cordova => Some("icon-cordova"),
            Self::Other => None,
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ClientType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClientType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

// ============================================================================
// SECTION: App
// ============================================================================

/// Registered mobile application tenant.
///
/// # Invariants
/// - `id` is empty until the repository assigns it at creation and never
///   changes afterwards.
/// - Persisted apps always carry `group=mobileapp` in `labels` and
///   `created` in `metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Stable identifier, `<name>-<unix seconds>`.
    #[serde(default)]
    pub id: String,
    /// Human identifier, unique among listed apps.
    pub name: String,
    /// Display name shown in consoles.
    #[serde(default)]
    pub display_name: String,
    /// Mobile client platform.
    #[serde(default)]
    pub client_type: ClientType,
    /// Copy of the API key issued at creation.
    #[serde(default)]
    pub api_key: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Record labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Record metadata (`created`, `icon`).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl App {
    /// Creates an unsaved app with the given name and client type.
    #[must_use]
    pub fn new(name: impl Into<String>, client_type: ClientType) -> Self {
        Self {
            name: name.into(),
            client_type,
            ..Self::default()
        }
    }

    /// Returns the app with a display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Returns the app with a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the creation timestamp, when recorded.
    #[must_use]
    pub fn created(&self) -> Option<&str> {
        self.metadata.get(CREATED_METADATA_KEY).map(String::as_str)
    }

    /// Returns the icon hint, when recorded.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.metadata.get(ICON_METADATA_KEY).map(String::as_str)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
