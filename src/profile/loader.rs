//! Profile files.
//!
//! Two TOML layouts are accepted:
//!
//! ```toml
//! # canonical: one source, views generated
//! name = "club"
//! [shared]
//! trail_decay = 0.9
//! [durations_ms]
//! inversion_cooldown = 500
//! [calibration.continuous]
//! analysis_gain = 1.0
//! [calibration.frame_indexed]
//! analysis_gain = 1.15
//! ```
//!
//! ```toml
//! # legacy pair: two hand-maintained views, parity-checked on load
//! [continuous]
//! inversion_cooldown_ms = 500
//! [frame_indexed]
//! inversion_cooldown_frames = 15
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Environment, ProfileError, ProfileSet, ProfileSource, ProfileValue, ProfileView};

/// Legacy two-view file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub continuous: BTreeMap<String, ProfileValue>,
    pub frame_indexed: BTreeMap<String, ProfileValue>,
}

/// Parse profile TOML in either layout
///
/// `fallback_name` names legacy files that carry no `name` key.
pub fn parse_profile(text: &str, fallback_name: &str) -> Result<ProfileSet, ProfileError> {
    let value: toml::Value = toml::from_str(text)?;

    let table = value
        .as_table()
        .ok_or_else(|| ProfileError::MalformedFile("expected a table at the top level".into()))?;

    let legacy = table.contains_key("continuous") || table.contains_key("frame_indexed");
    let canonical = table.contains_key("shared")
        || table.contains_key("durations_ms")
        || table.contains_key("calibration");

    match (legacy, canonical) {
        (true, true) => Err(ProfileError::MalformedFile(
            "mixes canonical tables with legacy [continuous]/[frame_indexed] views".into(),
        )),
        (true, false) => {
            let pair: LegacyPair = value.try_into()?;
            let name = pair.name.unwrap_or_else(|| fallback_name.to_string());
            tracing::debug!(profile = %name, "Parsing legacy profile pair");

            ProfileSet::new(
                name,
                ProfileView::new(Environment::Continuous, pair.continuous),
                ProfileView::new(Environment::FrameIndexed, pair.frame_indexed),
            )
        }
        (false, _) => {
            let source: ProfileSource = value.try_into()?;
            tracing::debug!(profile = %source.name, "Parsing canonical profile");
            source.compile()
        }
    }
}

/// Load a profile file from disk
pub fn load_profile(path: &Path) -> Result<ProfileSet, ProfileError> {
    let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("custom");

    let set = parse_profile(&text, fallback)?;
    tracing::info!(profile = %set.name, path = %path.display(), "Loaded profile");
    Ok(set)
}
