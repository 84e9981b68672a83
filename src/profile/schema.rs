//! Canonical profile schema and per-environment views.
//!
//! Every profile key is declared once in [`FIELDS`] with a sharing tag and a
//! unit. Both environment views are generated from a single
//! [`ProfileSource`], and hand-maintained view pairs are checked with
//! [`validate_parity`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Environment, ProfileError};

/// Canonical unit of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Dimensionless or environment-independent unit
    None,

    /// Duration: `*_ms` in the continuous view, `*_frames` in the frame-indexed view
    Milliseconds,
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Flag,
}

/// Schema entry for one profile key
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical key (no unit suffix)
    pub name: &'static str,

    /// `true`: both views hold the same value (after unit conversion).
    /// `false`: analysis calibration, free to differ per environment.
    pub shared: bool,

    pub unit: Unit,
    pub kind: ValueKind,
}

const fn shared(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shared: true,
        unit: Unit::None,
        kind: ValueKind::Number,
    }
}

const fn flag(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shared: true,
        unit: Unit::None,
        kind: ValueKind::Flag,
    }
}

const fn duration(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shared: true,
        unit: Unit::Milliseconds,
        kind: ValueKind::Number,
    }
}

const fn calibration(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shared: false,
        unit: Unit::None,
        kind: ValueKind::Number,
    }
}

/// Every key a profile carries
pub const FIELDS: &[FieldSpec] = &[
    shared("target_frame_rate"),
    shared("fft_size"),
    // Bands
    shared("low_min_hz"),
    shared("low_max_hz"),
    shared("low_exponent"),
    shared("low_smoothing"),
    shared("mid_min_hz"),
    shared("mid_max_hz"),
    shared("mid_exponent"),
    shared("mid_smoothing"),
    shared("high_min_hz"),
    shared("high_max_hz"),
    shared("high_exponent"),
    shared("high_smoothing"),
    // Mapping
    shared("scale_min"),
    shared("scale_range"),
    shared("rotation_speed"),
    shared("distortion_threshold"),
    shared("distortion_base_speed"),
    shared("distortion_speed_multiplier"),
    shared("warp_amplitude"),
    shared("hue_shift_multiplier"),
    shared("inversion_bass_threshold"),
    shared("trail_decay"),
    flag("trail_decay_loudness_modulation"),
    shared("trail_decay_loudness_gain"),
    shared("max_frame_delta"),
    // Compositing
    shared("glow_strength"),
    shared("edge_strength"),
    shared("saturation_boost"),
    shared("value_boost"),
    shared("invert_luma_floor"),
    // Flash timing
    duration("inversion_cooldown"),
    duration("inversion_duration"),
    // Analysis calibration
    calibration("source_max_energy"),
    calibration("analysis_gain"),
    calibration("min_decibels"),
    calibration("max_decibels"),
];

/// Look up a field by canonical name
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Key a field carries in one environment's view
pub fn view_key(spec: &FieldSpec, environment: Environment) -> String {
    match spec.unit {
        Unit::None => spec.name.to_string(),
        Unit::Milliseconds => format!("{}_{}", spec.name, environment.duration_suffix()),
    }
}

/// Resolve a view key back to its field, checking the unit suffix
fn classify(key: &str, environment: Environment) -> Result<&'static FieldSpec, ProfileError> {
    if let Some(spec) = field(key) {
        if spec.unit == Unit::None {
            return Ok(spec);
        }
    }

    for env in [Environment::Continuous, Environment::FrameIndexed] {
        let suffix = format!("_{}", env.duration_suffix());
        if let Some(base) = key.strip_suffix(&suffix) {
            if let Some(spec) = field(base).filter(|s| s.unit == Unit::Milliseconds) {
                if env != environment {
                    return Err(ProfileError::UnitSuffixMismatch {
                        environment,
                        key: key.to_string(),
                    });
                }
                return Ok(spec);
            }
        }
    }

    Err(ProfileError::UnknownKey(key.to_string()))
}

/// `frames = round(ms / (1000 / fps))`
pub fn ms_to_frames(ms: f64, target_frame_rate: f64) -> f64 {
    (ms / (1000.0 / target_frame_rate)).round()
}

/// One profile value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Flag(bool),
    Number(f64),
}

impl ProfileValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Number(_) => None,
        }
    }

    fn matches(&self, kind: ValueKind) -> bool {
        matches!(
            (self, kind),
            (Self::Number(_), ValueKind::Number) | (Self::Flag(_), ValueKind::Flag)
        )
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Flat key/value bundle for one environment
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub environment: Environment,
    pub values: BTreeMap<String, ProfileValue>,
}

impl ProfileView {
    pub fn new(environment: Environment, values: BTreeMap<String, ProfileValue>) -> Self {
        Self {
            environment,
            values,
        }
    }

    pub fn get(&self, key: &str) -> Result<ProfileValue, ProfileError> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| ProfileError::MissingKey {
                environment: self.environment,
                key: key.to_string(),
            })
    }

    pub fn number(&self, key: &str) -> Result<f64, ProfileError> {
        self.get(key)?
            .as_number()
            .ok_or_else(|| ProfileError::WrongType {
                key: key.to_string(),
                expected: "number",
            })
    }

    pub fn flag(&self, key: &str) -> Result<bool, ProfileError> {
        self.get(key)?.as_flag().ok_or_else(|| ProfileError::WrongType {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    /// Every schema field is present with the right suffix and type, and no
    /// unknown keys are present
    pub fn check_complete(&self) -> Result<(), ProfileError> {
        for key in self.values.keys() {
            classify(key, self.environment)?;
        }

        for spec in FIELDS {
            let key = view_key(spec, self.environment);
            if !self.get(&key)?.matches(spec.kind) {
                return Err(ProfileError::WrongType {
                    key,
                    expected: match spec.kind {
                        ValueKind::Number => "number",
                        ValueKind::Flag => "boolean",
                    },
                });
            }
        }

        Ok(())
    }
}

/// Per-environment calibration tables of a canonical profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTables {
    #[serde(default)]
    pub continuous: BTreeMap<String, ProfileValue>,

    #[serde(default)]
    pub frame_indexed: BTreeMap<String, ProfileValue>,
}

impl CalibrationTables {
    fn for_environment(&self, environment: Environment) -> &BTreeMap<String, ProfileValue> {
        match environment {
            Environment::Continuous => &self.continuous,
            Environment::FrameIndexed => &self.frame_indexed,
        }
    }
}

/// Canonical profile: the single source both environment views derive from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSource {
    pub name: String,

    /// Shared, unit-less values
    #[serde(default)]
    pub shared: BTreeMap<String, ProfileValue>,

    /// Durations in milliseconds (canonical unit)
    #[serde(default)]
    pub durations_ms: BTreeMap<String, f64>,

    #[serde(default)]
    pub calibration: CalibrationTables,
}

impl ProfileSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: BTreeMap::new(),
            durations_ms: BTreeMap::new(),
            calibration: CalibrationTables::default(),
        }
    }

    pub fn with_shared(mut self, key: &str, value: f64) -> Self {
        self.shared
            .insert(key.to_string(), ProfileValue::Number(value));
        self
    }

    pub fn with_flag(mut self, key: &str, value: bool) -> Self {
        self.shared.insert(key.to_string(), ProfileValue::Flag(value));
        self
    }

    pub fn with_duration_ms(mut self, key: &str, ms: f64) -> Self {
        self.durations_ms.insert(key.to_string(), ms);
        self
    }

    pub fn with_calibration(mut self, environment: Environment, key: &str, value: f64) -> Self {
        let table = match environment {
            Environment::Continuous => &mut self.calibration.continuous,
            Environment::FrameIndexed => &mut self.calibration.frame_indexed,
        };
        table.insert(key.to_string(), ProfileValue::Number(value));
        self
    }

    /// Reject keys the schema does not know or files under the wrong table
    fn check_keys(&self) -> Result<(), ProfileError> {
        for key in self.shared.keys() {
            match field(key) {
                Some(spec) if spec.shared && spec.unit == Unit::None => {}
                _ => return Err(ProfileError::UnknownKey(format!("shared.{}", key))),
            }
        }
        for key in self.durations_ms.keys() {
            match field(key) {
                Some(spec) if spec.unit == Unit::Milliseconds => {}
                _ => return Err(ProfileError::UnknownKey(format!("durations_ms.{}", key))),
            }
        }
        for env in [Environment::Continuous, Environment::FrameIndexed] {
            for key in self.calibration.for_environment(env).keys() {
                match field(key) {
                    Some(spec) if !spec.shared => {}
                    _ => {
                        return Err(ProfileError::UnknownKey(format!(
                            "calibration.{}.{}",
                            env, key
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Generate one environment's view
    pub fn view(&self, environment: Environment) -> Result<ProfileView, ProfileError> {
        self.check_keys()?;

        let missing = |key: &str| ProfileError::MissingKey {
            environment,
            key: key.to_string(),
        };

        let fps = self
            .shared
            .get("target_frame_rate")
            .and_then(ProfileValue::as_number)
            .ok_or_else(|| missing("target_frame_rate"))?;

        let mut values = BTreeMap::new();
        for spec in FIELDS {
            let value = match (spec.shared, spec.unit) {
                (true, Unit::None) => *self.shared.get(spec.name).ok_or_else(|| missing(spec.name))?,
                (_, Unit::Milliseconds) => {
                    let ms = *self
                        .durations_ms
                        .get(spec.name)
                        .ok_or_else(|| missing(spec.name))?;
                    match environment {
                        Environment::Continuous => ProfileValue::Number(ms),
                        Environment::FrameIndexed => ProfileValue::Number(ms_to_frames(ms, fps)),
                    }
                }
                (false, Unit::None) => *self
                    .calibration
                    .for_environment(environment)
                    .get(spec.name)
                    .ok_or_else(|| missing(spec.name))?,
            };
            values.insert(view_key(spec, environment), value);
        }

        let view = ProfileView::new(environment, values);
        view.check_complete()?;
        Ok(view)
    }

    /// Generate both views and check their parity
    pub fn compile(&self) -> Result<super::ProfileSet, ProfileError> {
        let continuous = self.view(Environment::Continuous)?;
        let frame_indexed = self.view(Environment::FrameIndexed)?;
        super::ProfileSet::new(self.name.clone(), continuous, frame_indexed)
    }

    /// Shortcut: compile and resolve for one environment
    pub fn resolve(&self, environment: Environment) -> Result<super::Profile, ProfileError> {
        self.compile()?.resolve(environment)
    }
}

/// Check that a continuous view and a frame-indexed view describe the same look
///
/// - every key has a counterpart in the other view
/// - duration keys carry `_ms` / `_frames` on the correct side
/// - shared values are identical
/// - `frames == round(ms / (1000 / target_frame_rate))`
pub fn validate_parity(
    continuous: &ProfileView,
    frame_indexed: &ProfileView,
) -> Result<(), ProfileError> {
    for (view, expected) in [
        (continuous, Environment::Continuous),
        (frame_indexed, Environment::FrameIndexed),
    ] {
        if view.environment != expected {
            return Err(ProfileError::MalformedFile(format!(
                "expected a {} view, got {}",
                expected, view.environment
            )));
        }
    }

    // Counterparts, both directions
    for (from, to) in [(continuous, frame_indexed), (frame_indexed, continuous)] {
        for key in from.values.keys() {
            let spec = classify(key, from.environment)?;
            let counterpart = view_key(spec, to.environment);
            if !to.values.contains_key(&counterpart) {
                return Err(ProfileError::MissingCounterpart {
                    key: key.clone(),
                    environment: to.environment,
                });
            }
        }
    }

    continuous.check_complete()?;
    frame_indexed.check_complete()?;

    let fps = continuous.number("target_frame_rate")?;

    for spec in FIELDS.iter().filter(|s| s.shared) {
        let c_key = view_key(spec, Environment::Continuous);
        let f_key = view_key(spec, Environment::FrameIndexed);
        let c = continuous.get(&c_key)?;
        let f = frame_indexed.get(&f_key)?;

        match spec.unit {
            Unit::None => {
                if c != f {
                    return Err(ProfileError::Divergent {
                        key: spec.name.to_string(),
                        continuous: c,
                        frame_indexed: f,
                    });
                }
            }
            Unit::Milliseconds => {
                let ms = continuous.number(&c_key)?;
                let frames = frame_indexed.number(&f_key)?;
                let expected = ms_to_frames(ms, fps);
                if frames != expected {
                    return Err(ProfileError::InconsistentDuration {
                        field: spec.name.to_string(),
                        ms,
                        frames,
                        expected,
                    });
                }
            }
        }
    }

    Ok(())
}
