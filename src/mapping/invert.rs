//! Flash/invert state machine, stepped once per frame by the clock.

/// Tolerance for comparing accumulated ms timestamps against durations
const TIME_EPSILON: f64 = 1e-6;

/// FSM phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvertPhase {
    Idle,

    /// Flash running since `started_at` (clock native unit)
    Active { started_at: f64 },
}

/// What happened on one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertTransition {
    None,
    Started,
    Ended,
}

/// Flash timing, in the clock's native unit
#[derive(Debug, Clone, Copy)]
pub struct FlashTiming {
    /// Smoothed low intensity that arms the flash
    pub threshold: f32,

    /// Minimum gap between flash starts
    pub cooldown: f64,

    /// Flash length
    pub duration: f64,
}

/// Flash state carried in the render state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvertState {
    pub phase: InvertPhase,

    /// Start time of the most recent flash
    pub last_trigger: Option<f64>,
}

impl Default for InvertState {
    fn default() -> Self {
        Self {
            phase: InvertPhase::Idle,
            last_trigger: None,
        }
    }
}

impl InvertState {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, InvertPhase::Active { .. })
    }

    /// Start time of the running flash, if any
    pub fn started_at(&self) -> Option<f64> {
        match self.phase {
            InvertPhase::Active { started_at } => Some(started_at),
            InvertPhase::Idle => None,
        }
    }

    /// Advance one frame.
    ///
    /// An Active flash ends once `duration` has elapsed since its start. An
    /// Idle machine starts a flash when `low` exceeds the threshold and
    /// `cooldown` has elapsed since the previous start (the first trigger is
    /// never held back). Ending is checked first, so a flash can end and
    /// retrigger on the same frame when cooldown allows; that step reports
    /// `Started`.
    pub fn step(&mut self, timing: &FlashTiming, low: f32, now: f64) -> InvertTransition {
        let mut transition = InvertTransition::None;

        if let InvertPhase::Active { started_at } = self.phase {
            if elapsed(started_at, now) + TIME_EPSILON >= timing.duration {
                self.phase = InvertPhase::Idle;
                transition = InvertTransition::Ended;
            } else {
                return InvertTransition::None;
            }
        }

        let cooled = self
            .last_trigger
            .map_or(true, |last| elapsed(last, now) + TIME_EPSILON >= timing.cooldown);

        // Zero-length flashes never become visible
        if low > timing.threshold && cooled && timing.duration > 0.0 {
            self.phase = InvertPhase::Active { started_at: now };
            self.last_trigger = Some(now);
            return InvertTransition::Started;
        }

        transition
    }
}

/// Elapsed time; a clock that went backwards reads as no time
fn elapsed(since: f64, now: f64) -> f64 {
    (now - since).max(0.0)
}
