/// Acquisition session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopped
///  ↑                    │
///  └────── reset ───────┘
/// ```
/// Starting again from `Stopped` begins a fresh recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    Idle,
    Recording { duration_secs: f64 },
    Stopped { duration_secs: f64 },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }

    /// Returns the current duration if in a state that tracks it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } | Self::Stopped { duration_secs } => {
                Some(*duration_secs)
            }
            Self::Idle => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
            Self::Stopped { .. } => "stopped",
        }
    }
}
