use std::time::Duration;

/// One named segment of a simulated progress animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    pub label: String,
    pub range_start: u8,
    pub range_end: u8,
    pub duration: Duration,
}

impl StageDescriptor {
    pub fn new(label: impl Into<String>, range_start: u8, range_end: u8, duration_ms: u64) -> Self {
        Self {
            label: label.into(),
            range_start,
            range_end,
            duration: Duration::from_millis(duration_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagePlanError {
    #[error("stage plan is empty")]
    Empty,
    #[error("stage {index} has zero duration")]
    ZeroDuration { index: usize },
    #[error("stage {index} starts at {start}% past its end {end}%")]
    Inverted { index: usize, start: u8, end: u8 },
    #[error("stage {index} ends at {end}%, not above the previous end {previous}%")]
    NotIncreasing { index: usize, end: u8, previous: u8 },
    #[error("stage {index} starts at {start}%, before the previous end {previous}%")]
    Overlapping { index: usize, start: u8, previous: u8 },
    #[error("final stage must end below 100% (ends at {0}%)")]
    ReachesCompletion(u8),
}

/// Ordered, validated stage sequence for one operation type.
///
/// `range_end` is strictly increasing and the last stage ends below 100, so
/// the tail of the bar is reserved for the real response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<StageDescriptor>,
}

/// Where the animation sits after some elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePosition {
    pub index: usize,
    pub percent: u8,
}

impl StagePlan {
    pub fn new(stages: Vec<StageDescriptor>) -> Result<Self, StagePlanError> {
        validate_stages(&stages)?;
        Ok(Self { stages })
    }

    /// Plans compiled into the crate; checked by the unit tests below.
    pub(crate) fn from_builtin(stages: Vec<StageDescriptor>) -> Self {
        debug_assert!(validate_stages(&stages).is_ok());
        Self { stages }
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    pub fn label(&self, index: usize) -> &str {
        self.stages
            .get(index)
            .or_else(|| self.stages.last())
            .map(|stage| stage.label.as_str())
            .unwrap_or_default()
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }

    /// Linear interpolation inside the active stage, clamped to its end.
    /// Once every stage is exhausted the final stage holds at its end.
    pub fn position_at(&self, elapsed: Duration) -> StagePosition {
        let mut remaining = elapsed;
        for (index, stage) in self.stages.iter().enumerate() {
            if remaining < stage.duration {
                let span = u128::from(stage.range_end - stage.range_start);
                let step = span * remaining.as_millis() / stage.duration.as_millis().max(1);
                let percent = stage.range_start + step.min(span) as u8;
                return StagePosition { index, percent };
            }
            remaining -= stage.duration;
        }
        let index = self.stages.len().saturating_sub(1);
        StagePosition {
            index,
            percent: self.stages.last().map_or(0, |stage| stage.range_end),
        }
    }
}

fn validate_stages(stages: &[StageDescriptor]) -> Result<(), StagePlanError> {
    let last = stages.last().ok_or(StagePlanError::Empty)?;
    let mut previous_end: Option<u8> = None;
    for (index, stage) in stages.iter().enumerate() {
        if stage.duration.is_zero() {
            return Err(StagePlanError::ZeroDuration { index });
        }
        if stage.range_start > stage.range_end {
            return Err(StagePlanError::Inverted {
                index,
                start: stage.range_start,
                end: stage.range_end,
            });
        }
        if let Some(previous) = previous_end {
            if stage.range_end <= previous {
                return Err(StagePlanError::NotIncreasing {
                    index,
                    end: stage.range_end,
                    previous,
                });
            }
            if stage.range_start < previous {
                return Err(StagePlanError::Overlapping {
                    index,
                    start: stage.range_start,
                    previous,
                });
            }
        }
        previous_end = Some(stage.range_end);
    }
    if last.range_end >= 100 {
        return Err(StagePlanError::ReachesCompletion(last.range_end));
    }
    Ok(())
}

/// Displayed state of a staged operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    #[default]
    Idle,
    Running {
        stage: usize,
        label: String,
        percent: u8,
    },
    Succeeded {
        message: String,
    },
    Failed {
        message: String,
    },
}

impl OperationStatus {
    pub fn percent(&self) -> u8 {
        match self {
            OperationStatus::Idle | OperationStatus::Failed { .. } => 0,
            OperationStatus::Running { percent, .. } => *percent,
            OperationStatus::Succeeded { .. } => 100,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, OperationStatus::Running { .. })
    }
}

/// Drives [`OperationStatus`] from elapsed time and the real outcome.
///
/// Displayed progress never decreases while running. Success snaps to 100
/// and records the last shown stage label; failure resets to 0.
#[derive(Debug, Clone)]
pub struct StageTracker {
    plan: StagePlan,
    status: OperationStatus,
}

impl StageTracker {
    pub fn new(plan: StagePlan) -> Self {
        Self {
            plan,
            status: OperationStatus::Idle,
        }
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    pub fn percent(&self) -> u8 {
        self.status.percent()
    }

    pub fn start(&mut self) {
        let first = self.plan.position_at(Duration::ZERO);
        self.status = OperationStatus::Running {
            stage: first.index,
            label: self.plan.label(first.index).to_string(),
            percent: first.percent,
        };
    }

    /// Advances the animation; returns true when the displayed state changed.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        let OperationStatus::Running { stage, percent, .. } = &self.status else {
            return false;
        };
        let position = self.plan.position_at(elapsed);
        let next_stage = position.index.max(*stage);
        let next_percent = position.percent.max(*percent);
        if next_stage == *stage && next_percent == *percent {
            return false;
        }
        self.status = OperationStatus::Running {
            stage: next_stage,
            label: self.plan.label(next_stage).to_string(),
            percent: next_percent,
        };
        true
    }

    pub fn succeed(&mut self) {
        let message = match &self.status {
            OperationStatus::Running { label, .. } => label.clone(),
            _ => self.plan.label(0).to_string(),
        };
        self.status = OperationStatus::Succeeded { message };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = OperationStatus::Failed {
            message: message.into(),
        };
    }
}
