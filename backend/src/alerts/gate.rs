// =============================================================================
// Alert Gate — tier and phase transition detection
// =============================================================================
//
// Remembers the last action tier of each track and the last cycle phase.
// Each refresh cycle is compared against that memory; every change yields
// exactly one event and updates the stored value.  Unchanged inputs yield
// nothing, so repeated identical cycles are silent.
//
// Both tiers start at 0, so the very first cycle alerts only for tracks that
// open above tier 0.  The phase starts unknown and therefore always fires on
// the first cycle.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cycle::CyclePhase;
use crate::signals::CompositeScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTopic {
    Heat,
    Accumulation,
    CyclePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Escalation,
    DeEscalation,
}

/// One transition worth telling someone about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub topic: AlertTopic,
    /// `None` for phase changes, which have no ordering.
    pub direction: Option<Direction>,
    pub previous: String,
    pub current: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Process-wide transition memory.  Owned by the refresh pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub last_heat_level: u8,
    pub last_accumulation_level: u8,
    pub last_cycle_phase: Option<CyclePhase>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a cycle's results with the stored state, update it and return
    /// the resulting events (at most one per topic).
    pub fn observe(
        &mut self,
        heat: &CompositeScore,
        accumulation: &CompositeScore,
        phase: CyclePhase,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        if heat.level != self.last_heat_level {
            events.push(tier_event(AlertTopic::Heat, self.last_heat_level, heat, now));
            self.last_heat_level = heat.level;
        }

        if accumulation.level != self.last_accumulation_level {
            events.push(tier_event(
                AlertTopic::Accumulation,
                self.last_accumulation_level,
                accumulation,
                now,
            ));
            self.last_accumulation_level = accumulation.level;
        }

        if self.last_cycle_phase != Some(phase) {
            let previous = self
                .last_cycle_phase
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            events.push(AlertEvent {
                topic: AlertTopic::CyclePhase,
                direction: None,
                previous,
                current: phase.as_str().to_string(),
                message: format!("halving cycle entered {phase}: {}", phase.recommendation()),
                timestamp: now,
            });
            self.last_cycle_phase = Some(phase);
        }

        for event in &events {
            info!(
                topic = ?event.topic,
                from = %event.previous,
                to = %event.current,
                "alert transition"
            );
        }

        events
    }
}

fn tier_event(
    topic: AlertTopic,
    previous: u8,
    score: &CompositeScore,
    now: DateTime<Utc>,
) -> AlertEvent {
    let direction = if score.level > previous {
        Direction::Escalation
    } else {
        Direction::DeEscalation
    };
    let track = match topic {
        AlertTopic::Heat => "heat",
        _ => "accumulation",
    };
    let verb = match direction {
        Direction::Escalation => "rose",
        Direction::DeEscalation => "fell",
    };
    let mut message = format!(
        "{track} level {verb} from {previous} to {}: {} (score {:.1})",
        score.level, score.action, score.score
    );
    if let Some(amount) = score.dca_amount {
        message.push_str(&format!(", weekly DCA ${amount:.0}"));
    }

    AlertEvent {
        topic,
        direction: Some(direction),
        previous: previous.to_string(),
        current: score.level.to_string(),
        message,
        timestamp: now,
    }
}
