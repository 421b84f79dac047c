// Observable simulation events.
//
// `SimEvent` is the sim's output channel, returned from `SimState::step` in
// `StepResult::events`. It carries the one-line chat notifications a goal
// emits when it cannot proceed (unknown group, unknown waypoint), the
// lifecycle of behaviour frames, and nav-graph size changes after block
// updates. Events are ordered by the tick they were produced on and, within
// a tick, by production order.
//
// See also: `sim.rs` which collects these, `behaviour.rs` which emits the
// chat and lifecycle events.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// A line the bot says in chat.
    Chat { message: String },
    /// A behaviour frame was pushed.
    BehaviourStarted { name: String },
    /// A behaviour frame ended and was popped.
    BehaviourFinished { name: String, success: bool },
    /// A behaviour frame was abandoned by cancellation.
    BehaviourCancelled { name: String },
    /// The nav graph changed size.
    NavGraphChanged { nodes: usize, edges: usize },
}

impl SimEvent {
    pub fn chat_message(&self) -> Option<&str> {
        match &self.kind {
            SimEventKind::Chat { message } => Some(message),
            _ => None,
        }
    }
}
