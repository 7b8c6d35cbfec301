//! Single-net evaluator: feeds events to a marking, one at a time.

use std::sync::Arc;

use crate::error::Result;
use crate::eval::Marking;
use crate::event::ExecutionEvent;
use crate::net::{BehaviorNet, PlaceId};

/// Advances a [`Marking`] through an event stream by firing every enabled
/// transition whose guard matches the current event.
#[derive(Debug, Clone)]
pub struct NetEvaluator {
    marking: Marking,
    accepting: Vec<PlaceId>,
}

impl NetEvaluator {
    pub fn new(net: Arc<BehaviorNet>) -> Self {
        let accepting = net.accepting_places().collect();
        Self {
            marking: Marking::new(net),
            accepting,
        }
    }

    pub fn net(&self) -> &Arc<BehaviorNet> {
        self.marking.net()
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    pub fn into_marking(self) -> Marking {
        self.marking
    }

    /// Whether any accepting place holds at least one token.
    pub fn is_accepting(&self) -> bool {
        self.accepting
            .iter()
            .any(|place| !self.marking.tokens(*place).is_empty())
    }

    /// Feeds one event to the net and fires all transitions it enables.
    ///
    /// For every transition whose guard can match the event, every
    /// compatible combination of input tokens is tried independently; each
    /// match deposits its extended token into all output places. Input
    /// tokens are left in place so later events can match them again.
    pub fn step(&mut self, event: &ExecutionEvent) -> Result<()> {
        let net = Arc::clone(self.marking.net());

        for id in net.transitions() {
            let transition = net.transition(id);

            // Cheap pre-check: skip the enablement enumeration entirely when
            // the guard names an API other than the event's.
            if let Some(name) = transition.guard().api_name() {
                if name != event.name {
                    continue;
                }
            }

            let possible_merges = self.marking.possible_merges(id);
            for merge in possible_merges.iter() {
                let mut token = merge.clone();
                if !transition.guard().evaluate(event, &mut token)? {
                    continue;
                }
                for place in transition.output_places() {
                    self.marking.add_token(*place, token.clone());
                }
            }
        }

        Ok(())
    }
}
