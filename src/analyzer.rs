//! Analysis of whole event streams against a set of behavior nets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::eval::{Marking, NetEvaluator};
use crate::event::EventStream;
use crate::net::BehaviorNet;

/// Cooperative cancellation flag checked between events.
///
/// Cloning shares the flag, so a handle kept by the caller can cancel an
/// analysis running on another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Outcome of analyzing one event stream.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    markings: Vec<Marking>,
    detected: Vec<Marking>,
}

impl AnalysisResult {
    /// Final markings of every net that was evaluated, detected or not.
    pub fn markings(&self) -> &[Marking] {
        &self.markings
    }

    /// Markings of the nets that reached an accepting place, snapshotted at
    /// the moment of acceptance.
    pub fn detected(&self) -> &[Marking] {
        &self.detected
    }

    pub fn has_detections(&self) -> bool {
        !self.detected.is_empty()
    }
}

/// Runs a collection of behavior nets over event streams and reports which
/// behaviors were recognized.
#[derive(Debug, Clone, Default)]
pub struct StreamAnalyzer {
    behaviors: Vec<Arc<BehaviorNet>>,
}

impl StreamAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_behavior(&mut self, net: Arc<BehaviorNet>) {
        self.behaviors.push(net);
    }

    pub fn behaviors(&self) -> &[Arc<BehaviorNet>] {
        &self.behaviors
    }

    /// Analyzes one event stream against all registered behaviors.
    ///
    /// Each net gets a fresh evaluator. A net is dropped from further
    /// evaluation as soon as it accepts; its marking at that moment is
    /// recorded as a detection. Cancellation is checked before each event
    /// and ends the analysis early with the results so far.
    pub fn analyze(
        &self,
        stream: &EventStream,
        cancellation: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let mut evaluators: Vec<NetEvaluator> = self
            .behaviors
            .iter()
            .map(|net| NetEvaluator::new(Arc::clone(net)))
            .collect();
        let mut active = vec![true; evaluators.len()];
        let mut detected = Vec::new();

        for event in stream.events() {
            if cancellation.is_cancelled() {
                break;
            }

            for (i, evaluator) in evaluators.iter_mut().enumerate() {
                if !active[i] {
                    continue;
                }
                evaluator.step(event)?;
                if evaluator.is_accepting() {
                    detected.push(evaluator.marking().clone());
                    active[i] = false;
                }
            }
        }

        Ok(AnalysisResult {
            markings: evaluators.into_iter().map(NetEvaluator::into_marking).collect(),
            detected,
        })
    }

    /// Analyzes several event streams in parallel, one result per stream in
    /// input order.
    pub fn analyze_all(
        &self,
        streams: &[EventStream],
        cancellation: &CancellationToken,
    ) -> Result<Vec<AnalysisResult>> {
        streams
            .par_iter()
            .map(|stream| self.analyze(stream, cancellation))
            .collect()
    }
}
