//! Static structure of behavior nets.
//!
//! A [`BehaviorNet`] owns its places and transitions in two arenas addressed
//! by [`PlaceId`] and [`TransitionId`]. Arcs are stored as index sets on both
//! endpoints; the mutating helpers update both sides in one call so the
//! bidirectional adjacency invariant can never be observed broken.

mod dot;
mod guard;

pub use guard::{ApiCallGuard, TransitionGuard};

/// Stable handle to a place within its owning net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceId(pub(crate) usize);

impl PlaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Stable handle to a transition within its owning net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(pub(crate) usize);

impl TransitionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A place: holds tokens during evaluation, optionally marks acceptance.
#[derive(Debug, Clone)]
pub struct Place {
    name: String,
    accepting: bool,
    inputs: Vec<TransitionId>,
    outputs: Vec<TransitionId>,
}

impl Place {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Transitions that deposit tokens into this place.
    pub fn input_transitions(&self) -> &[TransitionId] {
        &self.inputs
    }

    /// Transitions that consume tokens from this place.
    pub fn output_transitions(&self) -> &[TransitionId] {
        &self.outputs
    }
}

/// A transition: consumes tokens from its input places and deposits merged
/// tokens into its output places when its guard matches an event.
#[derive(Debug, Clone)]
pub struct Transition {
    name: String,
    inputs: Vec<PlaceId>,
    outputs: Vec<PlaceId>,
    guard: TransitionGuard,
}

impl Transition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_places(&self) -> &[PlaceId] {
        &self.inputs
    }

    pub fn output_places(&self) -> &[PlaceId] {
        &self.outputs
    }

    pub fn guard(&self) -> &TransitionGuard {
        &self.guard
    }
}

/// A compiled behavior net. Defines structure only; evaluation state lives in
/// [`Marking`](crate::eval::Marking).
///
/// The net itself permits duplicate place/transition names; uniqueness is
/// enforced by the DSL compiler, which needs names as identifiers for edge
/// resolution.
#[derive(Debug, Clone, Default)]
pub struct BehaviorNet {
    name: Option<String>,
    places: Vec<Place>,
    transitions: Vec<Transition>,
}

impl BehaviorNet {
    /// Creates an empty, unnamed net.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, named net.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn place(&self, id: PlaceId) -> &Place {
        &self.places[id.0]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0]
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn places(&self) -> impl Iterator<Item = PlaceId> {
        (0..self.places.len()).map(PlaceId)
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> {
        (0..self.transitions.len()).map(TransitionId)
    }

    /// Places flagged as accepting.
    pub fn accepting_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.places
            .iter()
            .enumerate()
            .filter(|(_, p)| p.accepting)
            .map(|(i, _)| PlaceId(i))
    }

    pub fn add_place(&mut self, name: impl Into<String>) -> PlaceId {
        let id = PlaceId(self.places.len());
        self.places.push(Place {
            name: name.into(),
            accepting: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        id
    }

    pub fn add_places<I>(&mut self, names: I) -> Vec<PlaceId>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        names.into_iter().map(|name| self.add_place(name)).collect()
    }

    pub fn set_accepting(&mut self, place: PlaceId, accepting: bool) {
        self.places[place.0].accepting = accepting;
    }

    /// Adds a transition and returns a fluent handle for wiring it up.
    pub fn add_transition(&mut self, name: impl Into<String>) -> TransitionHandle<'_> {
        let id = TransitionId(self.transitions.len());
        self.transitions.push(Transition {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            guard: TransitionGuard::Identity,
        });
        TransitionHandle { net: self, id }
    }

    pub fn set_guard(&mut self, transition: TransitionId, guard: TransitionGuard) {
        self.transitions[transition.0].guard = guard;
    }

    /// Connects `place` as an input of `transition`, mirroring the arc into
    /// the place's output-transition set. Returns `false` if the arc already
    /// existed.
    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId) -> bool {
        if self.transitions[transition.0].inputs.contains(&place) {
            return false;
        }
        self.transitions[transition.0].inputs.push(place);
        self.places[place.0].outputs.push(transition);
        true
    }

    /// Connects `place` as an output of `transition`, mirroring the arc into
    /// the place's input-transition set. Returns `false` if the arc already
    /// existed.
    pub fn add_output_arc(&mut self, transition: TransitionId, place: PlaceId) -> bool {
        if self.transitions[transition.0].outputs.contains(&place) {
            return false;
        }
        self.transitions[transition.0].outputs.push(place);
        self.places[place.0].inputs.push(transition);
        true
    }

    /// Removes the input arc between `place` and `transition` from both
    /// endpoints. Returns `false` if no such arc existed.
    pub fn remove_input_arc(&mut self, place: PlaceId, transition: TransitionId) -> bool {
        let inputs = &mut self.transitions[transition.0].inputs;
        let Some(pos) = inputs.iter().position(|p| *p == place) else {
            return false;
        };
        inputs.remove(pos);
        self.places[place.0].outputs.retain(|t| *t != transition);
        true
    }

    /// Removes the output arc between `transition` and `place` from both
    /// endpoints. Returns `false` if no such arc existed.
    pub fn remove_output_arc(&mut self, transition: TransitionId, place: PlaceId) -> bool {
        let outputs = &mut self.transitions[transition.0].outputs;
        let Some(pos) = outputs.iter().position(|p| *p == place) else {
            return false;
        };
        outputs.remove(pos);
        self.places[place.0].inputs.retain(|t| *t != transition);
        true
    }

    /// Serializes the net structure to the GraphViz DOT language. Diagnostic
    /// export only, not used during evaluation.
    pub fn to_graphviz(&self) -> String {
        dot::DotView(self).to_string()
    }
}

/// Fluent builder handle returned by [`BehaviorNet::add_transition`].
///
/// Every method returns the handle again so transitions can be declared in
/// one chain, mirroring how compiled nets read in the DSL.
pub struct TransitionHandle<'a> {
    net: &'a mut BehaviorNet,
    id: TransitionId,
}

impl TransitionHandle<'_> {
    pub fn with_input(self, place: PlaceId) -> Self {
        self.net.add_input_arc(place, self.id);
        self
    }

    pub fn with_inputs(self, places: impl IntoIterator<Item = PlaceId>) -> Self {
        places.into_iter().fold(self, Self::with_input)
    }

    pub fn with_output(self, place: PlaceId) -> Self {
        self.net.add_output_arc(self.id, place);
        self
    }

    pub fn with_outputs(self, places: impl IntoIterator<Item = PlaceId>) -> Self {
        places.into_iter().fold(self, Self::with_output)
    }

    pub fn with_function(self, guard: impl Into<TransitionGuard>) -> Self {
        self.net.set_guard(self.id, guard.into());
        self
    }

    pub fn id(self) -> TransitionId {
        self.id
    }
}
