//! Markings: the mutable token state of a net under evaluation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::eval::Token;
use crate::net::{BehaviorNet, PlaceId, TransitionId};

/// The tokens currently present at each place of a net.
///
/// Matching never consumes tokens: a token deposited at a place stays there,
/// so one marking simultaneously tracks every partial match in progress.
/// Enablement enumeration is memoized per transition and invalidated whenever
/// a feeding place gains or loses a token.
#[derive(Debug, Clone)]
pub struct Marking {
    net: Arc<BehaviorNet>,
    tokens: Vec<HashSet<Token>>,
    merge_cache: Vec<Option<Arc<[Token]>>>,
}

impl Marking {
    /// Creates an empty marking for the net.
    pub fn new(net: Arc<BehaviorNet>) -> Self {
        let tokens = vec![HashSet::new(); net.place_count()];
        let merge_cache = vec![None; net.transition_count()];
        Self {
            net,
            tokens,
            merge_cache,
        }
    }

    pub fn net(&self) -> &Arc<BehaviorNet> {
        &self.net
    }

    /// The tokens present at `place`.
    pub fn tokens(&self, place: PlaceId) -> &HashSet<Token> {
        &self.tokens[place.index()]
    }

    /// Adds a token to a place. Returns `false` if an equal token was
    /// already present.
    pub fn add_token(&mut self, place: PlaceId, token: Token) -> bool {
        let added = self.tokens[place.index()].insert(token);
        if added {
            self.invalidate(place);
        }
        added
    }

    /// Removes a token from a place. Returns `false` if it was not present.
    pub fn remove_token(&mut self, place: PlaceId, token: &Token) -> bool {
        let removed = self.tokens[place.index()].remove(token);
        if removed {
            self.invalidate(place);
        }
        removed
    }

    fn invalidate(&mut self, place: PlaceId) {
        for transition in self.net.place(place).output_transitions() {
            self.merge_cache[transition.index()] = None;
        }
    }

    /// Whether the transition has at least one compatible combination of
    /// input tokens.
    pub fn is_enabled(&mut self, transition: TransitionId) -> bool {
        !self.possible_merges(transition).is_empty()
    }

    /// All merged tokens the transition could fire with, one per compatible
    /// combination of input-place tokens. The result is cached until a
    /// feeding place changes.
    pub fn possible_merges(&mut self, transition: TransitionId) -> Arc<[Token]> {
        if let Some(cached) = &self.merge_cache[transition.index()] {
            return Arc::clone(cached);
        }
        let merges = self.enumerate_merges(transition);
        self.merge_cache[transition.index()] = Some(Arc::clone(&merges));
        merges
    }

    fn enumerate_merges(&self, transition: TransitionId) -> Arc<[Token]> {
        let input_places = self.net.transition(transition).input_places();

        // Transitions without input places act as token generators and are
        // always enabled with a single empty token.
        if input_places.is_empty() {
            return Arc::from([Token::empty()]);
        }

        // Collect the token sets; an empty input place disables the
        // transition outright.
        let mut token_sets = Vec::with_capacity(input_places.len());
        let mut total_combinations = 1usize;
        for place in input_places {
            let tokens = &self.tokens[place.index()];
            if tokens.is_empty() {
                return Arc::from([]);
            }
            let tokens: Vec<&Token> = tokens.iter().collect();
            total_combinations *= tokens.len();
            token_sets.push(tokens);
        }

        // Enumerate the Cartesian product by interpreting each combination
        // index as a mixed-radix number where digit j selects a token from
        // set j. Incompatible combinations drop out at the first conflict.
        let mut merges = Vec::new();
        for i in 0..total_combinations {
            let mut merged = Some(Token::empty());
            let mut n = i;
            for set in &token_sets {
                let digit = n % set.len();
                n /= set.len();
                merged = match merged {
                    Some(token) => token.try_merge(set[digit]),
                    None => break,
                };
            }
            if let Some(token) = merged {
                merges.push(token);
            }
        }

        merges.into()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in self.net.places() {
            let tokens = &self.tokens[id.index()];
            if tokens.is_empty() {
                continue;
            }
            if !first {
                f.write_str("\n")?;
            }
            first = false;

            let mut rendered: Vec<String> = tokens.iter().map(Token::to_string).collect();
            rendered.sort();
            write!(f, "{}: {}", self.net.place(id).name(), rendered.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::BehaviorNet;

    fn chain() -> (Arc<BehaviorNet>, Vec<PlaceId>, TransitionId) {
        let mut net = BehaviorNet::new();
        let places = net.add_places(["p1", "p2", "p3"]);
        let t1 = net
            .add_transition("t1")
            .with_inputs([places[0], places[1]])
            .with_output(places[2])
            .id();
        (Arc::new(net), places, t1)
    }

    #[test]
    fn transition_without_tokens_is_disabled() {
        let (net, places, t1) = chain();
        let mut marking = Marking::new(net);
        marking.add_token(places[0], Token::empty().set("x", 1u64));

        // p2 is still empty.
        assert!(!marking.is_enabled(t1));
    }

    #[test]
    fn generator_transition_is_always_enabled() {
        let mut net = BehaviorNet::new();
        let p1 = net.add_place("p1");
        let t1 = net.add_transition("t1").with_output(p1).id();
        let mut marking = Marking::new(Arc::new(net));

        let merges = marking.possible_merges(t1);
        assert_eq!(merges.as_ref(), [Token::empty()]);
    }

    #[test]
    fn merges_are_the_compatible_cartesian_product() {
        let (net, places, t1) = chain();
        let mut marking = Marking::new(net);

        for i in 0..3u64 {
            marking.add_token(places[0], Token::empty().set("a", i));
        }
        for i in 0..2u64 {
            marking.add_token(places[1], Token::empty().set("b", i));
        }

        // Disjoint variables: all 3 x 2 combinations merge.
        let merges = marking.possible_merges(t1);
        assert_eq!(merges.len(), 6);
    }

    #[test]
    fn conflicting_combinations_are_dropped() {
        let (net, places, t1) = chain();
        let mut marking = Marking::new(net);

        marking.add_token(places[0], Token::empty().set("x", 1u64));
        marking.add_token(places[0], Token::empty().set("x", 2u64));
        marking.add_token(places[1], Token::empty().set("x", 2u64).set("y", 9u64));

        let merges = marking.possible_merges(t1);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0], Token::empty().set("x", 2u64).set("y", 9u64));
    }

    #[test]
    fn removing_a_token_disables_the_transition_again() {
        let (net, places, t1) = chain();
        let mut marking = Marking::new(net);

        let token = Token::empty().set("x", 1u64);
        marking.add_token(places[0], token.clone());
        marking.add_token(places[1], Token::empty());
        assert!(marking.is_enabled(t1));

        assert!(marking.remove_token(places[0], &token));
        assert!(!marking.is_enabled(t1));
    }

    #[test]
    fn duplicate_tokens_collapse() {
        let (net, places, _) = chain();
        let mut marking = Marking::new(net);

        let token = Token::empty().set("x", 1u64);
        assert!(marking.add_token(places[0], token.clone()));
        assert!(!marking.add_token(places[0], token));
        assert_eq!(marking.tokens(places[0]).len(), 1);
    }

    #[test]
    fn display_lists_occupied_places() {
        let (net, places, _) = chain();
        let mut marking = Marking::new(net);
        marking.add_token(places[2], Token::empty().set("x", 1u64));

        assert_eq!(marking.to_string(), "p3: {x: 1}");
    }
}
