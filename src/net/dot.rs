//! GraphViz DOT rendering of net structure.

use std::fmt;

use super::{BehaviorNet, TransitionGuard};

/// Display adapter behind [`BehaviorNet::to_graphviz`]. Places render as
/// ovals (double periphery when accepting), transitions as rectangles
/// labeled with their guard.
pub(super) struct DotView<'a>(pub &'a BehaviorNet);

impl fmt::Display for DotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.0;

        f.write_str("digraph ")?;
        if let Some(name) = net.name() {
            write_identifier(f, name)?;
            f.write_str(" ")?;
        }
        f.write_str("{\n")?;
        f.write_str("    node [fontname=\"Courier New\"]\n")?;

        for id in net.places() {
            let place = net.place(id);
            write!(f, "    p{} [label=", id.index())?;
            write_identifier(f, place.name())?;
            f.write_str(", shape=oval")?;
            if place.is_accepting() {
                f.write_str(", peripheries=2")?;
            }
            f.write_str("]\n")?;
        }

        for id in net.transitions() {
            let transition = net.transition(id);
            let label = match transition.guard() {
                TransitionGuard::Identity => transition.name().to_string(),
                guard => guard.to_string(),
            };
            write!(f, "    t{} [label=", id.index())?;
            write_identifier(f, &label)?;
            f.write_str(", shape=rectangle]\n")?;
        }

        for id in net.transitions() {
            let transition = net.transition(id);
            for place in transition.input_places() {
                writeln!(f, "    p{} -> t{}", place.index(), id.index())?;
            }
            for place in transition.output_places() {
                writeln!(f, "    t{} -> p{}", id.index(), place.index())?;
            }
        }

        f.write_str("}\n")
    }
}

// Newlines become "\l" so multi-line guard labels render left-aligned.
fn write_identifier(f: &mut fmt::Formatter<'_>, identifier: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in identifier.chars() {
        match c {
            '\n' => f.write_str("\\l")?,
            '"' | '\r' | '\t' | '\\' => write!(f, "\\{c}")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("\"")
}
