//! Node categories and per-mode cost weighting.
//!
//! Every node in a multi-modal network belongs to exactly one category.  The
//! loaded networks encode it in the first letter of the node id (`c…` car,
//! `b…` boat, `t…` transshipment); the two virtual slots are `start` and
//! `end`.  Ids without a recognised prefix are car nodes.

use serde::{Deserialize, Serialize};

/// The category (node type) of a network node.
///
/// The declaration order is the block order of the dense node index: all
/// car nodes first, then boat, transshipment, start and end.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    #[default]
    Car,
    Boat,
    Transshipment,
    /// Reserved virtual slot for a route's start point.
    Start,
    /// Reserved virtual slot for a route's end point.
    End,
}

impl NodeCategory {
    /// All categories in index-block order.
    pub const ALL: [NodeCategory; 5] = [
        NodeCategory::Car,
        NodeCategory::Boat,
        NodeCategory::Transshipment,
        NodeCategory::Start,
        NodeCategory::End,
    ];

    /// Classify a node id.  `start` and `end` are the virtual slots; any
    /// other id is classified by its first character.
    pub fn from_id(id: &str) -> Self {
        match id {
            "start" => return NodeCategory::Start,
            "end" => return NodeCategory::End,
            _ => {}
        }
        match id.as_bytes().first() {
            Some(b'b') => NodeCategory::Boat,
            Some(b't') => NodeCategory::Transshipment,
            _ => NodeCategory::Car,
        }
    }

    /// `true` for the two virtual slots.
    #[inline]
    pub fn is_virtual(self) -> bool {
        matches!(self, NodeCategory::Start | NodeCategory::End)
    }

    /// Position of this category in [`Self::ALL`].
    #[inline]
    pub fn block(self) -> usize {
        self as usize
    }

    /// Single-letter tag used in route annotations (`c`, `b`, `t`, `s`, `e`).
    pub fn tag(self) -> char {
        match self {
            NodeCategory::Car           => 'c',
            NodeCategory::Boat          => 'b',
            NodeCategory::Transshipment => 't',
            NodeCategory::Start         => 's',
            NodeCategory::End           => 'e',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeCategory::Car           => "car",
            NodeCategory::Boat          => "boat",
            NodeCategory::Transshipment => "transshipment",
            NodeCategory::Start         => "start",
            NodeCategory::End           => "end",
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mode costs ────────────────────────────────────────────────────────────────

/// Cost weighting for one travel mode.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeCost {
    /// Factor applied to raw edge costs.  Negative values leave costs unscaled.
    pub multiplier: f64,
    /// Fixed cost added when entering a transshipment node.
    pub penalty: f64,
}

impl Default for ModeCost {
    fn default() -> Self {
        Self { multiplier: 1.0, penalty: 0.0 }
    }
}

impl ModeCost {
    pub fn multiplier(multiplier: f64) -> Self {
        Self { multiplier, ..Self::default() }
    }

    pub fn penalty(penalty: f64) -> Self {
        Self { penalty, ..Self::default() }
    }

    #[inline]
    fn scale(&self, raw: f64) -> f64 {
        if self.multiplier >= 0.0 { raw * self.multiplier } else { raw }
    }
}

/// Per-mode cost weighting for a search.  Modes without an entry pass raw
/// costs through unchanged.
///
/// ```json
/// { "car": { "multiplier": 1.0 }, "boat": { "multiplier": 2.5 },
///   "transshipment": { "penalty": 600 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeCosts {
    pub car: Option<ModeCost>,
    pub boat: Option<ModeCost>,
    pub transshipment: Option<ModeCost>,
}

impl ModeCosts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.  Setting a virtual category is a no-op.
    pub fn with(mut self, category: NodeCategory, cost: ModeCost) -> Self {
        match category {
            NodeCategory::Car           => self.car = Some(cost),
            NodeCategory::Boat          => self.boat = Some(cost),
            NodeCategory::Transshipment => self.transshipment = Some(cost),
            NodeCategory::Start | NodeCategory::End => {}
        }
        self
    }

    pub fn get(&self, category: NodeCategory) -> Option<&ModeCost> {
        match category {
            NodeCategory::Car           => self.car.as_ref(),
            NodeCategory::Boat          => self.boat.as_ref(),
            NodeCategory::Transshipment => self.transshipment.as_ref(),
            NodeCategory::Start | NodeCategory::End => None,
        }
    }

    /// Weight a raw edge cost for travel from a node of category `origin` to
    /// a node of category `dest`.
    ///
    /// The mode is the destination's category, or the origin's when the
    /// destination is a virtual slot.  Entering a transshipment node costs the
    /// raw cost scaled by the origin's mode plus the transshipment penalty.
    pub fn apply(&self, raw: f64, origin: NodeCategory, dest: NodeCategory) -> f64 {
        let mode = if dest.is_virtual() { origin } else { dest };
        match mode {
            NodeCategory::Transshipment => match &self.transshipment {
                None => raw,
                Some(transfer) => {
                    let scaled = self.get(origin).map_or(raw, |m| m.scale(raw));
                    scaled + transfer.penalty.max(0.0)
                }
            },
            other => self.get(other).map_or(raw, |m| m.scale(raw)),
        }
    }
}
