//! Player orders
//!
//! An order is a declared intent: who (subject), what (predicate), on what
//! (objects), optionally negated into a prohibition. The order manager owns
//! orders for their whole life; everything here is plain data plus parsing.

use std::fmt;
use std::str::FromStr;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchedError};
use crate::core::types::{AgentId, OrderId, ReservableId, Vec2};
use crate::entity::tasks::TaskKind;
use crate::world::resources::ResourceKind;

/// Who an order is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// Every settler, every pass, until the order ends
    All,
    /// The first idle settler, once
    NextFree,
    /// Exactly one settler, by name
    Named(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::All => write!(f, "all"),
            Subject::NextFree => write!(f, "next free"),
            Subject::Named(name) => write!(f, "{}", name),
        }
    }
}

/// The kind of work an order asks for (or forbids)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Gather,
    Hunt,
    Build,
}

impl Predicate {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "gather" | "collect" | "harvest" | "chop" | "mine" | "forage" => Some(Predicate::Gather),
            "hunt" => Some(Predicate::Hunt),
            "build" | "construct" => Some(Predicate::Build),
            _ => None,
        }
    }
}

/// Something an order's predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    /// Any node of a category
    Resource(ResourceKind),
    /// One specific construction site
    Site(ReservableId),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Resource(kind) => write!(f, "{:?}", kind),
            ObjectRef::Site(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Paused,
    Complete,
    Failed,
}

impl OrderStatus {
    /// Complete and Failed orders wait for `cleanup_finished`
    pub fn is_finished(&self) -> bool {
        matches!(self, OrderStatus::Complete | OrderStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Urgent = 3,
}

impl OrderPriority {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "low" => Some(OrderPriority::Low),
            "normal" => Some(OrderPriority::Normal),
            "high" => Some(OrderPriority::High),
            "urgent" | "critical" => Some(OrderPriority::Urgent),
            _ => None,
        }
    }
}

/// A live order, owned by the order manager
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub subject: Subject,
    pub predicate: Predicate,
    /// Ordered set: insertion order kept, duplicates dropped
    pub objects: Vec<ObjectRef>,
    pub negated: bool,
    pub priority: OrderPriority,
    pub status: OrderStatus,
    /// Search center for resource binding; also where the marker sits
    pub target_position: Option<Vec2>,
    /// Settlers currently serving the order
    pub assigned_agents: AHashSet<AgentId>,
    /// Resolved identity of a `Named` subject
    pub named_agent: Option<AgentId>,
}

impl Order {
    pub fn from_draft(id: OrderId, draft: OrderDraft, named_agent: Option<AgentId>) -> Self {
        Self {
            id,
            subject: draft.subject,
            predicate: draft.predicate,
            objects: draft.objects,
            negated: draft.negated,
            priority: draft.priority,
            status: OrderStatus::Active,
            target_position: draft.target_position,
            assigned_agents: AHashSet::new(),
            named_agent,
        }
    }

    /// Active and executable (not a prohibition)
    pub fn is_live(&self) -> bool {
        self.status == OrderStatus::Active && !self.negated
    }

    /// Categories a Gather or Hunt order binds to, in object order
    ///
    /// A bare Gather covers every category except game.
    pub fn resource_kinds(&self) -> Vec<ResourceKind> {
        match self.predicate {
            Predicate::Hunt => vec![ResourceKind::Game],
            Predicate::Build => Vec::new(),
            Predicate::Gather => {
                let named: Vec<ResourceKind> = self
                    .objects
                    .iter()
                    .filter_map(|o| match o {
                        ObjectRef::Resource(kind) => Some(*kind),
                        ObjectRef::Site(_) => None,
                    })
                    .collect();
                if named.is_empty() {
                    ResourceKind::ALL
                        .into_iter()
                        .filter(|k| *k != ResourceKind::Game)
                        .collect()
                } else {
                    named
                }
            }
        }
    }

    /// Specific construction site named by a Build order
    pub fn site_filter(&self) -> Option<ReservableId> {
        self.objects.iter().find_map(|o| match o {
            ObjectRef::Site(id) => Some(*id),
            ObjectRef::Resource(_) => None,
        })
    }

    /// Whether the predicate covers a task kind
    pub fn covers(&self, kind: TaskKind) -> bool {
        match self.predicate {
            Predicate::Build => kind == TaskKind::Build,
            Predicate::Gather | Predicate::Hunt => kind
                .resource_kind()
                .is_some_and(|r| self.resource_kinds().contains(&r)),
        }
    }

    /// Does this order address `agent` at all
    pub fn applies_to(&self, agent: AgentId) -> bool {
        match self.subject {
            Subject::All => true,
            Subject::NextFree => self.assigned_agents.contains(&agent),
            Subject::Named(_) => self.named_agent == Some(agent),
        }
    }

    /// Live order that keeps `agent` away from auto-assignment
    pub fn claims(&self, agent: AgentId) -> bool {
        self.is_live() && (self.applies_to(agent) || self.assigned_agents.contains(&agent))
    }

    /// Active prohibition of `kind` for `agent`
    pub fn forbids(&self, agent: AgentId, kind: TaskKind) -> bool {
        self.negated && self.status == OrderStatus::Active && self.applies_to(agent) && self.covers(kind)
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            subject: self.subject.to_string(),
            predicate: self.predicate,
            objects: self.objects.iter().map(|o| o.to_string()).collect(),
            negated: self.negated,
            priority: self.priority,
            status: self.status,
            target_position: self.target_position,
            assigned: self.assigned_agents.len(),
        }
    }
}

/// Player input before it becomes an order
///
/// Built either through the builder methods or by parsing a short command
/// such as `"Ada gather flint"`, `"next hunt"` or `"all do not hunt"`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub subject: Subject,
    pub predicate: Predicate,
    pub objects: Vec<ObjectRef>,
    pub negated: bool,
    pub priority: OrderPriority,
    pub target_position: Option<Vec2>,
}

impl OrderDraft {
    pub fn new(subject: Subject, predicate: Predicate) -> Self {
        Self {
            subject,
            predicate,
            objects: Vec::new(),
            negated: false,
            priority: OrderPriority::default(),
            target_position: None,
        }
    }

    pub fn object(mut self, object: ObjectRef) -> Self {
        if !self.objects.contains(&object) {
            self.objects.push(object);
        }
        self
    }

    pub fn resource(self, kind: ResourceKind) -> Self {
        self.object(ObjectRef::Resource(kind))
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn priority(mut self, priority: OrderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.target_position = Some(position);
        self
    }

    /// Check predicate/object agreement
    ///
    /// Subject resolution needs the world and happens in the manager.
    pub fn validate(&self) -> Result<()> {
        if let Subject::Named(name) = &self.subject {
            if name.trim().is_empty() {
                return Err(SchedError::InvalidOrder("empty settler name".into()));
            }
        }
        if self.negated && self.subject == Subject::NextFree {
            return Err(SchedError::InvalidOrder(
                "a prohibition needs `all` or a named settler".into(),
            ));
        }

        for object in &self.objects {
            let fits = match (self.predicate, object) {
                (Predicate::Gather, ObjectRef::Resource(_)) => true,
                (Predicate::Hunt, ObjectRef::Resource(kind)) => *kind == ResourceKind::Game,
                (Predicate::Build, ObjectRef::Site(_)) => true,
                _ => false,
            };
            if !fits {
                return Err(SchedError::InvalidOrder(format!(
                    "{} does not fit predicate {:?}",
                    object, self.predicate
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for OrderDraft {
    type Err = SchedError;

    /// `[subject] [do not] <verb> [objects...] [at X,Y] [!priority]`
    fn from_str(input: &str) -> Result<Self> {
        let mut words = input
            .split_whitespace()
            .map(|w| w.trim_matches(','))
            .filter(|w| !w.is_empty());

        let first = words
            .next()
            .ok_or_else(|| SchedError::InvalidOrder("empty command".into()))?;

        // Subject is optional; a command starting with a verb goes to the next free settler
        let (subject, mut predicate) = match Predicate::from_word(first) {
            Some(p) => (Subject::NextFree, Some(p)),
            None => {
                let subject = match first.to_ascii_lowercase().as_str() {
                    "all" | "everyone" | "everybody" => Subject::All,
                    "next" | "someone" | "anyone" => Subject::NextFree,
                    _ => Subject::Named(first.to_string()),
                };
                (subject, None)
            }
        };

        let mut negated = false;
        while predicate.is_none() {
            let word = words
                .next()
                .ok_or_else(|| SchedError::InvalidOrder(format!("no verb in {:?}", input)))?;
            match word.to_ascii_lowercase().as_str() {
                "do" | "free" | "please" => {}
                "not" | "don't" | "dont" | "never" => negated = true,
                other => {
                    predicate = Some(Predicate::from_word(other).ok_or_else(|| {
                        SchedError::InvalidOrder(format!("unknown verb {:?}", other))
                    })?);
                }
            }
        }
        let Some(predicate) = predicate else {
            return Err(SchedError::InvalidOrder(format!("no verb in {:?}", input)));
        };

        let mut draft = OrderDraft::new(subject, predicate);
        draft.negated = negated;

        while let Some(word) = words.next() {
            let lower = word.to_ascii_lowercase();
            if let Some(level) = lower.strip_prefix('!') {
                draft.priority = OrderPriority::from_word(level)
                    .ok_or_else(|| SchedError::InvalidOrder(format!("unknown priority {:?}", level)))?;
            } else if lower == "at" {
                let coords = words
                    .next()
                    .ok_or_else(|| SchedError::InvalidOrder("`at` needs X,Y".into()))?;
                draft.target_position = Some(parse_position(coords)?);
            } else if let Some(id) = lower.strip_prefix("site#") {
                let id = id
                    .parse::<u32>()
                    .map_err(|_| SchedError::InvalidOrder(format!("bad site id {:?}", word)))?;
                draft = draft.object(ObjectRef::Site(ReservableId(id)));
            } else if matches!(lower.as_str(), "and" | "the" | "some") {
                continue;
            } else {
                let kind = ResourceKind::from_material(&lower)
                    .ok_or_else(|| SchedError::InvalidOrder(format!("unknown material {:?}", word)))?;
                draft = draft.resource(kind);
            }
        }

        draft.validate()?;
        Ok(draft)
    }
}

fn parse_position(coords: &str) -> Result<Vec2> {
    let bad = || SchedError::InvalidOrder(format!("bad position {:?}", coords));
    let (x, y) = coords.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse::<f32>().map_err(|_| bad())?;
    let y = y.trim().parse::<f32>().map_err(|_| bad())?;
    Ok(Vec2::new(x, y))
}

/// Read-only view of an order for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub subject: String,
    pub predicate: Predicate,
    pub objects: Vec<String>,
    pub negated: bool,
    pub priority: OrderPriority,
    pub status: OrderStatus,
    pub target_position: Option<Vec2>,
    pub assigned: usize,
}
