use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Setup/teardown hooks a method is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    BeforeSuite,
    BeforeTest,
    BeforeGroups,
    BeforeClass,
    BeforeMethod,
    AfterSuite,
    AfterTest,
    AfterGroups,
    AfterClass,
    AfterMethod,
}

impl LifecycleKind {
    /// Hooks a `before_phase` method may be combined with.
    pub const BEFORE_PHASE_COMPATIBLE: [LifecycleKind; 4] = [
        LifecycleKind::BeforeSuite,
        LifecycleKind::BeforeTest,
        LifecycleKind::BeforeGroups,
        LifecycleKind::BeforeClass,
    ];

    /// Hooks an `after_phase` method may be combined with.
    pub const AFTER_PHASE_COMPATIBLE: [LifecycleKind; 4] = [
        LifecycleKind::AfterSuite,
        LifecycleKind::AfterTest,
        LifecycleKind::AfterGroups,
        LifecycleKind::AfterClass,
    ];

    /// Parse an attribute name such as `before_class`.
    pub fn from_attribute(name: &str) -> Option<Self> {
        Some(match name {
            "before_suite" => Self::BeforeSuite,
            "before_test" => Self::BeforeTest,
            "before_groups" => Self::BeforeGroups,
            "before_class" => Self::BeforeClass,
            "before_method" => Self::BeforeMethod,
            "after_suite" => Self::AfterSuite,
            "after_test" => Self::AfterTest,
            "after_groups" => Self::AfterGroups,
            "after_class" => Self::AfterClass,
            "after_method" => Self::AfterMethod,
            _ => return None,
        })
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeSuite => "before_suite",
            Self::BeforeTest => "before_test",
            Self::BeforeGroups => "before_groups",
            Self::BeforeClass => "before_class",
            Self::BeforeMethod => "before_method",
            Self::AfterSuite => "after_suite",
            Self::AfterTest => "after_test",
            Self::AfterGroups => "after_groups",
            Self::AfterClass => "after_class",
            Self::AfterMethod => "after_method",
        };
        write!(f, "{name}")
    }
}

/// Phase-scoping tag. The listed phases are those in which the method is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseScope {
    BeforePhase(BTreeSet<Phase>),
    AfterPhase(BTreeSet<Phase>),
}

impl PhaseScope {
    pub fn before(phases: impl IntoIterator<Item = Phase>) -> Self {
        Self::BeforePhase(phases.into_iter().collect())
    }

    pub fn after(phases: impl IntoIterator<Item = Phase>) -> Self {
        Self::AfterPhase(phases.into_iter().collect())
    }

    pub fn phases(&self) -> &BTreeSet<Phase> {
        match self {
            Self::BeforePhase(p) | Self::AfterPhase(p) => p,
        }
    }
}

impl fmt::Display for PhaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, phases) = match self {
            Self::BeforePhase(p) => ("before_phase", p),
            Self::AfterPhase(p) => ("after_phase", p),
        };
        let list: Vec<String> = phases.iter().map(Phase::to_string).collect();
        write!(f, "{name}({})", list.join(", "))
    }
}

/// A setup/teardown method with its statically declared tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMethod {
    /// Fully qualified name, e.g. `Checkout::set_up`.
    pub name: String,
    pub lifecycle: Vec<LifecycleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<PhaseScope>,
}

impl LifecycleMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Vec::new(),
            scope: None,
        }
    }

    pub fn with_kind(mut self, kind: LifecycleKind) -> Self {
        self.lifecycle.push(kind);
        self
    }

    pub fn with_scope(mut self, scope: PhaseScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Every tag the method carries, formatted for diagnostics.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.lifecycle.iter().map(ToString::to_string).collect();
        if let Some(scope) = &self.scope {
            tags.push(scope.to_string());
        }
        tags
    }
}
