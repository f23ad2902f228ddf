//! Read preference, write concern, and profiler level types.
//!
//! These are the facade-level representations relayed to the driver: the
//! facade sets the flags and forwards them, it does not implement any
//! replica-routing logic itself.

use std::collections::HashMap;
use std::time::Duration;

use mongodb::options::{Acknowledgment, SelectionCriteria};

use crate::error::{OdmError, OdmResult};

/// A replica tag set used to filter eligible members.
pub type TagSet = HashMap<String, String>;

// ============================================================================
// Read Preference
// ============================================================================

/// Read routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Always read from primary.
    #[default]
    Primary,
    /// Prefer primary, fallback to secondary.
    PrimaryPreferred,
    /// Always read from secondary.
    Secondary,
    /// Prefer secondary, fallback to primary.
    SecondaryPreferred,
    /// Read from nearest member by latency.
    Nearest,
}

impl ReadMode {
    /// The MongoDB mode string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PrimaryPreferred => "primaryPreferred",
            Self::Secondary => "secondary",
            Self::SecondaryPreferred => "secondaryPreferred",
            Self::Nearest => "nearest",
        }
    }
}

/// A read preference: a routing mode plus an optional tag-set filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadPreference {
    /// Routing mode.
    pub mode: ReadMode,
    /// Tag sets restricting eligible members. Empty means no filter.
    pub tag_sets: Vec<TagSet>,
}

impl ReadPreference {
    /// Read from primary only.
    pub fn primary() -> Self {
        Self {
            mode: ReadMode::Primary,
            tag_sets: Vec::new(),
        }
    }

    /// Prefer primary, fallback to secondary.
    pub fn primary_preferred() -> Self {
        Self {
            mode: ReadMode::PrimaryPreferred,
            tag_sets: Vec::new(),
        }
    }

    /// Read from secondary only.
    pub fn secondary() -> Self {
        Self {
            mode: ReadMode::Secondary,
            tag_sets: Vec::new(),
        }
    }

    /// Prefer secondary, fallback to primary.
    pub fn secondary_preferred() -> Self {
        Self {
            mode: ReadMode::SecondaryPreferred,
            tag_sets: Vec::new(),
        }
    }

    /// Read from the nearest member.
    pub fn nearest() -> Self {
        Self {
            mode: ReadMode::Nearest,
            tag_sets: Vec::new(),
        }
    }

    /// Attach a tag-set filter.
    pub fn with_tag_sets(mut self, tag_sets: Vec<TagSet>) -> Self {
        self.tag_sets = tag_sets;
        self
    }

    /// Validate the preference. Tag sets cannot be combined with
    /// primary-only reads.
    pub fn validate(&self) -> OdmResult<()> {
        if self.mode == ReadMode::Primary && !self.tag_sets.is_empty() {
            return Err(OdmError::configuration(
                "tag sets cannot be used with primary read preference",
            ));
        }
        Ok(())
    }

    /// Convert to the driver's selection criteria.
    pub fn to_criteria(&self) -> OdmResult<SelectionCriteria> {
        self.validate()?;

        use mongodb::options::{ReadPreference as Driver, ReadPreferenceOptions};
        let mut options = ReadPreferenceOptions::builder().build();
        if !self.tag_sets.is_empty() {
            options.tag_sets = Some(self.tag_sets.clone());
        }

        let preference = match self.mode {
            ReadMode::Primary => Driver::Primary,
            ReadMode::PrimaryPreferred => Driver::PrimaryPreferred { options },
            ReadMode::Secondary => Driver::Secondary { options },
            ReadMode::SecondaryPreferred => Driver::SecondaryPreferred { options },
            ReadMode::Nearest => Driver::Nearest { options },
        };

        Ok(SelectionCriteria::ReadPreference(preference))
    }
}

// ============================================================================
// Write Concern
// ============================================================================

/// Write acknowledgement level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckLevel {
    /// Acknowledged by the given number of nodes. Zero is unacknowledged.
    Nodes(u32),
    /// Acknowledged by a majority of nodes.
    Majority,
    /// Acknowledged by nodes matching a named tag.
    Tag(String),
}

/// A write concern: acknowledgement level plus an optional timeout and
/// journaling requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConcern {
    /// Acknowledgement level.
    pub level: AckLevel,
    /// How long the server waits for the concern to be satisfied.
    pub timeout: Option<Duration>,
    /// Require the write to reach the on-disk journal.
    pub journal: Option<bool>,
}

impl WriteConcern {
    /// Acknowledged by `nodes` members.
    pub fn nodes(nodes: u32) -> Self {
        Self {
            level: AckLevel::Nodes(nodes),
            timeout: None,
            journal: None,
        }
    }

    /// Unacknowledged writes (level 0).
    pub fn unacknowledged() -> Self {
        Self::nodes(0)
    }

    /// Acknowledged by a majority of members.
    pub fn majority() -> Self {
        Self {
            level: AckLevel::Majority,
            timeout: None,
            journal: None,
        }
    }

    /// Acknowledged by members matching a named tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            level: AckLevel::Tag(tag.into()),
            timeout: None,
            journal: None,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Require (or waive) journaling.
    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Validate the concern the way the driver would. Unacknowledged
    /// writes cannot also demand journaling.
    pub fn validate(&self) -> OdmResult<()> {
        if self.level == AckLevel::Nodes(0) && self.journal == Some(true) {
            return Err(OdmError::configuration(
                "unacknowledged write concern cannot require journaling",
            ));
        }
        Ok(())
    }

    /// Convert to the driver's write concern.
    pub fn to_driver(&self) -> mongodb::options::WriteConcern {
        let w = match &self.level {
            AckLevel::Nodes(n) => Acknowledgment::Nodes(*n),
            AckLevel::Majority => Acknowledgment::Majority,
            AckLevel::Tag(tag) => Acknowledgment::Custom(tag.clone()),
        };
        let mut concern = mongodb::options::WriteConcern::builder().w(w).build();
        concern.w_timeout = self.timeout;
        concern.journal = self.journal;
        concern
    }
}

// ============================================================================
// Profiler Level
// ============================================================================

/// Server-side profiler level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilerLevel {
    /// Profiling off.
    #[default]
    Off,
    /// Profile only operations slower than the threshold.
    SlowOnly,
    /// Profile all operations.
    All,
}

impl ProfilerLevel {
    /// The numeric level used by the `profile` command.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Off => 0,
            Self::SlowOnly => 1,
            Self::All => 2,
        }
    }

    /// Parse a numeric level from a server reply.
    pub fn from_i32(level: i32) -> Option<Self> {
        match level {
            0 => Some(Self::Off),
            1 => Some(Self::SlowOnly),
            2 => Some(Self::All),
            _ => None,
        }
    }
}
