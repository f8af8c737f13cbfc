//! Participant records.

use callboard_protocol::{ParticipantId, Role};
use rand::Rng;

/// Longest display name kept, in characters.
pub const MAX_NAME_CHARS: usize = 24;

/// A human or simulated player bound to one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: Role,
    /// 1 for the first slot, 2 for the second. Renumbered when the first
    /// participant leaves.
    pub join_order: u32,
    pub wins: u32,
}

impl Participant {
    pub fn human(id: ParticipantId, display_name: &str) -> Self {
        Self::new(id, display_name, Role::Human)
    }

    pub fn simulated(id: ParticipantId, display_name: &str) -> Self {
        Self::new(id, display_name, Role::Simulated)
    }

    fn new(id: ParticipantId, display_name: &str, role: Role) -> Self {
        Self {
            id,
            display_name: sanitize_name(display_name),
            role,
            join_order: 0,
            wins: 0,
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }
}

/// Trims and truncates a requested name; blank names get a `Guest_<n>`
/// placeholder.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return format!("Guest_{}", rand::rng().random_range(0..1000));
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}
