//! Room settings.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long the simulated participant waits before calling a number.
    pub simulated_think_delay: Duration,

    /// Display name given to the simulated participant.
    pub simulated_name: String,

    /// Capacity of each room actor's command queue. Senders wait when it
    /// is full.
    pub command_buffer: usize,

    /// Seeds board shuffles and simulated picks. `None` draws from the OS;
    /// set it to replay a room deterministically.
    pub seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            simulated_think_delay: Duration::from_millis(800),
            simulated_name: "Computer".to_string(),
            command_buffer: 64,
            seed: None,
        }
    }
}

/// A generator seeded from `seed`, or from the OS when there is none.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
