//! Common identifier types shared by the engine and its collaborators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derives 16 UUID bytes from a seed so simulated ids are reproducible.
fn seeded_bytes(seed: u64, salt: u64) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&(seed ^ salt).to_le_bytes());
    bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
    bytes
}

/// Unique identifier for a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Creates a new random VideoId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic VideoId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        Self(Uuid::from_bytes(seeded_bytes(seed, 0x5649_4445_4f00_0000)))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Raw key bytes, used as a storage prefix.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Identifier of an actor (real user or bot) that likes and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic UserId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        Self(Uuid::from_bytes(seeded_bytes(seed, 0x5553_4552_0000_0000)))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_ids_are_reproducible() {
        assert_eq!(VideoId::from_seed(9), VideoId::from_seed(9));
        assert_ne!(VideoId::from_seed(9), VideoId::from_seed(10));
        assert_eq!(UserId::from_seed(3), UserId::from_seed(3));
    }

    #[test]
    fn test_video_and_user_seeds_do_not_collide() {
        assert_ne!(VideoId::from_seed(1).as_uuid(), UserId::from_seed(1).as_uuid());
    }

    #[test]
    fn test_display_is_short() {
        assert_eq!(VideoId::new().to_string().len(), 8);
        assert_eq!(UserId::new().to_string().len(), 8);
    }
}
