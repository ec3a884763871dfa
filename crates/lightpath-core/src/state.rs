use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of players in a game. Fixed for the lifetime of a session.
pub const PLAYER_COUNT: usize = 2;

/// Which of the two players an input, collision, or trajectory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerIndex {
    One,
    Two,
}

impl PlayerIndex {
    pub const ALL: [PlayerIndex; PLAYER_COUNT] = [PlayerIndex::One, PlayerIndex::Two];

    /// Resolve a zero-based index from an external source. Anything other
    /// than 0 or 1 is rejected.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::One),
            1 => Some(Self::Two),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl std::fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.index() + 1)
    }
}

/// One point of a player's trail: position plus the velocity it was moving with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "vX")]
    pub vx: f32,
    #[serde(rename = "vY")]
    pub vy: f32,
}

impl Player {
    /// A stationary player at `(x, y)`.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn same_position(&self, other: &Player) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// Number of points sealed into one shared chunk of a [`Trajectory`].
const CHUNK_LEN: usize = 64;

/// A full, immutable run of trail points plus the chunk before it.
#[derive(Debug)]
struct Chunk {
    points: Box<[Player]>,
    prev: Option<Arc<Chunk>>,
}

impl Drop for Chunk {
    // Unlink iteratively so dropping a long history can't overflow the stack.
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(chunk) = prev {
            match Arc::try_unwrap(chunk) {
                Ok(mut chunk) => prev = chunk.prev.take(),
                Err(_) => break,
            }
        }
    }
}

/// Append-only history of a player's snapshots, oldest first.
///
/// Always holds at least the spawn point, so `head()` never fails.
///
/// Full chunks of history are sealed behind an `Arc` and shared by every
/// clone, so cloning and pushing cost at most `CHUNK_LEN` point copies no
/// matter how long the trail is. A successor state therefore shares all
/// but the newest points with the state it came from.
#[derive(Debug, Clone)]
pub struct Trajectory {
    sealed: Option<Arc<Chunk>>,
    /// Never empty; holds between 1 and `CHUNK_LEN` points.
    tail: Vec<Player>,
    len: usize,
}

impl Trajectory {
    pub fn new(spawn: Player) -> Self {
        let mut tail = Vec::with_capacity(CHUNK_LEN);
        tail.push(spawn);
        Self {
            sealed: None,
            tail,
            len: 1,
        }
    }

    /// The most recent snapshot.
    pub fn head(&self) -> &Player {
        // `tail` is seeded with the spawn point and refilled on every seal.
        &self.tail[self.tail.len() - 1]
    }

    pub fn push(&mut self, point: Player) {
        if self.tail.len() == CHUNK_LEN {
            let full = std::mem::replace(&mut self.tail, Vec::with_capacity(CHUNK_LEN));
            self.sealed = Some(Arc::new(Chunk {
                points: full.into_boxed_slice(),
                prev: self.sealed.take(),
            }));
        }
        self.tail.push(point);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All points, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Player> + '_ {
        let mut chunks = Vec::new();
        let mut cursor = self.sealed.as_deref();
        while let Some(chunk) = cursor {
            chunks.push(chunk);
            cursor = chunk.prev.as_deref();
        }
        chunks
            .into_iter()
            .rev()
            .flat_map(|chunk| chunk.points.iter())
            .chain(self.tail.iter())
    }

    /// Whether both trajectories reference the same sealed history.
    #[cfg(test)]
    pub(crate) fn shares_history_with(&self, other: &Trajectory) -> bool {
        match (&self.sealed, &other.sealed) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Trajectory {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len || self.tail != other.tail {
            return false;
        }
        // Equal lengths imply the same chunk layout.
        match (&self.sealed, &other.sealed) {
            (None, None) => true,
            (Some(a), Some(b)) if Arc::ptr_eq(a, b) => true,
            _ => self.iter().eq(other.iter()),
        }
    }
}

impl Serialize for Trajectory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Trajectory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let points = Vec::<Player>::deserialize(deserializer)?;
        let mut points = points.into_iter();
        let spawn = points
            .next()
            .ok_or_else(|| D::Error::custom("trajectory must hold at least one point"))?;
        let mut trajectory = Trajectory::new(spawn);
        for point in points {
            trajectory.push(point);
        }
        Ok(trajectory)
    }
}

/// Per-step collision reading, folded into the collision counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionSample {
    #[default]
    None,
    Player(PlayerIndex),
}

impl CollisionSample {
    pub fn player(self) -> Option<PlayerIndex> {
        match self {
            Self::None => None,
            Self::Player(p) => Some(p),
        }
    }
}

/// Authoritative game state. Each reducer step produces a successor value;
/// a published `GameState` is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub trajectories: [Trajectory; PLAYER_COUNT],
    #[serde(rename = "collisions")]
    pub collision_counts: [u32; PLAYER_COUNT],
}

impl GameState {
    /// Initial state: both players at their spawn points, no collisions.
    pub fn new(spawns: [Player; PLAYER_COUNT]) -> Self {
        Self {
            trajectories: spawns.map(Trajectory::new),
            collision_counts: [0; PLAYER_COUNT],
        }
    }

    pub fn trajectory(&self, player: PlayerIndex) -> &Trajectory {
        &self.trajectories[player.index()]
    }

    pub fn collisions(&self, player: PlayerIndex) -> u32 {
        self.collision_counts[player.index()]
    }

    /// Latest snapshot of each player.
    pub fn heads(&self) -> [Player; PLAYER_COUNT] {
        [*self.trajectories[0].head(), *self.trajectories[1].head()]
    }
}
