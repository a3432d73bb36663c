use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SIZE: f32 = 50.0;
pub const MOVE_STEP: f32 = 10.0;
pub const DEFAULT_SPRITE: &str = "default";

/// Mapping from appearance key to display glyph.
pub type SpriteTable = BTreeMap<String, String>;

/// Opaque identity of one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Bounds of the playable area, fixed once the server starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub width: f32,
    pub height: f32,
}

impl World {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Largest x a player's top-left corner may take.
    pub fn max_x(&self) -> f32 {
        (self.width - PLAYER_SIZE).max(0.0)
    }

    /// Largest y a player's top-left corner may take.
    pub fn max_y(&self) -> f32 {
        (self.height - PLAYER_SIZE).max(0.0)
    }

    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.max_x()), y.clamp(0.0, self.max_y()))
    }

    pub fn contains(&self, player: &PlayerRecord) -> bool {
        (0.0..=self.max_x()).contains(&player.x) && (0.0..=self.max_y()).contains(&player.y)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WORLD_WIDTH, WORLD_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Parses the wire name of a direction. Anything else is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Authoritative state of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: SessionId,
    pub x: f32,
    pub y: f32,
    pub sprite_key: String,
}

impl PlayerRecord {
    pub fn new(id: SessionId, x: f32, y: f32, sprite_key: impl Into<String>) -> Self {
        Self {
            id,
            x,
            y,
            sprite_key: sprite_key.into(),
        }
    }

    /// Moves one step in `direction`, stopping at the world edge.
    pub fn step(&mut self, direction: Direction, world: &World) {
        match direction {
            Direction::Up => self.y = (self.y - MOVE_STEP).max(0.0),
            Direction::Down => self.y = (self.y + MOVE_STEP).min(world.max_y()),
            Direction::Left => self.x = (self.x - MOVE_STEP).max(0.0),
            Direction::Right => self.x = (self.x + MOVE_STEP).min(world.max_x()),
        }
    }
}

/// Messages sent from clients to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    RequestSprites,
    PlayerJoin {
        sprite: Option<String>,
    },
    PlayerMove {
        direction: String,
    },
    /// Any `type` this server does not know about.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages sent from the server to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SpritesResponse {
        sprites: SpriteTable,
    },
    WorldState {
        players: HashMap<SessionId, PlayerRecord>,
    },
    PlayerJoined {
        player: PlayerRecord,
    },
    PlayerMoved {
        player: PlayerRecord,
    },
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: SessionId,
    },
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The sprite table compiled into the server.
pub fn default_sprites() -> SpriteTable {
    [
        (DEFAULT_SPRITE, "🙂"),
        ("mage", "🧙"),
        ("knight", "🤺"),
        ("archer", "🏹"),
        ("rogue", "🥷"),
        ("robot", "🤖"),
        ("ghost", "👻"),
        ("dragon", "🐉"),
        ("cat", "🐱"),
    ]
    .into_iter()
    .map(|(key, glyph)| (key.to_string(), glyph.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn player_at(x: f32, y: f32) -> PlayerRecord {
        PlayerRecord::new(SessionId::from("p1"), x, y, DEFAULT_SPRITE)
    }

    #[test]
    fn test_world_bounds() {
        let world = World::default();
        assert_eq!(world.max_x(), 750.0);
        assert_eq!(world.max_y(), 550.0);
        assert_eq!(world.clamp(-5.0, 900.0), (0.0, 550.0));
    }

    #[test]
    fn test_world_smaller_than_player() {
        let world = World::new(30.0, 30.0);
        assert_eq!(world.max_x(), 0.0);
        assert_eq!(world.max_y(), 0.0);
    }

    #[test]
    fn test_step_stops_at_origin() {
        let world = World::default();
        let mut player = player_at(0.0, 0.0);

        player.step(Direction::Up, &world);
        player.step(Direction::Left, &world);

        assert_eq!((player.x, player.y), (0.0, 0.0));
    }

    #[test]
    fn test_step_right_clamps_at_edge() {
        let world = World::default();
        let mut player = player_at(740.0, 100.0);

        player.step(Direction::Right, &world);
        assert_eq!(player.x, 750.0);

        player.step(Direction::Right, &world);
        assert_eq!(player.x, 750.0);
    }

    #[test]
    fn test_step_moves_by_fixed_amount() {
        let world = World::default();
        let mut player = player_at(100.5, 200.25);

        player.step(Direction::Down, &world);
        assert_approx_eq!(player.y, 210.25, 0.001);

        player.step(Direction::Left, &world);
        assert_approx_eq!(player.x, 90.5, 0.001);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("up"), Some(Direction::Up));
        assert_eq!(Direction::parse("right"), Some(Direction::Right));
        assert_eq!(Direction::parse("UP"), None);
        assert_eq!(Direction::parse("diagonal"), None);
    }

    #[test]
    fn test_decode_client_messages() {
        assert_eq!(
            ClientMessage::decode(r#"{"type":"request_sprites","extra":1}"#).unwrap(),
            ClientMessage::RequestSprites
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"player_join","sprite":"mage"}"#).unwrap(),
            ClientMessage::PlayerJoin {
                sprite: Some("mage".to_string())
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"player_join"}"#).unwrap(),
            ClientMessage::PlayerJoin { sprite: None }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"player_move","direction":"up"}"#).unwrap(),
            ClientMessage::PlayerMove {
                direction: "up".to_string()
            }
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let message = ClientMessage::decode(r#"{"type":"dance","style":"tango"}"#).unwrap();
        assert_eq!(message, ClientMessage::Unknown);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(ClientMessage::decode("not json").is_err());
        assert!(ClientMessage::decode(r#"{"direction":"up"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"type":"player_move"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"type":"player_move","direction":4}"#).is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let player = PlayerRecord::new(SessionId::from("abc"), 10.0, 20.0, "mage");
        let json: serde_json::Value =
            serde_json::from_str(&ServerMessage::PlayerMoved { player }.encode().unwrap())
                .unwrap();

        assert_eq!(json["type"], "player_moved");
        assert_eq!(json["player"]["id"], "abc");
        assert_eq!(json["player"]["x"], 10.0);
        assert_eq!(json["player"]["spriteKey"], "mage");

        let left = ServerMessage::PlayerLeft {
            player_id: SessionId::from("abc"),
        };
        let json: serde_json::Value = serde_json::from_str(&left.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "player_left");
        assert_eq!(json["playerId"], "abc");
    }

    #[test]
    fn test_world_state_keyed_by_id() {
        let mut players = HashMap::new();
        players.insert(SessionId::from("a"), player_at(1.0, 2.0));

        let text = ServerMessage::WorldState { players }.encode().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "world_state");
        assert_eq!(json["players"]["a"]["y"], 2.0);
    }

    #[test]
    fn test_default_sprites() {
        let sprites = default_sprites();
        assert!(sprites.contains_key(DEFAULT_SPRITE));
        assert!(sprites.contains_key("mage"));
        assert!(sprites.values().all(|glyph| !glyph.is_empty()));
    }
}
