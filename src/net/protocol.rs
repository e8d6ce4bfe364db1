use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entity::{Color, EntityId, EntityKind};
use crate::util::vec2::Vec2;

/// Transport-level peer identifier
pub type PeerId = Uuid;

/// Messages from client to host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// First frame on a new connection
    Hello { peer_id: PeerId },
    /// Latest control state
    Input(PlayerInput),
    /// Upgrade or evolution request, applied by the host
    Action(PeerAction),
    /// Clean disconnect
    Goodbye,
}

/// Messages from host to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The peer's player entity has been spawned
    Welcome { peer_id: PeerId, entity_id: EntityId },
    /// Full authoritative state
    State(WorldSnapshot),
}

/// Requests a client forwards instead of applying locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerAction {
    Upgrade { stat_index: u8 },
    ChangeClass { class_index: u16 },
}

/// Control state for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
    pub auto_fire: bool,
    pub auto_spin: bool,
    pub auto_pilot: bool,
    pub auto_level: bool,
    /// Cursor offset from the viewport centre (screen units)
    pub pointer: Vec2,
    /// Analog movement, overrides the direction keys beyond the deadzone
    pub move_vector: Vec2,
    /// Analog aim, overrides the pointer beyond the deadzone
    pub aim_vector: Vec2,
}

impl PlayerInput {
    /// Direction keys as an axis vector (screen y grows downwards)
    pub fn key_axes(&self) -> Vec2 {
        let axis = |pos: bool, neg: bool| f32::from(u8::from(pos)) - f32::from(u8::from(neg));
        Vec2::new(axis(self.right, self.left), axis(self.down, self.up))
    }
}

/// One entity as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
    /// Radians, rounded to two decimals
    pub rotation: f32,
    pub health: i32,
    pub max_health: i32,
    pub color: Color,
    pub radius: f32,
    pub level: u32,
    pub class_index: u16,
    pub hit_flash: bool,
}

/// Every entity in the host store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub entities: Vec<SnapshotRecord>,
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::FoodKind;

    #[test]
    fn test_client_message_roundtrip() {
        let input = PlayerInput {
            up: true,
            shoot: true,
            pointer: Vec2::new(-30.0, 12.5),
            ..Default::default()
        };
        let msg = ClientMessage::Input(input.clone());
        let decoded: ClientMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, ClientMessage::Input(input));

        let action = ClientMessage::Action(PeerAction::ChangeClass { class_index: 7 });
        let decoded: ClientMessage = decode(&encode(&action).unwrap()).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn test_state_roundtrip() {
        let snapshot = WorldSnapshot {
            entities: vec![SnapshotRecord {
                id: 3,
                kind: EntityKind::Food(FoodKind::Hexagon),
                x: 100,
                y: -4,
                rotation: 1.57,
                health: 300,
                max_health: 300,
                color: Color(0xb026ff),
                radius: 45.0,
                level: 1,
                class_index: 0,
                hit_flash: true,
            }],
        };
        let msg = ServerMessage::State(snapshot);
        let decoded: ServerMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<ServerMessage, _> = decode(&[0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(result.is_err());
    }

    #[test]
    fn test_key_axes() {
        let input = PlayerInput {
            up: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.key_axes(), Vec2::new(1.0, -1.0));
        assert_eq!(PlayerInput::default().key_axes(), Vec2::ZERO);
    }
}
