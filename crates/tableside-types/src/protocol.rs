//! Wire protocol: one JSON object per text frame, discriminated by `type`.
//!
//! [`Message`] is what the server writes itself; everything else it sends
//! is a client's frame passed on as received. [`ClientFrame`] is what the server
//! makes of an inbound frame: the handful of tags it acts on, plus a
//! catch-all `Relay` for everything it just passes along.
//!
//! Inbound decoding is two-step (read the tag, then decode the payload for
//! that tag) rather than an internally tagged enum, because opaque
//! `RawValue` payloads cannot pass through serde's buffered tag lookup.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::error::ProtocolError;
use crate::game::{GameState, Opaque};

/// Tag strings used on the wire.
pub mod tags {
    pub const HYDRATE: &str = "hydrate";
    pub const UPDATE_STATE: &str = "update-state";
    pub const YOUR_STATE: &str = "your-state";
    pub const HAND_JOINED: &str = "hand-joined";
    pub const HAND_DISCONNECTED: &str = "hand-disconnected";
    pub const RECONNECT_PING: &str = "reconnect-ping";
    pub const ADD: &str = "add";
    pub const UPDATE: &str = "update";
}

/// A protocol message as serialized by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Message {
    /// Full snapshot sent once to every new connection.
    Hydrate {
        messages: Vec<ChatMessage>,
        game_state: GameState,
    },
    /// Whole-state replacement.
    UpdateState { state: GameState },
    /// One hand's private slice.
    YourState { hand_id: String, state: Opaque },
    /// A previously identified connection went away.
    HandDisconnected { sender_id: String },
}

impl Message {
    /// The `type` discriminator this message serializes with.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Hydrate { .. } => tags::HYDRATE,
            Message::UpdateState { .. } => tags::UPDATE_STATE,
            Message::YourState { .. } => tags::YOUR_STATE,
            Message::HandDisconnected { .. } => tags::HAND_DISCONNECTED,
        }
    }
}

/// Which of the two chat tags carried an upsert. Both behave identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatUpsert {
    Add,
    Update,
}

/// An inbound frame, decoded only as far as the server needs.
#[derive(Debug, Clone)]
pub enum ClientFrame {
    HandJoined {
        session_id: Option<String>,
        sender_id: String,
    },
    UpdateState {
        state: GameState,
    },
    Chat {
        kind: ChatUpsert,
        message: ChatMessage,
    },
    ReconnectPing,
    /// Any other tag: passed on verbatim.
    Relay {
        tag: String,
    },
}

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type", borrow)]
    tag: Cow<'a, str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandJoinedFrame {
    #[serde(default)]
    session_id: Option<String>,
    sender_id: String,
}

#[derive(Deserialize)]
struct UpdateStateFrame {
    state: GameState,
}

impl ClientFrame {
    /// Decode one inbound text frame.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope<'_> =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let tag = envelope.tag.as_ref();
        let invalid = |e: serde_json::Error| ProtocolError::InvalidFields {
            tag: tag.to_string(),
            reason: e.to_string(),
        };

        match tag {
            tags::HAND_JOINED => {
                let frame: HandJoinedFrame = serde_json::from_str(raw).map_err(invalid)?;
                if frame.sender_id.is_empty() {
                    return Err(ProtocolError::InvalidFields {
                        tag: tag.to_string(),
                        reason: "empty senderId".to_string(),
                    });
                }
                Ok(ClientFrame::HandJoined {
                    session_id: frame.session_id,
                    sender_id: frame.sender_id,
                })
            }
            tags::UPDATE_STATE => {
                let frame: UpdateStateFrame = serde_json::from_str(raw).map_err(invalid)?;
                Ok(ClientFrame::UpdateState { state: frame.state })
            }
            tags::ADD | tags::UPDATE => {
                let message: ChatMessage = serde_json::from_str(raw).map_err(invalid)?;
                let kind = if tag == tags::ADD {
                    ChatUpsert::Add
                } else {
                    ChatUpsert::Update
                };
                Ok(ClientFrame::Chat { kind, message })
            }
            tags::RECONNECT_PING => Ok(ClientFrame::ReconnectPing),
            other => Ok(ClientFrame::Relay {
                tag: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use crate::game::empty_object;

    #[test]
    fn test_your_state_wire_shape() {
        let msg = Message::YourState {
            hand_id: "h1".to_string(),
            state: empty_object(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"your-state","handId":"h1","state":{}}"#
        );
    }

    #[test]
    fn test_hydrate_wire_shape() {
        let msg = Message::Hydrate {
            messages: vec![ChatMessage {
                id: "m1".to_string(),
                content: "hello".to_string(),
                user: "u".to_string(),
                role: ChatRole::Assistant,
            }],
            game_state: GameState::default(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "hydrate");
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert_eq!(
            json["gameState"],
            serde_json::json!({"serverState": [], "handsState": []})
        );
    }

    #[test]
    fn test_update_state_serializes_opaque_payload_verbatim() {
        let state: GameState = serde_json::from_str(
            r#"{"serverState":[1,2],"handsState":[{"handId":"h1","state":{"bet":5}}]}"#,
        )
        .unwrap();
        let msg = Message::UpdateState { state };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"update-state","state":{"serverState":[1,2],"handsState":[{"handId":"h1","state":{"bet":5}}]}}"#
        );
    }

    #[test]
    fn test_hand_disconnected_wire_shape() {
        let msg = Message::HandDisconnected {
            sender_id: "h1".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"hand-disconnected","senderId":"h1"}"#
        );
        assert_eq!(msg.tag(), tags::HAND_DISCONNECTED);
    }

    #[test]
    fn test_parse_hand_joined() {
        let frame =
            ClientFrame::parse(r#"{"type":"hand-joined","sessionId":"s1","senderId":"h1"}"#)
                .unwrap();
        match frame {
            ClientFrame::HandJoined {
                session_id,
                sender_id,
            } => {
                assert_eq!(session_id.as_deref(), Some("s1"));
                assert_eq!(sender_id, "h1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_hand_joined_requires_sender() {
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"hand-joined","sessionId":"s1"}"#),
            Err(ProtocolError::InvalidFields { .. })
        ));
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"hand-joined","senderId":""}"#),
            Err(ProtocolError::InvalidFields { .. })
        ));
    }

    #[test]
    fn test_parse_update_state_keeps_payload() {
        let frame = ClientFrame::parse(
            r#"{"type":"update-state","state":{"serverState":{"pot":10},"handsState":[{"handId":"h1","state":{"bet":5}}]}}"#,
        )
        .unwrap();
        let ClientFrame::UpdateState { state } = frame else {
            panic!("expected update-state");
        };
        assert_eq!(state.server_state().get(), r#"{"pot":10}"#);
        assert_eq!(state.hands().len(), 1);
        assert_eq!(state.hand("h1").unwrap().state().get(), r#"{"bet":5}"#);
        assert!(state.is_verbatim());
    }

    #[test]
    fn test_parse_update_state_without_state_is_invalid() {
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"update-state"}"#),
            Err(ProtocolError::InvalidFields { .. })
        ));
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"update-state","state":null}"#),
            Err(ProtocolError::InvalidFields { .. })
        ));
    }

    #[test]
    fn test_parse_chat_upserts() {
        let frame = ClientFrame::parse(
            r#"{"type":"update","id":"m1","content":"x","user":"u","role":"user"}"#,
        )
        .unwrap();
        let ClientFrame::Chat { kind, message } = frame else {
            panic!("expected chat frame");
        };
        assert_eq!(kind, ChatUpsert::Update);
        assert_eq!(message.id, "m1");
        assert_eq!(message.content, "x");

        assert!(ClientFrame::parse(r#"{"type":"add","id":"m1","content":"x","user":"u","role":"robot"}"#).is_err());
    }

    #[test]
    fn test_parse_relays_unknown_and_server_tags() {
        for raw in [
            r#"{"type":"deal-cards","n":3}"#,
            r#"{"type":"table-confirm","sessionId":"s1","senderId":"table","message":"ok"}"#,
            r#"{"type":"hand-disconnected","senderId":"h1"}"#,
        ] {
            assert!(matches!(ClientFrame::parse(raw).unwrap(), ClientFrame::Relay { .. }));
        }
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"reconnect-ping"}"#).unwrap(),
            ClientFrame::ReconnectPing
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["not json", "[1,2]", r#"{"no_type":true}"#, r#"{"type":7}"#] {
            assert!(matches!(ClientFrame::parse(raw), Err(ProtocolError::Malformed(_))));
        }
    }
}
