//! The game-state blob the session transports and persists.
//!
//! The core reads only `serverState`, `handsState` and each hand's `handId`
//! and `state`. Every other member is carried along untouched, in the order
//! it arrived, and every value is held as raw JSON text. A state decoded from
//! the wire also keeps its source text and is written back out exactly as
//! received until the core itself has to change it.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// An uninterpreted JSON value.
pub type Opaque = Box<RawValue>;

/// `{}` -- the state a hand starts with.
pub fn empty_object() -> Opaque {
    RawValue::from_string("{}".to_owned()).expect("literal JSON object is valid")
}

/// `[]` -- the shared state of a session nobody has written to yet.
pub fn empty_array() -> Opaque {
    RawValue::from_string("[]".to_owned()).expect("literal JSON array is valid")
}

/// Full game state of a session: the shared table view plus one private
/// entry per hand.
#[derive(Debug, Clone)]
pub struct GameState {
    server_state: Opaque,
    hands_state: Vec<HandState>,
    extra: Vec<(String, Opaque)>,
    /// Exact text this state was decoded from. Only kept while it is
    /// complete and nothing has changed it.
    source: Option<Opaque>,
}

/// Private state addressed to a single hand.
#[derive(Debug, Clone)]
pub struct HandState {
    hand_id: Option<String>,
    state: Opaque,
    extra: Vec<(String, Opaque)>,
    source: Option<Opaque>,
}

impl HandState {
    /// A freshly joined hand with `{}` as its state.
    pub fn empty(hand_id: impl Into<String>) -> Self {
        Self {
            hand_id: Some(hand_id.into()),
            state: empty_object(),
            extra: Vec::new(),
            source: None,
        }
    }

    /// The hand this entry belongs to. Entries without a `handId` are kept
    /// but never addressed.
    pub fn hand_id(&self) -> Option<&str> {
        self.hand_id.as_deref()
    }

    pub fn state(&self) -> &RawValue {
        &self.state
    }

    /// A member other than `handId` and `state`.
    pub fn member(&self, key: &str) -> Option<&RawValue> {
        find_member(&self.extra, key)
    }

    fn from_source(source: Opaque) -> Result<Self, serde_json::Error> {
        let Members(members) = serde_json::from_str(source.get())?;
        let mut hand_id = None;
        let mut state = None;
        let mut extra = Vec::new();

        for (key, value) in members {
            match key.as_str() {
                "handId" => hand_id = Some(serde_json::from_str::<String>(value.get())?),
                "state" => state = Some(value),
                _ => extra.push((key, value)),
            }
        }

        let complete = state.is_some();
        Ok(Self {
            hand_id,
            state: state.unwrap_or_else(empty_object),
            extra,
            source: complete.then_some(source),
        })
    }
}

impl GameState {
    pub fn server_state(&self) -> &RawValue {
        &self.server_state
    }

    pub fn hands(&self) -> &[HandState] {
        &self.hands_state
    }

    /// A top-level member other than `serverState` and `handsState`.
    pub fn member(&self, key: &str) -> Option<&RawValue> {
        find_member(&self.extra, key)
    }

    /// Look up a hand's entry by id.
    pub fn hand(&self, hand_id: &str) -> Option<&HandState> {
        self.hands_state.iter().find(|h| h.hand_id() == Some(hand_id))
    }

    pub fn has_hand(&self, hand_id: &str) -> bool {
        self.hand(hand_id).is_some()
    }

    /// Append a hand entry.
    pub fn push_hand(&mut self, hand: HandState) {
        self.hands_state.push(hand);
        self.source = None;
    }

    /// Whether serializing writes back the exact text this state was decoded from.
    pub fn is_verbatim(&self) -> bool {
        self.source.is_some()
    }

    /// Collapse duplicate `handId`s so each hand appears once.
    ///
    /// The first occurrence keeps its position; the last occurrence's entry wins.
    /// A state without duplicates is returned unchanged.
    pub fn normalized(mut self) -> Self {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(self.hands_state.len());
        let mut hands: Vec<HandState> = Vec::with_capacity(self.hands_state.len());
        let mut collapsed = false;

        for hand in std::mem::take(&mut self.hands_state) {
            let Some(hand_id) = hand.hand_id.clone() else {
                hands.push(hand);
                continue;
            };
            match index.get(&hand_id) {
                Some(&pos) => {
                    hands[pos] = hand;
                    collapsed = true;
                }
                None => {
                    index.insert(hand_id, hands.len());
                    hands.push(hand);
                }
            }
        }

        self.hands_state = hands;
        if collapsed {
            self.source = None;
        }
        self
    }

    fn from_source(source: Opaque) -> Result<Self, serde_json::Error> {
        let Members(members) = serde_json::from_str(source.get())?;
        let mut server_state = None;
        let mut hands_state = None;
        let mut extra = Vec::new();

        for (key, value) in members {
            match key.as_str() {
                "serverState" => server_state = Some(value),
                "handsState" => hands_state = Some(serde_json::from_str::<Vec<HandState>>(value.get())?),
                _ => extra.push((key, value)),
            }
        }

        let complete = server_state.is_some() && hands_state.is_some();
        Ok(Self {
            server_state: server_state.unwrap_or_else(empty_array),
            hands_state: hands_state.unwrap_or_default(),
            extra,
            source: complete.then_some(source),
        })
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            server_state: empty_array(),
            hands_state: Vec::new(),
            extra: Vec::new(),
            source: None,
        }
    }
}

impl Serialize for GameState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(source) = &self.source {
            return source.serialize(serializer);
        }
        let mut map = serializer.serialize_map(Some(2 + self.extra.len()))?;
        map.serialize_entry("serverState", &self.server_state)?;
        map.serialize_entry("handsState", &self.hands_state)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GameState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = Opaque::deserialize(deserializer)?;
        Self::from_source(source).map_err(de::Error::custom)
    }
}

impl Serialize for HandState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(source) = &self.source {
            return source.serialize(serializer);
        }
        let mut map = serializer.serialize_map(Some(2 + self.extra.len()))?;
        if let Some(hand_id) = &self.hand_id {
            map.serialize_entry("handId", hand_id)?;
        }
        map.serialize_entry("state", &self.state)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HandState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = Opaque::deserialize(deserializer)?;
        Self::from_source(source).map_err(de::Error::custom)
    }
}

// Opaque payloads compare by their exact JSON text.
impl PartialEq for HandState {
    fn eq(&self, other: &Self) -> bool {
        self.hand_id == other.hand_id
            && self.state.get() == other.state.get()
            && same_members(&self.extra, &other.extra)
    }
}

impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.server_state.get() == other.server_state.get()
            && self.hands_state == other.hands_state
            && same_members(&self.extra, &other.extra)
    }
}

fn find_member<'a>(members: &'a [(String, Opaque)], key: &str) -> Option<&'a RawValue> {
    members.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_ref())
}

fn same_members(a: &[(String, Opaque)], b: &[(String, Opaque)]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|((ka, va), (kb, vb))| ka == kb && va.get() == vb.get())
}

/// The members of a JSON object in source order, values left raw.
struct Members(Vec<(String, Opaque)>);

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = Members;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Members, A::Error> {
                let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Opaque>()? {
                    members.push((key, value));
                }
                Ok(Members(members))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}
