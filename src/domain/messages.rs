//! Bayeux Message Types
//!
//! Control envelopes exchanged on the realtime socket. Every outbound message
//! is a single-element JSON array; for inbound arrays only the first element is
//! consulted.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use super::entities::Advice;
use crate::shared::error::{ClientError, FrameError};

/// Connection type negotiated at handshake and sent with every heartbeat.
pub const CONNECTION_TYPE: &str = "websocket";

/// Bayeux protocol version sent at handshake.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Meta channel names.
pub mod channels {
    pub const HANDSHAKE: &str = "/meta/handshake";
    pub const HEARTBEAT: &str = "/meta/connect";
    pub const SUBSCRIBE: &str = "/meta/subscribe";
    pub const UNSUBSCRIBE: &str = "/meta/unsubscribe";
    pub const DISCONNECT: &str = "/meta/disconnect";
}

/// Classification of an inbound frame by its `channel` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Handshake,
    Heartbeat,
    Subscribe,
    Unsubscribe,
    /// Anything that is not a control response (data notifications)
    Other,
}

impl Channel {
    pub fn from_name(name: &str) -> Self {
        match name {
            channels::HANDSHAKE => Self::Handshake,
            channels::HEARTBEAT => Self::Heartbeat,
            channels::SUBSCRIBE => Self::Subscribe,
            channels::UNSUBSCRIBE => Self::Unsubscribe,
            _ => Self::Other,
        }
    }

    /// Peek at the channel of an inbound frame.
    ///
    /// Unparsable frames classify as [`Channel::Other`].
    pub fn of_frame(data: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ChannelEnvelope {
            #[serde(default)]
            channel: Option<String>,
        }

        serde_json::from_slice::<Vec<ChannelEnvelope>>(data)
            .ok()
            .and_then(|items| items.into_iter().next())
            .and_then(|envelope| envelope.channel)
            .map_or(Self::Other, |name| Self::from_name(&name))
    }
}

/// Encode a message as a single-element JSON array.
pub fn encode_envelope<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&[message])
}

/// Decode the first element of an inbound JSON array.
pub fn decode_first<T: DeserializeOwned>(data: &[u8]) -> Result<T, FrameError> {
    serde_json::from_slice::<Vec<T>>(data)?
        .into_iter()
        .next()
        .ok_or(FrameError::Empty)
}

// ============================================================================
// Requests
// ============================================================================

/// Credentials carried in the handshake extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Basic { username: String, password: String },
    Token(String),
}

impl Authentication {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value placed in `ext."com.cumulocity.authn".token`.
    pub fn token(&self) -> String {
        match self {
            Self::Basic { username, password } => STANDARD.encode(format!("{}:{}", username, password)),
            Self::Token(token) => token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ext {
    #[serde(rename = "com.cumulocity.authn")]
    pub authn: AuthnToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthnToken {
    pub token: String,
}

impl From<&Authentication> for Ext {
    fn from(auth: &Authentication) -> Self {
        Self {
            authn: AuthnToken { token: auth.token() },
        }
    }
}

/// `/meta/handshake` request
#[derive(Debug, Clone, Serialize)]
pub struct HandshakeRequest {
    pub channel: &'static str,
    pub id: String,
    pub version: &'static str,
    pub ext: Ext,
}

impl HandshakeRequest {
    pub fn new(id: String, auth: &Authentication) -> Self {
        Self {
            channel: channels::HANDSHAKE,
            id,
            version: PROTOCOL_VERSION,
            ext: Ext::from(auth),
        }
    }
}

/// `/meta/connect` request (heartbeat)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub channel: &'static str,
    pub client_id: String,
    pub connection_type: &'static str,
    pub advice: Advice,
}

impl HeartbeatRequest {
    pub fn new(client_id: String, advice: Advice) -> Self {
        Self {
            channel: channels::HEARTBEAT,
            client_id,
            connection_type: CONNECTION_TYPE,
            advice,
        }
    }
}

/// `/meta/subscribe` or `/meta/unsubscribe` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub channel: &'static str,
    pub id: String,
    pub client_id: String,
    pub subscription: String,
}

impl SubscriptionRequest {
    pub fn subscribe(id: String, client_id: String, topic: String) -> Self {
        Self {
            channel: channels::SUBSCRIBE,
            id,
            client_id,
            subscription: topic,
        }
    }

    pub fn unsubscribe(id: String, client_id: String, topic: String) -> Self {
        Self {
            channel: channels::UNSUBSCRIBE,
            id,
            client_id,
            subscription: topic,
        }
    }
}

/// `/meta/disconnect` request; stops the server-side heartbeat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub channel: &'static str,
    pub client_id: String,
}

impl DisconnectRequest {
    pub fn new(client_id: String) -> Self {
        Self {
            channel: channels::DISCONNECT,
            client_id,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Responses matched to their request by id.
pub trait Correlated {
    fn id(&self) -> &str;
}

/// `/meta/handshake` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub supported_connection_types: Option<Vec<String>>,
}

impl HandshakeResponse {
    /// Validate the response and extract the assigned client id.
    pub fn into_client_id(self, connection_type: &str) -> Result<String, ClientError> {
        if !self.successful {
            return Err(ClientError::protocol(self.error.as_deref()));
        }

        let client_id = self
            .client_id
            .ok_or_else(|| ClientError::InvalidResponse("Client id is null.".into()))?;

        let supported = self
            .supported_connection_types
            .is_some_and(|types| types.iter().any(|t| t == connection_type));
        if !supported {
            return Err(ClientError::InvalidResponse(format!(
                "{} is not supported.",
                connection_type
            )));
        }

        Ok(client_id)
    }
}

/// `/meta/connect` response (heartbeat)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// A missing field is zero advice; only an explicit `null` is `None`.
    #[serde(default = "zero_advice", deserialize_with = "explicit_advice")]
    pub advice: Option<Advice>,
}

fn zero_advice() -> Option<Advice> {
    Some(Advice::default())
}

fn explicit_advice<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Advice>, D::Error> {
    Option::<Advice>::deserialize(deserializer)
}

impl HeartbeatResponse {
    /// Validate the response and extract the server's advice.
    pub fn into_advice(self) -> Result<Advice, ClientError> {
        if !self.successful {
            return Err(ClientError::protocol(self.error.as_deref()));
        }

        self.advice
            .ok_or_else(|| ClientError::InvalidResponse("Advice is null.".into()))
    }
}

/// `/meta/subscribe` and `/meta/unsubscribe` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}

impl SubscriptionResponse {
    pub fn into_result(self) -> Result<(), ClientError> {
        if self.successful {
            Ok(())
        } else {
            Err(ClientError::protocol(self.error.as_deref()))
        }
    }
}

impl Correlated for HandshakeResponse {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Correlated for SubscriptionResponse {
    fn id(&self) -> &str {
        &self.id
    }
}
