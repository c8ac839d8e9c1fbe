//! SSH events and their normalized form.
//!
//! `SshEvent` is the closed set of things the guard reports. Each event turns
//! into exactly one [`NormalizedEvent`], the flat field/tag record delivered to
//! the telemetry sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::device_identity::DeviceIdentity;
use crate::session_management::SessionKey;

pub const GROUP_TAG: &str = "SSH";
pub const UNKNOWN_USER: &str = "unknown";

/// Data shared by every SSH event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Empty when the user is not known.
    pub user: String,
    pub key: SessionKey,
    pub timestamp_ms: i64,
}

impl EventContext {
    pub fn new(user: impl Into<String>, key: SessionKey, timestamp_ms: i64) -> Self {
        Self {
            user: user.into(),
            key,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshEvent {
    NewConnection(EventContext),
    LoginAttemptFailed(EventContext),
    LoginFailedFinal(EventContext),
    LoginSucceeded(EventContext),
    Logout(EventContext),
    RxBytes(EventContext, u64),
    TxBytes(EventContext, u64),
}

impl SshEvent {
    pub fn context(&self) -> &EventContext {
        match self {
            SshEvent::NewConnection(ctx)
            | SshEvent::LoginAttemptFailed(ctx)
            | SshEvent::LoginFailedFinal(ctx)
            | SshEvent::LoginSucceeded(ctx)
            | SshEvent::Logout(ctx)
            | SshEvent::RxBytes(ctx, _)
            | SshEvent::TxBytes(ctx, _) => ctx,
        }
    }

    /// Value of the `eventType` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            SshEvent::NewConnection(_) => "conn",
            SshEvent::LoginSucceeded(_) => "login",
            SshEvent::LoginAttemptFailed(_) => "login_attempt_fail",
            SshEvent::LoginFailedFinal(_) => "login_fail",
            SshEvent::Logout(_) => "logout",
            SshEvent::RxBytes(..) => "ssh_session_rx_bytes",
            SshEvent::TxBytes(..) => "ssh_session_tx_bytes",
        }
    }

    pub fn normalize(&self, device: &DeviceIdentity) -> NormalizedEvent {
        let ctx = self.context();

        let mut tags = BTreeMap::new();
        tags.insert("group".to_string(), GROUP_TAG.to_string());
        tags.insert("ip".to_string(), ctx.key.ip.to_string());
        tags.insert("port".to_string(), ctx.key.port.to_string());
        tags.insert("eventType".to_string(), self.event_type().to_string());
        let user = if ctx.user.is_empty() {
            UNKNOWN_USER
        } else {
            ctx.user.as_str()
        };
        tags.insert("user".to_string(), user.to_string());

        let mut fields = BTreeMap::new();
        match self {
            SshEvent::RxBytes(_, bytes) | SshEvent::TxBytes(_, bytes) => {
                fields.insert("connbytes".to_string(), FieldValue::UInt(*bytes));
            }
            _ => {
                fields.insert("authevent".to_string(), FieldValue::Int(1));
            }
        }

        NormalizedEvent {
            fields,
            tags,
            device_id: device.id().to_string(),
            timestamp: DateTime::<Utc>::from_timestamp_millis(ctx.timestamp_ms)
                .unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
}

/// The record handed to the event sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub fields: BTreeMap<String, FieldValue>,
    pub tags: BTreeMap<String, String>,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedEvent {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).copied()
    }
}
