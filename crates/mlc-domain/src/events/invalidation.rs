//! Invalidation events
//!
//! Producers (scanners, price feeds, admin actions) describe *what changed*;
//! the invalidation engine decides which keys that affects. The scope is a
//! tagged union keyed by event type so rules can match exhaustively.

use crate::constants::GLOBAL_SCOPE;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A chain-wide refresh (new block range scanned, global update)
    ChainUpdate,
    /// A protocol's state changed on a chain
    ProtocolUpdate,
    /// A wallet's holdings changed
    WalletUpdate,
    /// A single position changed
    PositionChange,
    /// A token price moved
    PriceChange,
    /// Operator-issued invalidation
    Manual,
    /// Synthetic event emitted when a prerequisite key is invalidated
    DependencyChange,
}

impl EventType {
    /// Every event type, in declaration order
    pub const ALL: [Self; 7] = [
        Self::ChainUpdate,
        Self::ProtocolUpdate,
        Self::WalletUpdate,
        Self::PositionChange,
        Self::PriceChange,
        Self::Manual,
        Self::DependencyChange,
    ];

    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChainUpdate => "chain_update",
            Self::ProtocolUpdate => "protocol_update",
            Self::WalletUpdate => "wallet_update",
            Self::PositionChange => "position_change",
            Self::PriceChange => "price_change",
            Self::Manual => "manual",
            Self::DependencyChange => "dependency_change",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| Error::invalid_event(format!("unknown event type: {s}")))
    }
}

/// What an event touches, shaped by its type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvalidationScope {
    /// Everything derived from a chain
    ChainUpdate {
        /// Chain identifier
        chain: String,
    },
    /// A protocol, optionally on one chain
    ProtocolUpdate {
        /// Protocol identifier
        protocol: String,
        /// Chain identifier
        chain: Option<String>,
    },
    /// A wallet's aggregate views
    WalletUpdate {
        /// Wallet address
        wallet: String,
        /// Chain identifier
        chain: Option<String>,
    },
    /// One position and the views built on it
    PositionChange {
        /// Owning wallet
        wallet: String,
        /// Position identifier
        position: String,
        /// Chain identifier
        chain: Option<String>,
        /// Protocol identifier
        protocol: Option<String>,
    },
    /// A token price and its dependents
    PriceChange {
        /// Token symbol or address
        token: String,
        /// Chain identifier
        chain: Option<String>,
    },
    /// Operator action: explicit keys or everything
    Manual {
        /// Invalidate everything
        global: bool,
        /// Explicit keys (`*` suffix for prefixes)
        keys: Vec<String>,
        /// Chain identifier
        chain: Option<String>,
    },
    /// Dependents of an invalidated prerequisite
    DependencyChange {
        /// Key that was invalidated
        prerequisite: String,
        /// Keys registered as depending on it
        dependents: Vec<String>,
    },
}

impl InvalidationScope {
    /// Event type carried by this scope
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ChainUpdate { .. } => EventType::ChainUpdate,
            Self::ProtocolUpdate { .. } => EventType::ProtocolUpdate,
            Self::WalletUpdate { .. } => EventType::WalletUpdate,
            Self::PositionChange { .. } => EventType::PositionChange,
            Self::PriceChange { .. } => EventType::PriceChange,
            Self::Manual { .. } => EventType::Manual,
            Self::DependencyChange { .. } => EventType::DependencyChange,
        }
    }

    /// Chain the scope is restricted to, if any
    pub fn chain(&self) -> Option<&str> {
        match self {
            Self::ChainUpdate { chain } => Some(chain),
            Self::ProtocolUpdate { chain, .. }
            | Self::WalletUpdate { chain, .. }
            | Self::PositionChange { chain, .. }
            | Self::PriceChange { chain, .. }
            | Self::Manual { chain, .. } => chain.as_deref(),
            Self::DependencyChange { .. } => None,
        }
    }

    /// Batch bucket component: the chain, or the shared global bucket
    pub fn batch_scope(&self) -> &str {
        self.chain().unwrap_or(GLOBAL_SCOPE)
    }

    /// Build a typed scope from the loosely-typed wire fields
    pub fn from_fields(event_type: EventType, fields: ScopeFields) -> Result<Self> {
        let ScopeFields {
            chain,
            protocol,
            wallet,
            position,
            token,
            global,
            keys,
            prerequisite,
            dependents,
        } = fields;

        let scope = match event_type {
            EventType::ChainUpdate => Self::ChainUpdate {
                chain: required(chain, event_type, "chain")?,
            },
            EventType::ProtocolUpdate => Self::ProtocolUpdate {
                protocol: required(protocol, event_type, "protocol")?,
                chain,
            },
            EventType::WalletUpdate => Self::WalletUpdate {
                wallet: required(wallet, event_type, "wallet")?,
                chain,
            },
            EventType::PositionChange => Self::PositionChange {
                wallet: required(wallet, event_type, "wallet")?,
                position: required(position, event_type, "position")?,
                chain,
                protocol,
            },
            EventType::PriceChange => Self::PriceChange {
                token: required(token, event_type, "token")?,
                chain,
            },
            EventType::Manual => {
                let global = global.unwrap_or(false);
                let keys = keys.unwrap_or_default();
                if !global && keys.is_empty() {
                    return Err(Error::invalid_event(
                        "manual event needs `global: true` or a non-empty `keys` list",
                    ));
                }
                Self::Manual { global, keys, chain }
            }
            EventType::DependencyChange => Self::DependencyChange {
                prerequisite: required(prerequisite, event_type, "prerequisite")?,
                dependents: dependents.unwrap_or_default(),
            },
        };
        Ok(scope)
    }
}

fn required(value: Option<String>, event_type: EventType, field: &str) -> Result<String> {
    value.ok_or_else(|| Error::invalid_event(format!("{event_type} event requires scope.{field}")))
}

/// Loosely-typed scope as sent by producers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeFields {
    pub chain: Option<String>,
    pub protocol: Option<String>,
    pub wallet: Option<String>,
    pub position: Option<String>,
    pub token: Option<String>,
    pub global: Option<bool>,
    pub keys: Option<Vec<String>>,
    pub prerequisite: Option<String>,
    pub dependents: Option<Vec<String>>,
}

/// Event wire form: `{ type, scope, data, timestamp, source }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Untyped scope
    #[serde(default)]
    pub scope: ScopeFields,
    /// Opaque payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    /// Producer name
    pub source: Option<String>,
}

/// An invalidation request
///
/// Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// What changed
    pub scope: InvalidationScope,
    /// Opaque producer payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// When the change was observed
    pub timestamp: DateTime<Utc>,
    /// Who reported it
    pub source: String,
}

impl InvalidationEvent {
    /// Create an event stamped with the current time
    pub fn new<S: Into<String>>(scope: InvalidationScope, source: S) -> Self {
        Self {
            scope,
            data: serde_json::Value::Null,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Event type carried by the scope
    pub fn event_type(&self) -> EventType {
        self.scope.event_type()
    }

    /// Build a typed event from its wire form
    pub fn from_wire(wire: WireEvent) -> Result<Self> {
        let scope = InvalidationScope::from_fields(wire.event_type, wire.scope)?;
        let timestamp = match wire.timestamp {
            Some(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| Error::invalid_event(format!("invalid timestamp: {millis}")))?,
            None => Utc::now(),
        };
        Ok(Self {
            scope,
            data: wire.data,
            timestamp,
            source: wire.source.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
