//! Admin control surface
//!
//! Two JSON actions, each mapped onto one component call:
//!
//! | Action | Payload | Target |
//! |--------|---------|--------|
//! | `clear_cache` | `{pattern?, namespace?}` | `MultiLevelCache::clear` |
//! | `invalidate_cache` | `{type, scope, data?}` | `InvalidationEngine::invalidate` |
//!
//! ```json
//! {"action": "invalidate_cache", "type": "price_change", "scope": {"token": "ETH"}}
//! ```

use crate::constants::ADMIN_EVENT_SOURCE;
use crate::context::AppContext;
use mlc_domain::error::Result;
use mlc_domain::events::{EventType, ScopeFields, WireEvent};
use mlc_domain::value_objects::KeyPattern;
use serde::{Deserialize, Serialize};

/// An admin request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Clear both tiers, optionally restricted to a key pattern or namespace
    ClearCache {
        /// Key or `prefix*`; everything when absent
        #[serde(default)]
        pattern: Option<String>,
        /// Namespace to clear instead of the defaults
        #[serde(default)]
        namespace: Option<String>,
    },
    /// Submit an invalidation event
    InvalidateCache {
        /// Event type
        #[serde(rename = "type")]
        event_type: EventType,
        /// Untyped scope, validated against the event type
        #[serde(default)]
        scope: ScopeFields,
        /// Opaque payload
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl AdminCommand {
    /// Parse a JSON command
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What an admin command did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdminOutcome {
    /// Cache cleared; `success` is false when a tier could not be cleared
    Cleared {
        /// Every tier cleared
        success: bool,
    },
    /// Event queued for the invalidation engine
    Queued {
        /// Type of the queued event
        event_type: EventType,
    },
}

/// Execute `command` against `context`
pub async fn dispatch(context: &AppContext, command: AdminCommand) -> Result<AdminOutcome> {
    match command {
        AdminCommand::ClearCache { pattern, namespace } => {
            let pattern = pattern.as_deref().map(KeyPattern::parse);
            let strategy = context.engine().default_strategy();
            let success = context
                .cache()
                .clear(pattern.as_ref(), namespace.as_deref(), &strategy)
                .await;
            tracing::info!(
                pattern = ?pattern.as_ref().map(ToString::to_string),
                namespace = ?namespace,
                success,
                "Admin cleared cache"
            );
            Ok(AdminOutcome::Cleared { success })
        }
        AdminCommand::InvalidateCache {
            event_type,
            scope,
            data,
        } => {
            context.engine().invalidate_wire(WireEvent {
                event_type,
                scope,
                data,
                timestamp: None,
                source: Some(ADMIN_EVENT_SOURCE.to_string()),
            })?;
            tracing::info!(event_type = %event_type, "Admin queued invalidation");
            Ok(AdminOutcome::Queued { event_type })
        }
    }
}
