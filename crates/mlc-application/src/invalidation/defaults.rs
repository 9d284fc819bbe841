//! Built-in invalidation rules
//!
//! Key layout these rules assume:
//!
//! | Data | Keys |
//! |------|------|
//! | Chain views | `positions:{chain}:…`, `protocols:{chain}:…`, `analytics:{chain}:…` |
//! | Protocol | `protocol:{protocol}`, `protocol:{protocol}:…` |
//! | Wallet | `wallet:{wallet}:…` |
//! | Position | `position:{id}`, `position:{id}:…`, `wallet:{wallet}:summary` |
//! | Price | `price:{token}`, `price:{token}:…`, `token:{token}:…` |

use super::rule::InvalidationRule;
use mlc_domain::constants::PRICE_CHANGE_DELAY_MS;
use mlc_domain::error::Error;
use mlc_domain::events::{EventType, InvalidationEvent, InvalidationScope};
use mlc_domain::value_objects::KeyPattern;
use std::time::Duration;

fn unexpected(event: &InvalidationEvent, rule: &str) -> Error {
    Error::invalid_event(format!(
        "rule {rule} received a {} scope",
        event.scope.event_type()
    ))
}

/// Every built-in rule
pub fn default_rules() -> Vec<InvalidationRule> {
    vec![
        chain_update_rule(),
        protocol_update_rule(),
        wallet_update_rule(),
        position_change_rule(),
        price_change_rule(),
        manual_rule(),
        dependency_change_rule(),
    ]
}

/// Chain-wide refresh: every positional, protocol and analytics view of the chain
pub fn chain_update_rule() -> InvalidationRule {
    InvalidationRule::new("chain-update", EventType::ChainUpdate, |event| {
        match &event.scope {
            InvalidationScope::ChainUpdate { chain } => Ok(vec![
                KeyPattern::prefix(format!("positions:{chain}:")),
                KeyPattern::prefix(format!("protocols:{chain}:")),
                KeyPattern::prefix(format!("analytics:{chain}:")),
            ]),
            _ => Err(unexpected(event, "chain-update")),
        }
    })
    .batched()
}

/// Protocol state change, narrowed to one chain when given
pub fn protocol_update_rule() -> InvalidationRule {
    InvalidationRule::new("protocol-update", EventType::ProtocolUpdate, |event| {
        match &event.scope {
            InvalidationScope::ProtocolUpdate { protocol, chain } => {
                let mut keys = vec![
                    KeyPattern::literal(format!("protocol:{protocol}")),
                    KeyPattern::prefix(format!("protocol:{protocol}:")),
                ];
                if let Some(chain) = chain {
                    keys.push(KeyPattern::prefix(format!("protocols:{chain}:{protocol}")));
                }
                Ok(keys)
            }
            _ => Err(unexpected(event, "protocol-update")),
        }
    })
    .batched()
}

/// Wallet holdings changed
pub fn wallet_update_rule() -> InvalidationRule {
    InvalidationRule::new("wallet-update", EventType::WalletUpdate, |event| {
        match &event.scope {
            InvalidationScope::WalletUpdate { wallet, chain } => {
                let mut keys = vec![KeyPattern::prefix(format!("wallet:{wallet}:"))];
                if let Some(chain) = chain {
                    keys.push(KeyPattern::prefix(format!("positions:{chain}:{wallet}:")));
                }
                Ok(keys)
            }
            _ => Err(unexpected(event, "wallet-update")),
        }
    })
}

/// One position changed: the position, its nested views and the owner summary
pub fn position_change_rule() -> InvalidationRule {
    InvalidationRule::new("position-change", EventType::PositionChange, |event| {
        match &event.scope {
            InvalidationScope::PositionChange {
                wallet, position, ..
            } => Ok(vec![
                KeyPattern::literal(format!("position:{position}")),
                KeyPattern::prefix(format!("position:{position}:")),
                KeyPattern::literal(format!("wallet:{wallet}:summary")),
            ]),
            _ => Err(unexpected(event, "position-change")),
        }
    })
}

/// Token price moved; delayed to absorb bursts of updates
pub fn price_change_rule() -> InvalidationRule {
    InvalidationRule::new("price-change", EventType::PriceChange, |event| {
        match &event.scope {
            InvalidationScope::PriceChange { token, .. } => Ok(vec![
                KeyPattern::literal(format!("price:{token}")),
                KeyPattern::prefix(format!("price:{token}:")),
                KeyPattern::prefix(format!("token:{token}:")),
            ]),
            _ => Err(unexpected(event, "price-change")),
        }
    })
    .with_delay(Duration::from_millis(PRICE_CHANGE_DELAY_MS))
}

/// Operator action: everything when global, otherwise the listed keys
pub fn manual_rule() -> InvalidationRule {
    InvalidationRule::new("manual", EventType::Manual, |event| match &event.scope {
        InvalidationScope::Manual { global: true, .. } => Ok(vec![KeyPattern::all()]),
        InvalidationScope::Manual { keys, .. } => {
            Ok(keys.iter().map(|key| KeyPattern::parse(key)).collect())
        }
        _ => Err(unexpected(event, "manual")),
    })
}

/// Dependents of an invalidated prerequisite
pub fn dependency_change_rule() -> InvalidationRule {
    InvalidationRule::new("dependency-change", EventType::DependencyChange, |event| {
        match &event.scope {
            InvalidationScope::DependencyChange { dependents, .. } => {
                Ok(dependents.iter().map(KeyPattern::literal).collect())
            }
            _ => Err(unexpected(event, "dependency-change")),
        }
    })
}
