use anyhow::{Result, anyhow};

use crate::types::{BurnEvent, CollectEvent, EventKind, MintEvent, PoolEvent, SwapEvent};

/// Nullable variant columns of one `pool_events` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EventColumns {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub owner: Option<String>,
    pub tick: Option<i32>,
    pub tick_lower: Option<i32>,
    pub tick_upper: Option<i32>,
    pub amount: Option<String>,
    pub amount0: Option<String>,
    pub amount1: Option<String>,
    pub sqrt_price_x96: Option<String>,
    pub liquidity: Option<String>,
}

impl From<&PoolEvent> for EventColumns {
    fn from(event: &PoolEvent) -> Self {
        match event {
            PoolEvent::Swap(e) => EventColumns {
                sender: Some(e.sender.clone()),
                recipient: Some(e.to.clone()),
                tick: Some(e.tick),
                amount0: Some(e.amount0.clone()),
                amount1: Some(e.amount1.clone()),
                sqrt_price_x96: Some(e.sqrt_price_x96.clone()),
                liquidity: Some(e.liquidity.clone()),
                ..Default::default()
            },
            PoolEvent::Mint(e) => EventColumns {
                sender: Some(e.sender.clone()),
                owner: Some(e.owner.clone()),
                tick_lower: Some(e.tick_lower),
                tick_upper: Some(e.tick_upper),
                amount: Some(e.amount.clone()),
                amount0: Some(e.amount0.clone()),
                amount1: Some(e.amount1.clone()),
                ..Default::default()
            },
            PoolEvent::Burn(e) => EventColumns {
                owner: Some(e.owner.clone()),
                tick_lower: Some(e.tick_lower),
                tick_upper: Some(e.tick_upper),
                amount: Some(e.amount.clone()),
                amount0: Some(e.amount0.clone()),
                amount1: Some(e.amount1.clone()),
                ..Default::default()
            },
            PoolEvent::Collect(e) => EventColumns {
                owner: Some(e.owner.clone()),
                recipient: Some(e.recipient.clone()),
                tick_lower: Some(e.tick_lower),
                tick_upper: Some(e.tick_upper),
                amount0: Some(e.amount0.clone()),
                amount1: Some(e.amount1.clone()),
                ..Default::default()
            },
        }
    }
}

fn required<T>(value: Option<T>, kind: EventKind, column: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("{kind} row missing {column}"))
}

impl EventColumns {
    pub fn into_event(self, kind: EventKind) -> Result<PoolEvent> {
        Ok(match kind {
            EventKind::Swap => PoolEvent::Swap(SwapEvent {
                sender: required(self.sender, kind, "sender")?,
                to: required(self.recipient, kind, "recipient")?,
                amount0: required(self.amount0, kind, "amount0")?,
                amount1: required(self.amount1, kind, "amount1")?,
                sqrt_price_x96: required(self.sqrt_price_x96, kind, "sqrt_price_x96")?,
                liquidity: required(self.liquidity, kind, "liquidity")?,
                tick: required(self.tick, kind, "tick")?,
            }),
            EventKind::Mint => PoolEvent::Mint(MintEvent {
                sender: required(self.sender, kind, "sender")?,
                owner: required(self.owner, kind, "owner")?,
                tick_lower: required(self.tick_lower, kind, "tick_lower")?,
                tick_upper: required(self.tick_upper, kind, "tick_upper")?,
                amount: required(self.amount, kind, "amount")?,
                amount0: required(self.amount0, kind, "amount0")?,
                amount1: required(self.amount1, kind, "amount1")?,
            }),
            EventKind::Burn => PoolEvent::Burn(BurnEvent {
                owner: required(self.owner, kind, "owner")?,
                tick_lower: required(self.tick_lower, kind, "tick_lower")?,
                tick_upper: required(self.tick_upper, kind, "tick_upper")?,
                amount: required(self.amount, kind, "amount")?,
                amount0: required(self.amount0, kind, "amount0")?,
                amount1: required(self.amount1, kind, "amount1")?,
            }),
            EventKind::Collect => PoolEvent::Collect(CollectEvent {
                owner: required(self.owner, kind, "owner")?,
                recipient: required(self.recipient, kind, "recipient")?,
                tick_lower: required(self.tick_lower, kind, "tick_lower")?,
                tick_upper: required(self.tick_upper, kind, "tick_upper")?,
                amount0: required(self.amount0, kind, "amount0")?,
                amount1: required(self.amount1, kind, "amount1")?,
            }),
        })
    }
}
