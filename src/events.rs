// =============================================================================
// Event fan-out — typed events over per-topic broadcast channels
// =============================================================================
//
// Replaces a dynamic name-keyed callback registry with a strongly typed
// enum of event kinds and one `tokio::sync::broadcast` channel per topic
// family. A slow or dropped subscriber simply lags and the next receive
// call tells it how many messages it missed (`RecvError::Lagged`); the
// publisher never blocks on a subscriber and never retries a send.
//
// =============================================================================

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::genetic::EvolutionCycle;
use crate::token::TokenSnapshot;
use crate::trade::{Position, Trade};
use crate::treasury::TreasurySnapshot;

/// Named topic families subscribers can filter by. `All` receives every
/// event regardless of its natural topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Trades,
    Evolution,
    Strategies,
    Prices,
    Positions,
    Treasury,
    All,
}

const ROUTABLE_TOPICS: [Topic; 6] = [
    Topic::Trades,
    Topic::Evolution,
    Topic::Strategies,
    Topic::Prices,
    Topic::Positions,
    Topic::Treasury,
];

/// The full event vocabulary the engine emits.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TokenDiscovered { token: TokenSnapshot },
    SignalGenerated { strategy_id: Uuid, score: f64, should_trade: bool },
    TradeOpened { trade: Trade },
    TradeClosed { trade: Trade },
    PositionUpdated { position: Position },
    EngineStarted,
    EngineStopped,
    Error { message: String },

    TreasuryUpdated { snapshot: TreasurySnapshot },
    StrategiesLoaded { count: usize },

    EvolutionStarted,
    EvolutionBirths { ids: Vec<Uuid> },
    EvolutionDeaths { ids: Vec<Uuid> },
    EvolutionCompleted { cycle: EvolutionCycle },
    EvolutionError { message: String },

    SimulatorStarted,
    SimulatorStopped,
}

impl Event {
    /// The primary topic this event routes to (in addition to `All`).
    fn topic(&self) -> Topic {
        match self {
            Event::TokenDiscovered { .. } => Topic::Prices,
            Event::SignalGenerated { .. } => Topic::Strategies,
            Event::TradeOpened { .. } | Event::TradeClosed { .. } => Topic::Trades,
            Event::PositionUpdated { .. } => Topic::Positions,
            Event::EngineStarted | Event::EngineStopped | Event::Error { .. } => Topic::Strategies,
            Event::TreasuryUpdated { .. } => Topic::Treasury,
            Event::StrategiesLoaded { .. } => Topic::Strategies,
            Event::EvolutionStarted
            | Event::EvolutionBirths { .. }
            | Event::EvolutionDeaths { .. }
            | Event::EvolutionCompleted { .. }
            | Event::EvolutionError { .. } => Topic::Evolution,
            Event::SimulatorStarted | Event::SimulatorStopped => Topic::Strategies,
        }
    }
}

/// Multi-subscriber event bus. One broadcast channel per topic family;
/// publishing sends to the event's natural topic and to `All`.
pub struct EventBus {
    channels: std::collections::HashMap<Topic, broadcast::Sender<Event>>,
}

impl EventBus {
    /// `capacity` bounds each topic's backlog; once a lagging subscriber
    /// falls behind by `capacity` messages it starts missing them rather
    /// than stalling the publisher.
    pub fn new(capacity: usize) -> Self {
        let mut channels = std::collections::HashMap::new();
        for topic in ROUTABLE_TOPICS.iter().copied().chain(std::iter::once(Topic::All)) {
            let (tx, _rx) = broadcast::channel(capacity);
            channels.insert(topic, tx);
        }
        Self { channels }
    }

    /// Publish an event to its natural topic and to `All`. Never blocks;
    /// a topic with no subscribers simply drops the send.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if let Some(tx) = self.channels.get(&topic) {
            let _ = tx.send(event.clone());
        }
        if let Some(tx) = self.channels.get(&Topic::All) {
            let _ = tx.send(event);
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels
            .get(&topic)
            .expect("every Topic variant has a channel")
            .subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_on_matching_topic_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe(Topic::Trades);
        bus.publish(Event::EngineStarted); // goes to Strategies + All, not Trades
        assert!(rx.try_recv().is_err());

        bus.publish(Event::TradeOpened {
            trade: sample_trade(),
        });
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Event::TradeOpened { .. }));
    }

    #[tokio::test]
    async fn all_topic_receives_every_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe(Topic::All);
        bus.publish(Event::EngineStarted);
        bus.publish(Event::EvolutionStarted);
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::EngineStarted));
        assert!(matches!(second, Event::EvolutionStarted));
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_it_missed_messages_not_blocked() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe(Topic::Evolution);
        for _ in 0..5 {
            bus.publish(Event::EvolutionStarted);
        }
        let mut lagged = false;
        loop {
            match rx.try_recv() {
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {
                    lagged = true;
                    break;
                }
                Err(_) => break,
            }
        }
        assert!(lagged);
    }

    fn sample_trade() -> Trade {
        Trade::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "addr".into(),
            "SYM".into(),
            1.0,
            1.0,
            &crate::genome::Genes {
                entry_mcap_min: 1.0,
                entry_mcap_max: 2.0,
                entry_volume_min: 1.0,
                social_signals: crate::genome::SocialSignals {
                    twitter_followers_min: 0,
                    telegram_members_min: 0,
                    holders_min: 0,
                },
                buy_patterns: Default::default(),
                whale_wallets: Default::default(),
                token_name_keywords: Default::default(),
                take_profit_multiplier: 2.0,
                stop_loss_multiplier: 0.5,
                time_based_exit: 60.0,
                volume_drop_exit: 0.4,
                sell_signals: crate::genome::SellSignals::default(),
                sell_patterns: Default::default(),
                investment_percent: 0.5,
                max_simultaneous_positions: 1,
                max_drawdown: 0.3,
                diversification: 0.5,
            },
            true,
        )
    }
}
