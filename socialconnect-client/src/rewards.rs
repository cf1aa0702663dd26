use std::sync::Arc;
use std::time::Duration;

use log::info;
use parking_lot::Mutex;
use rand::{thread_rng, Rng};
use socialconnect_store::CollectionStore;
use thiserror::Error;

use crate::{Gateway, GatewayError, Session, SnapshotStorage, UpdatedUser};

/// How long the wheel animates before a spin settles
pub const SETTLE_DELAY: Duration = Duration::from_secs(4);

/// Degrees covered by one prize slot on the wheel
const SLOT_DEGREES: u64 = 360 / SLOTS.len() as u64;

/// What a spin can land on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrizeKind {
    /// A membership card, appended to the winner's profile
    Card,
    Discount,
    Extra,
    BadLuck,
}

/// A resolved spin outcome. Transient; only [PrizeKind::Card] prizes persist
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinResult {
    pub label: &'static str,
    pub kind: PrizeKind,
}

/// The eight prize slots, in wheel order starting at the pointer's rest
/// position
pub const SLOTS: [SpinResult; 8] = [
    SpinResult {
        label: "Premium Card",
        kind: PrizeKind::Card,
    },
    SpinResult {
        label: "20% OFF",
        kind: PrizeKind::Discount,
    },
    SpinResult {
        label: "1 More Try",
        kind: PrizeKind::Extra,
    },
    SpinResult {
        label: "Gold Card",
        kind: PrizeKind::Card,
    },
    SpinResult {
        label: "Bad Luck",
        kind: PrizeKind::BadLuck,
    },
    SpinResult {
        label: "10% OFF",
        kind: PrizeKind::Discount,
    },
    SpinResult {
        label: "3 More Chances",
        kind: PrizeKind::Extra,
    },
    SpinResult {
        label: "Platinum Card",
        kind: PrizeKind::Card,
    },
];

#[derive(Debug, Error)]
pub enum RewardError {
    /// A spin was requested while one is in flight
    #[error("The wheel is already spinning")]
    AlreadySpinning,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Spinning,
    Settled(SpinResult),
}

struct WheelState {
    phase: Phase,
    /// Total rotation applied across every spin so far, in degrees
    rotation: u64,
}

/// The spin-the-wheel reward engine.
///
/// Spins accumulate rotation; the slot under the fixed top pointer once the
/// wheel settles is the prize. Card prizes are written back to the winner's
/// profile through the gateway and merged into the session.
pub struct RewardEngine<S, P> {
    gateway: Arc<Gateway<S>>,
    session: Session<P>,
    state: Mutex<WheelState>,
    settle_delay: Duration,
}

impl<S, P> RewardEngine<S, P>
where
    S: CollectionStore,
    P: SnapshotStorage,
{
    pub fn new(gateway: &Arc<Gateway<S>>, session: &Session<P>) -> Self {
        Self {
            gateway: gateway.clone(),
            session: session.clone(),
            state: Mutex::new(WheelState {
                phase: Phase::Idle,
                rotation: 0,
            }),
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Spins the wheel with a random draw of five full turns plus an offset
    /// in [0, 359] degrees.
    pub async fn spin(&self) -> Result<SpinResult, RewardError> {
        let extra_degrees = thread_rng().gen_range(0u64..360) + 1800;

        self.spin_with(extra_degrees).await
    }

    /// Spins the wheel with an injected draw, for deterministic outcomes.
    ///
    /// Rejected while a spin is in flight. Settling takes the fixed delay;
    /// afterwards a card prize is appended to the current user's card list
    /// and persisted, while every other prize kind changes nothing.
    pub async fn spin_with(&self, extra_degrees: u64) -> Result<SpinResult, RewardError> {
        let rotation = {
            let mut state = self.state.lock();

            if state.phase == Phase::Spinning {
                return Err(RewardError::AlreadySpinning);
            }

            state.phase = Phase::Spinning;
            state.rotation += extra_degrees;
            state.rotation
        };

        tokio::time::sleep(self.settle_delay).await;

        let prize = SLOTS[winning_index(rotation)];
        self.state.lock().phase = Phase::Settled(prize);

        if prize.kind == PrizeKind::Card {
            self.award_card(prize.label).await?;
        }

        Ok(prize)
    }

    /// The prize resolved by the most recent settled spin
    pub fn result(&self) -> Option<SpinResult> {
        match self.state.lock().phase {
            Phase::Settled(prize) => Some(prize),
            _ => None,
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.state.lock().phase == Phase::Spinning
    }

    async fn award_card(&self, label: &str) -> Result<(), RewardError> {
        // A session that logged out mid-spin has nowhere to put the card
        let user = match self.session.current_user() {
            Some(user) => user,
            None => return Ok(()),
        };

        let mut cards = user.cards;
        cards.push(label.to_string());

        let update = UpdatedUser::with_cards(cards);
        self.gateway.update_user(&user.id, &update).await?;
        self.session.update_current_user(&update);

        info!("awarded card `{label}` to user `{}`", user.id);

        Ok(())
    }
}

#[cfg(test)]
impl<S, P> RewardEngine<S, P> {
    /// Shrinks the settle delay so tests don't wait out the animation.
    fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

/// Maps a cumulative rotation to the slot under the pointer.
///
/// The wheel turns clockwise under a fixed top pointer, so the winning slot
/// is measured backward from zero: `floor((360 - offset) / 45) mod 8`.
pub fn winning_index(rotation: u64) -> usize {
    let offset = rotation % 360;

    (((360 - offset) / SLOT_DEGREES) % SLOTS.len() as u64) as usize
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use socialconnect_store::MemoryStore;

    use crate::{MemorySnapshot, UserData};

    use super::*;

    fn engine() -> (Arc<RewardEngine<MemoryStore, MemorySnapshot>>, MemoryStore) {
        let store = MemoryStore::new();
        store.insert(
            "users",
            "u1",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "phone": "111",
                "cards": [],
            }),
        );

        let gateway = Arc::new(Gateway::new(&Arc::new(store.clone())));
        let session = Session::restore(MemorySnapshot::new());
        session.login(UserData {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "111".to_string(),
            cards: vec![],
            role: None,
        });

        let engine = RewardEngine::new(&gateway, &session)
            .with_settle_delay(Duration::from_millis(5));

        (Arc::new(engine), store)
    }

    #[test]
    fn test_winning_index_formula() {
        // Five full turns, no offset: back to slot zero
        assert_eq!(winning_index(1800), 0);

        assert_eq!(winning_index(1845), 7);
        assert_eq!(winning_index(1890), 6);
        assert_eq!(winning_index(1980), 4);
        assert_eq!(winning_index(2159), 0);

        // Offsets measure backward from zero
        assert_eq!(winning_index(90), 6);
        assert_eq!(winning_index(315), 1);
    }

    #[test]
    fn test_every_rotation_resolves_to_a_slot() {
        for rotation in 0..720 {
            assert!(winning_index(rotation) < SLOTS.len());
        }
    }

    #[tokio::test]
    async fn test_card_prize_grows_card_list_by_one() {
        let (engine, store) = engine();

        // Offset 0 lands on slot 0, Premium Card
        let prize = engine.spin_with(1800).await.unwrap();

        assert_eq!(prize.kind, PrizeKind::Card);
        assert_eq!(prize.label, "Premium Card");

        let cards = engine.session.current_user().unwrap().cards;
        assert_eq!(cards, vec!["Premium Card".to_string()]);

        let stored = store.fetch_all("users").await.unwrap().remove("u1").unwrap();
        assert_eq!(stored["cards"], json!(["Premium Card"]));
    }

    #[tokio::test]
    async fn test_non_card_prize_changes_nothing() {
        let (engine, store) = engine();

        // Offset 90 lands on slot 6, an extra-tries prize
        let prize = engine.spin_with(1890).await.unwrap();

        assert_eq!(prize.kind, PrizeKind::Extra);
        assert!(engine.session.current_user().unwrap().cards.is_empty());

        let stored = store.fetch_all("users").await.unwrap().remove("u1").unwrap();
        assert_eq!(stored["cards"], json!([]));
    }

    #[tokio::test]
    async fn test_spin_is_rejected_while_spinning() {
        let (engine, _store) = engine();

        let in_flight = tokio::spawn({
            let engine = engine.clone();
            async move { engine.spin_with(1800).await }
        });
        tokio::task::yield_now().await;

        let rejected = engine.spin_with(1800).await;
        assert!(matches!(rejected, Err(RewardError::AlreadySpinning)));

        in_flight.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rotation_accumulates_across_spins() {
        let (engine, _store) = engine();

        engine.spin_with(1800).await.unwrap();

        // Cumulative rotation 3690: offset 90, slot 6
        let prize = engine.spin_with(1890).await.unwrap();
        assert_eq!(prize.label, "3 More Chances");
    }

    #[tokio::test]
    async fn test_settled_result_is_exposed_and_respins_are_allowed() {
        let (engine, _store) = engine();

        assert!(engine.result().is_none());

        let prize = engine.spin_with(1980).await.unwrap();
        assert_eq!(engine.result(), Some(prize));
        assert!(!engine.is_spinning());

        assert!(engine.spin_with(1800).await.is_ok());
    }

    #[tokio::test]
    async fn test_spin_while_logged_out_skips_persistence() {
        let (engine, store) = engine();
        engine.session.logout();

        let prize = engine.spin_with(1800).await.unwrap();
        assert_eq!(prize.kind, PrizeKind::Card);

        let stored = store.fetch_all("users").await.unwrap().remove("u1").unwrap();
        assert_eq!(stored["cards"], json!([]));
    }
}
