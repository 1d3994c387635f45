//! Deterministic card layouts per lobby.
//!
//! Every seat of a lobby gets one B-I-N-G-O row. The rows are a pure function
//! of the lobby ID and the lobby's round counter, so every client previewing a
//! lobby before the game starts sees the same fifteen rows, and the rows bound
//! to seats at start are the ones they previewed.

use crate::session::{LobbyId, SEATS_PER_GAME};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// One bingo row: one number per B, I, N, G, O column
pub type Card = [u8; 5];

/// Odd multiplier spreading lobby IDs across the 32-bit seed space
pub const SEED_MULTIPLIER: u32 = 2_654_435_761;

/// Mixed in per round so consecutive rounds of a lobby get distinct layouts
const ROUND_MULTIPLIER: u32 = 0x85EB_CA6B;

const LCG_A: u32 = 1_664_525;
const LCG_C: u32 = 1_013_904_223;

/// Linear congruential generator (Numerical Recipes constants)
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1]`
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(LCG_A).wrapping_add(LCG_C);
        f64::from(self.state) / f64::from(u32::MAX)
    }
}

/// Seed for a lobby's layout in a given round. Round 0 is the plain lobby mix.
///
/// The high half of the ID is folded into the low half, so IDs differing only
/// above bit 31 still get distinct seeds.
pub fn lobby_seed(lobby_id: LobbyId, round: u32) -> u32 {
    let folded = (lobby_id ^ (lobby_id >> 32)) as u32;
    folded.wrapping_mul(SEED_MULTIPLIER) ^ round.wrapping_mul(ROUND_MULTIPLIER)
}

/// Fisher-Yates shuffle driven by the seeded generator
fn seeded_shuffle<T>(items: &mut [T], rng: &mut SeededRng) {
    for i in (1..items.len()).rev() {
        let j = ((rng.next_f64() * (i + 1) as f64).floor() as usize).min(i);
        items.swap(i, j);
    }
}

/// The fifteen rows of a lobby, indexed by seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyCards {
    rows: [Card; SEATS_PER_GAME as usize],
}

impl LobbyCards {
    /// Layout from explicit rows, seat 1 first
    pub fn from_rows(rows: [Card; SEATS_PER_GAME as usize]) -> Self {
        Self { rows }
    }

    /// Card for a seat in `1..=15`
    pub fn card_for_seat(&self, seat: u8) -> Option<Card> {
        seat.checked_sub(1)
            .and_then(|idx| self.rows.get(idx as usize))
            .copied()
    }

    /// Iterate `(seat, card)` in seat order
    pub fn iter(&self) -> impl Iterator<Item = (u8, Card)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, card)| (idx as u8 + 1, *card))
    }

    pub fn to_map(&self) -> BTreeMap<u8, Card> {
        self.iter().collect()
    }
}

/// Build the layout for `lobby_id` in `round`.
///
/// Each column range (1-15, 16-30, 31-45, 46-60, 61-75) is shuffled
/// independently with the same generator, then rows are zipped across columns.
pub fn generate_lobby_cards(lobby_id: LobbyId, round: u32) -> LobbyCards {
    let mut rng = SeededRng::new(lobby_seed(lobby_id, round));
    let per_column = SEATS_PER_GAME;

    let columns: Vec<Vec<u8>> = (0..5u8)
        .map(|col| {
            let start = col * per_column + 1;
            let mut column: Vec<u8> = (start..start + per_column).collect();
            seeded_shuffle(&mut column, &mut rng);
            column
        })
        .collect();

    let mut rows = [[0u8; 5]; SEATS_PER_GAME as usize];
    for (row_idx, row) in rows.iter_mut().enumerate() {
        for (col_idx, column) in columns.iter().enumerate() {
            row[col_idx] = column[row_idx];
        }
    }

    LobbyCards { rows }
}

#[derive(Debug, Default)]
struct CacheEntry {
    round: u32,
    cards: Option<Arc<LobbyCards>>,
}

/// Per-lobby cache of the pre-game layout.
///
/// Invalidation advances the lobby's round, so the next game of the lobby
/// receives a fresh shuffle.
#[derive(Debug, Default)]
pub struct CardCache {
    entries: Mutex<HashMap<LobbyId, CacheEntry>>,
}

impl CardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached layout for the lobby's current round, generating it on first use
    pub fn get_or_generate(&self, lobby_id: LobbyId) -> Arc<LobbyCards> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(lobby_id).or_default();
        let round = entry.round;
        entry
            .cards
            .get_or_insert_with(|| Arc::new(generate_lobby_cards(lobby_id, round)))
            .clone()
    }

    /// Pin the layout for the lobby's current round
    pub fn insert(&self, lobby_id: LobbyId, cards: LobbyCards) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(lobby_id).or_default().cards = Some(Arc::new(cards));
    }

    /// Drop the cached layout and move the lobby to its next round
    pub fn invalidate(&self, lobby_id: LobbyId) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(lobby_id).or_default();
        entry.round = entry.round.wrapping_add(1);
        entry.cards = None;
        log::debug!(
            "Lobby {} card cache invalidated, next round {}",
            lobby_id,
            entry.round
        );
    }

    /// Current round of a lobby (0 until its first game ends)
    pub fn round(&self, lobby_id: LobbyId) -> u32 {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&lobby_id).map(|e| e.round).unwrap_or(0)
    }
}
