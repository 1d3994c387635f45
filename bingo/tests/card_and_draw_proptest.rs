//! Property-based tests for card layouts, number draws, win detection and
//! claim verification.

use bingo::{
    DrawnNumbers, GameError, RandomDraws,
    cards::{Card, generate_lobby_cards},
    draw::DrawSource,
    win::{has_won, verify_claim},
};
use proptest::prelude::*;
use std::collections::HashSet;

// A sequence of distinct numbers in call order
fn call_order_strategy() -> impl Strategy<Value = Vec<u8>> {
    Just((1u8..=75).collect::<Vec<u8>>()).prop_shuffle()
}

// One number from each column range
fn card_strategy() -> impl Strategy<Value = Card> {
    (1u8..=15, 16u8..=30, 31u8..=45, 46u8..=60, 61u8..=75).prop_map(|(b, i, n, g, o)| [b, i, n, g, o])
}

fn drawn_from(numbers: &[u8]) -> DrawnNumbers {
    let mut drawn = DrawnNumbers::new();
    for &n in numbers {
        drawn.push(n);
    }
    drawn
}

proptest! {
    #[test]
    fn test_random_draws_never_repeat(seed in any::<u64>()) {
        let mut source = RandomDraws::seeded(seed);
        let mut drawn = DrawnNumbers::new();

        while let Some(n) = source.next_number(&drawn) {
            prop_assert!((1..=75).contains(&n));
            prop_assert!(drawn.push(n), "number {} called twice", n);
        }

        prop_assert_eq!(drawn.len(), 75);
        let unique: HashSet<u8> = drawn.as_slice().iter().copied().collect();
        prop_assert_eq!(unique.len(), 75);
    }

    #[test]
    fn test_layout_is_deterministic_per_lobby_and_round(lobby_id in 1i64..1_000_000, round in 0u32..8) {
        let first = generate_lobby_cards(lobby_id, round);
        let second = generate_lobby_cards(lobby_id, round);
        prop_assert_eq!(&first, &second);

        let mut seen = HashSet::new();
        for (seat, card) in first.iter() {
            prop_assert!((1..=15).contains(&seat));
            for (col, &n) in card.iter().enumerate() {
                let low = col as u8 * 15 + 1;
                prop_assert!((low..low + 15).contains(&n), "seat {} column {} has {}", seat, col, n);
                prop_assert!(seen.insert(n), "{} appears on two cards", n);
            }
        }
        prop_assert_eq!(seen.len(), 75);
    }

    #[test]
    fn test_win_is_monotonic(card in card_strategy(), order in call_order_strategy()) {
        let mut drawn = DrawnNumbers::new();
        let mut won_at = None;

        for (idx, &n) in order.iter().enumerate() {
            drawn.push(n);
            let won = has_won(&card, &drawn);
            match won_at {
                Some(_) => prop_assert!(won, "win lost after call {}", idx + 1),
                None if won => won_at = Some(idx),
                None => {}
            }
        }

        // Wins exactly on the call of the card's last number
        let last = card
            .iter()
            .map(|n| order.iter().position(|o| o == n).unwrap())
            .max()
            .unwrap();
        prop_assert_eq!(won_at, Some(last));
    }

    #[test]
    fn test_claim_with_wrong_numbers_is_rejected(
        card in card_strategy(),
        claimed in prop::collection::vec(-5i64..90, 0..7),
    ) {
        let everything = drawn_from(&(1..=75).collect::<Vec<u8>>());
        let mut sorted_claim = claimed.clone();
        sorted_claim.sort_unstable();
        let mut sorted_card: Vec<i64> = card.iter().map(|&n| i64::from(n)).collect();
        sorted_card.sort_unstable();
        prop_assume!(sorted_claim != sorted_card);

        prop_assert!(matches!(
            verify_claim(&card, &claimed, &everything),
            Err(GameError::CardMismatch)
        ));
    }

    #[test]
    fn test_claim_before_last_number_is_rejected(card in card_strategy(), missing in 0usize..5) {
        let called: Vec<u8> = card
            .iter()
            .enumerate()
            .filter(|&(idx, _)| idx != missing)
            .map(|(_, &n)| n)
            .collect();
        let claimed: Vec<i64> = card.iter().rev().map(|&n| i64::from(n)).collect();

        prop_assert!(matches!(
            verify_claim(&card, &claimed, &drawn_from(&called)),
            Err(GameError::InvalidClaim)
        ));

        let mut all = called.clone();
        all.push(card[missing]);
        prop_assert!(verify_claim(&card, &claimed, &drawn_from(&all)).is_ok());
    }
}
