//! Win detection and claim verification.

use crate::cards::Card;
use crate::draw::DrawnNumbers;
use crate::engine::{GameError, GameResult};
use crate::session::Participant;

/// A card wins once every one of its numbers has been called.
pub fn has_won(card: &Card, drawn: &DrawnNumbers) -> bool {
    card.iter().all(|&n| drawn.contains(n))
}

/// First participant, in the given order, whose card has won.
///
/// Seats completing on the same call do not split the prize; only the first
/// one iterated wins. Each seat is judged on its own card even when one user
/// holds several seats.
pub fn find_winner<'a>(
    participants: &'a [Participant],
    drawn: &DrawnNumbers,
) -> Option<&'a Participant> {
    participants.iter().find(|p| has_won(&p.card, drawn))
}

/// Every participant whose card has won
pub fn all_winners<'a>(participants: &'a [Participant], drawn: &DrawnNumbers) -> Vec<&'a Participant> {
    participants
        .iter()
        .filter(|p| has_won(&p.card, drawn))
        .collect()
}

/// Claimed numbers are exactly the card: same values, same count.
pub fn claim_matches_card(card: &Card, claimed: &[i64]) -> bool {
    if claimed.len() != card.len() {
        return false;
    }
    let mut expected: Vec<i64> = card.iter().map(|&n| i64::from(n)).collect();
    let mut got = claimed.to_vec();
    expected.sort_unstable();
    got.sort_unstable();
    expected == got
}

/// Re-verify a client-asserted win against the canonical card.
///
/// Checks, in order, that the claimed numbers equal the card and that every
/// one of them has been called.
pub fn verify_claim(card: &Card, claimed: &[i64], drawn: &DrawnNumbers) -> GameResult<()> {
    if !claim_matches_card(card, claimed) {
        return Err(GameError::CardMismatch);
    }
    if !claimed.iter().all(|&n| drawn.contains_value(n)) {
        return Err(GameError::InvalidClaim);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn_from(numbers: &[u8]) -> DrawnNumbers {
        let mut drawn = DrawnNumbers::new();
        for &n in numbers {
            drawn.push(n);
        }
        drawn
    }

    fn participant(user_id: i64, seat_number: u8, card: Card) -> Participant {
        Participant {
            user_id,
            seat_number,
            card,
        }
    }

    #[test]
    fn test_has_won_requires_every_number() {
        let card = [2, 17, 33, 50, 66];
        assert!(!has_won(&card, &drawn_from(&[2, 17, 33, 50])));
        assert!(has_won(&card, &drawn_from(&[66, 9, 2, 50, 33, 17])));
    }

    #[test]
    fn test_first_participant_wins_ties() {
        let participants = vec![
            participant(10, 1, [1, 16, 31, 46, 61]),
            participant(20, 2, [2, 17, 32, 47, 62]),
        ];
        let drawn = drawn_from(&[1, 16, 31, 46, 61, 2, 17, 32, 47, 62]);

        let winner = find_winner(&participants, &drawn).expect("someone won");
        assert_eq!(winner.user_id, 10);
        assert_eq!(all_winners(&participants, &drawn).len(), 2);
    }

    #[test]
    fn test_multi_seat_user_judged_per_card() {
        let participants = vec![
            participant(10, 1, [1, 16, 31, 46, 61]),
            participant(10, 2, [2, 17, 32, 47, 62]),
        ];
        // Union of both cards' first halves does not win either card
        let drawn = drawn_from(&[1, 16, 31, 2, 17, 32]);
        assert!(find_winner(&participants, &drawn).is_none());
    }

    #[test]
    fn test_claim_must_equal_card() {
        let card = [2, 17, 33, 50, 66];
        assert!(claim_matches_card(&card, &[66, 50, 33, 17, 2]));
        assert!(!claim_matches_card(&card, &[2, 17, 33, 50]));
        assert!(!claim_matches_card(&card, &[2, 17, 33, 50, 66, 70]));
        assert!(!claim_matches_card(&card, &[2, 2, 33, 50, 66]));
        assert!(!claim_matches_card(&card, &[2, 17, 33, 50, 67]));
    }

    #[test]
    fn test_verify_claim_errors() {
        let card = [2, 17, 33, 50, 66];
        let partial = drawn_from(&[2, 17, 33, 50]);
        let full = drawn_from(&[2, 17, 33, 50, 66]);

        assert!(matches!(
            verify_claim(&card, &[1, 17, 33, 50, 66], &full),
            Err(GameError::CardMismatch)
        ));
        assert!(matches!(
            verify_claim(&card, &[2, 17, 33, 50, 66], &partial),
            Err(GameError::InvalidClaim)
        ));
        assert!(verify_claim(&card, &[2, 17, 33, 50, 66], &full).is_ok());
    }
}
