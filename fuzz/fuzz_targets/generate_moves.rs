#![no_main]
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use ultimate::environment::Player;
use ultimate::game::Position;

// Every byte picks one of the legal moves, so arbitrary input describes a legal
// game prefix.
fuzz_target!(|data: &[u8]| {
    let mut position = Position::starting();
    for &byte in data {
        let moves = position.actions();
        if moves.is_empty() {
            assert!(position.outcome().is_some());
            return;
        }
        if let Some(forced) = position.forced_board() {
            assert!(moves.iter().all(|m| m.board() == forced));
        }
        for candidate in &moves {
            assert!(!position.is_decided(candidate.board()));
            assert!(!position.occupancy(candidate.board()).is_set(candidate.cell()));
        }
        let next_move = moves[usize::from(byte) % moves.len()];
        position
            .play(next_move)
            .expect("generated moves should be legal");
        assert_eq!(
            position.claimed(Player::One) & position.claimed(Player::Two),
            ultimate::game::Bitboard::empty()
        );
    }
});
