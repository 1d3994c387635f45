use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use bingo::{
    DrawSource, DrawnNumbers, Participant, RandomDraws, generate_lobby_cards,
    win::{find_winner, has_won},
};

/// Seats 1..=n of lobby 1 with their default cards
fn seated_participants(n: u8) -> Vec<Participant> {
    generate_lobby_cards(1, 0)
        .iter()
        .take(usize::from(n))
        .map(|(seat, card)| Participant {
            user_id: i64::from(seat) + 100,
            seat_number: seat,
            card,
        })
        .collect()
}

/// Numbers 1..=count in call order
fn drawn_up_to(count: u8) -> DrawnNumbers {
    let mut drawn = DrawnNumbers::new();
    for n in 1..=count {
        drawn.push(n);
    }
    drawn
}

/// Benchmark generating one lobby layout
fn bench_generate_lobby_cards(c: &mut Criterion) {
    c.bench_function("generate_lobby_cards", |b| {
        let mut lobby_id = 0i64;
        b.iter(|| {
            lobby_id += 1;
            generate_lobby_cards(lobby_id, 0)
        });
    });
}

/// Benchmark a single-card win check against a half-called deck
fn bench_has_won(c: &mut Criterion) {
    let card = [3, 18, 33, 48, 63];
    let drawn = drawn_up_to(40);

    c.bench_function("has_won", |b| {
        b.iter(|| has_won(&card, &drawn));
    });
}

/// Benchmark the per-call winner scan with different table sizes
fn bench_find_winner(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_winner");
    let drawn = drawn_up_to(60);

    for seats in [1u8, 5, 10, 15].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_seats", seats)),
            seats,
            |b, &n| {
                let participants = seated_participants(n);
                b.iter(|| find_winner(&participants, &drawn).is_some());
            },
        );
    }

    group.finish();
}

/// Benchmark calling all 75 numbers
fn bench_draw_full_deck(c: &mut Criterion) {
    c.bench_function("draw_full_deck", |b| {
        b.iter_batched(
            || (RandomDraws::seeded(7), DrawnNumbers::new()),
            |(mut source, mut drawn)| {
                while let Some(n) = source.next_number(&drawn) {
                    drawn.push(n);
                }
                drawn
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(cards, bench_generate_lobby_cards);

criterion_group!(
    game_operations,
    bench_has_won,
    bench_find_winner,
    bench_draw_full_deck
);

criterion_main!(cards, game_operations);
