//! End-to-end ordering: many workers, one consumer, results strictly in
//! generation order and the report delivered exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bulk::games::minesweeper::{MinesweeperFactory, MinesweeperGame};
use bulk::solver::{LocalSolver, Solver, SolverFactory};
use bulk::{episodes_at_least, BulkRunner, Consumer, EpisodeResult, GameSettings, MoveEvent, RunConfig};

/// Records everything it sees so the test can check ordering afterwards.
#[derive(Default)]
struct OrderCheck {
    sequences: Vec<u64>,
    /// Moves seen so far for episodes not yet drained.
    pending_moves: HashMap<u64, usize>,
    violations: Vec<String>,
    renders: Arc<AtomicUsize>,
}

impl Consumer for OrderCheck {
    fn process_episode(&mut self, result: &EpisodeResult) {
        self.sequences.push(result.sequence);
        let seen = self.pending_moves.remove(&result.sequence).unwrap_or(0);
        if seen != result.outcome.move_count {
            self.violations.push(format!(
                "episode {} drained after {} of {} moves",
                result.sequence, seen, result.outcome.move_count
            ));
        }
    }

    fn process_move(&mut self, event: &MoveEvent) {
        let seen = self.pending_moves.entry(event.sequence).or_insert(0);
        if event.applied.move_number != *seen + 1 {
            self.violations.push(format!(
                "episode {} move {} arrived after move {}",
                event.sequence, event.applied.move_number, seen
            ));
        }
        *seen += 1;
    }

    fn episodes_processed(&self) -> u64 {
        self.sequences.len() as u64
    }

    fn render_report(&self) -> String {
        self.renders.fetch_add(1, Ordering::SeqCst);
        format!("{} episodes", self.sequences.len())
    }
}

fn local_solvers() -> SolverFactory<MinesweeperGame> {
    Arc::new(|_: &MinesweeperGame| -> Box<dyn Solver<MinesweeperGame>> { Box::new(LocalSolver::new()) })
}

#[test]
fn test_thousand_episodes_drain_in_order() {
    let config = RunConfig {
        seed: 195_971_295,
        settings: GameSettings::BEGINNER,
        workers: 4,
        buffer_per_worker: 100,
        ..Default::default()
    };
    assert_eq!(config.capacity(), 400);

    let renders = Arc::new(AtomicUsize::new(0));
    let consumer = OrderCheck { renders: renders.clone(), ..Default::default() };
    let run = BulkRunner::new(config, MinesweeperFactory, local_solvers(), consumer, episodes_at_least(1000))
        .unwrap()
        .run()
        .unwrap();

    let expected: Vec<u64> = (1..=1000).collect();
    assert_eq!(run.consumer.sequences, expected);
    assert!(run.consumer.violations.is_empty(), "{:?}", run.consumer.violations);
    assert_eq!(run.report, "1000 episodes");
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(run.stats.completed, 1000);
    assert_eq!(run.stats.abandoned, 0);
    assert!(run.stats.issued >= 1000);
    assert!(run.stats.issued - run.stats.drained <= 399);
}

#[test]
fn test_single_worker_matches_many_workers() {
    let run = |workers| {
        let config = RunConfig {
            seed: 11,
            settings: GameSettings::INTERMEDIATE,
            workers,
            buffer_per_worker: 50,
            ..Default::default()
        };
        BulkRunner::new(config, MinesweeperFactory, local_solvers(), OrderCheck::default(), episodes_at_least(200))
            .unwrap()
            .run()
            .unwrap()
    };
    let single = run(1);
    let many = run(6);
    assert_eq!(single.consumer.sequences, many.consumer.sequences);
    assert_eq!(single.report, many.report);
}
