//! Backpressure: a stalled head episode must never let the ring overrun, and
//! the workers that run ahead are told to wait.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bulk::error::SolverFault;
use bulk::games::minesweeper::{MinesweeperFactory, MinesweeperGame};
use bulk::solver::{LocalSolver, Solver, SolverFactory};
use bulk::{
    episodes_at_least, BulkRunner, Consumer, EpisodeResult, GameSettings, Move, RunConfig, SimulationFactory,
};

/// Counts every game handed out.
struct CountingFactory {
    created: Arc<AtomicU64>,
}

impl SimulationFactory for CountingFactory {
    type Game = MinesweeperGame;

    fn create(&self, settings: &GameSettings, seed: u64) -> MinesweeperGame {
        self.created.fetch_add(1, Ordering::SeqCst);
        MinesweeperFactory.create(settings, seed)
    }
}

/// Tracks the largest gap between games created and games already drained,
/// observed from inside the critical section.
struct InFlightProbe {
    created: Arc<AtomicU64>,
    processed: u64,
    max_in_flight: u64,
    pause: Duration,
}

impl Consumer for InFlightProbe {
    fn process_episode(&mut self, _result: &EpisodeResult) {
        let in_flight = self.created.load(Ordering::SeqCst) - self.processed;
        self.max_in_flight = self.max_in_flight.max(in_flight);
        self.processed += 1;
        thread::sleep(self.pause);
    }

    fn episodes_processed(&self) -> u64 {
        self.processed
    }

    fn render_report(&self) -> String {
        format!("max in flight {}", self.max_in_flight)
    }
}

/// Sleeps on its first episode only, holding up the head of the ring.
struct SlowStart {
    first: Arc<AtomicBool>,
    inner: LocalSolver,
}

impl Solver<MinesweeperGame> for SlowStart {
    fn propose_moves(&mut self, game: &MinesweeperGame) -> Result<Vec<Move>, SolverFault> {
        if self.first.swap(false, Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(300));
        }
        self.inner.propose_moves(game)
    }
}

fn run(capacity_per_worker: usize, pause: Duration, first_slow: bool) -> (bulk::RunReport<InFlightProbe>, usize) {
    let config = RunConfig {
        seed: 3,
        settings: GameSettings::BEGINNER,
        workers: 4,
        buffer_per_worker: capacity_per_worker,
        wait_interval: Duration::from_millis(5),
        ..Default::default()
    };
    let capacity = config.capacity();
    let created = Arc::new(AtomicU64::new(0));
    let first = Arc::new(AtomicBool::new(first_slow));
    let solvers: SolverFactory<MinesweeperGame> =
        Arc::new(move |_: &MinesweeperGame| -> Box<dyn Solver<MinesweeperGame>> {
            Box::new(SlowStart { first: first.clone(), inner: LocalSolver::new() })
        });
    let probe = InFlightProbe { created: created.clone(), processed: 0, max_in_flight: 0, pause };
    let report = BulkRunner::new(config, CountingFactory { created }, solvers, probe, episodes_at_least(300))
        .unwrap()
        .run()
        .unwrap();
    (report, capacity)
}

#[test]
fn test_stalled_head_forces_wait() {
    let (run, capacity) = run(2, Duration::ZERO, true);
    assert_eq!(run.consumer.processed, 300);
    assert!(run.consumer.max_in_flight <= capacity as u64 - 1);
    let waits: u64 = run.workers.iter().map(|worker| worker.waits).sum();
    assert!(waits > 0, "no worker was ever told to wait");
}

#[test]
fn test_slow_consumer_never_overruns() {
    let (run, capacity) = run(3, Duration::from_micros(200), false);
    assert_eq!(run.consumer.processed, 300);
    assert!(run.consumer.max_in_flight <= capacity as u64 - 1);
    assert!(run.stats.issued - run.stats.drained <= capacity as u64 - 1);
}
