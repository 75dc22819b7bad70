//! Reference solver using single-cell constraints.
//!
//! Certain moves come from the two classic counting rules applied to each
//! revealed number. When nothing is certain it guesses the hidden cell whose
//! worst adjacent constraint is the least dangerous, falling back to the global
//! mine density for cells with no revealed neighbour. It is deliberately simple;
//! stronger solvers plug in through [`crate::solver::Solver`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::SolverFault;
use crate::simulation::{Action, Location, Move, Probability, Simulation, FLAGGED, HIDDEN};
use crate::solver::Solver;

#[derive(Debug, Clone, Default)]
pub struct LocalSolver {
    /// First click on an untouched board.
    opening: Option<Location>,
}

impl LocalSolver {
    pub fn new() -> Self {
        LocalSolver { opening: None }
    }

    /// Uses `location` for the first click instead of the top-left corner.
    pub fn with_opening(location: Location) -> Self {
        LocalSolver { opening: Some(location) }
    }
}

/// Snapshot of what the player can see.
struct View {
    width: usize,
    height: usize,
    cells: Vec<i8>,
}

impl View {
    fn capture<G: Simulation>(game: &G) -> Self {
        let (width, height) = (game.width(), game.height());
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(game.query(Location::new(x, y)));
            }
        }
        View { width, height, cells }
    }

    fn get(&self, x: usize, y: usize) -> i8 {
        self.cells[y * self.width + x]
    }

    fn neighbours(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let xs = x.saturating_sub(1)..=(x + 1).min(self.width - 1);
        xs.flat_map(move |nx| {
            let ys = y.saturating_sub(1)..=(y + 1).min(self.height - 1);
            ys.map(move |ny| (nx, ny))
        })
        .filter(move |&(nx, ny)| (nx, ny) != (x, y))
    }

    fn count(&self, value: i8) -> usize {
        self.cells.iter().filter(|&&v| v == value).count()
    }
}

/// `a` is strictly safer than `b`.
fn safer(a: Probability, b: Probability) -> bool {
    let lhs = a.numerator() as u128 * b.denominator() as u128;
    let rhs = b.numerator() as u128 * a.denominator() as u128;
    lhs.cmp(&rhs) == Ordering::Greater
}

impl<G: Simulation> Solver<G> for LocalSolver {
    fn propose_moves(&mut self, game: &G) -> Result<Vec<Move>, SolverFault> {
        let view = View::capture(game);
        let hidden_total = view.count(HIDDEN);
        if hidden_total == 0 {
            return Err(SolverFault::Inconsistent(format!(
                "no hidden cells left on {}",
                game.debug_key()
            )));
        }

        let flagged_total = view.count(FLAGGED);
        let untouched = view.cells.iter().all(|&v| v == HIDDEN || v == FLAGGED);
        let density_safe = Probability::new(
            (hidden_total - game.mines().saturating_sub(flagged_total).min(hidden_total)) as u64,
            hidden_total as u64,
        );

        if untouched {
            let opening = self.opening.unwrap_or(Location::new(0, 0));
            return Ok(vec![Move::new(Action::clear(opening.x, opening.y), density_safe)]);
        }

        let mut clears = BTreeSet::new();
        let mut flags = BTreeSet::new();
        // Per hidden cell: the least safe estimate over all adjacent constraints.
        let mut estimates: Vec<Option<Probability>> = vec![None; view.cells.len()];

        for y in 0..view.height {
            for x in 0..view.width {
                let value = view.get(x, y);
                if !(1..=8).contains(&value) {
                    continue;
                }
                let mut flagged = 0usize;
                let mut hidden = Vec::new();
                for (nx, ny) in view.neighbours(x, y) {
                    match view.get(nx, ny) {
                        FLAGGED => flagged += 1,
                        HIDDEN => hidden.push((ny, nx)),
                        _ => {}
                    }
                }
                if hidden.is_empty() {
                    continue;
                }
                let remaining = (value as usize).saturating_sub(flagged);
                if remaining == 0 {
                    clears.extend(hidden.iter().copied());
                } else if remaining >= hidden.len() {
                    flags.extend(hidden.iter().copied());
                } else {
                    let safe = Probability::new((hidden.len() - remaining) as u64, hidden.len() as u64);
                    for &(ny, nx) in &hidden {
                        let slot = &mut estimates[ny * view.width + nx];
                        if slot.map_or(true, |current| safer(current, safe)) {
                            *slot = Some(safe);
                        }
                    }
                }
            }
        }

        if !clears.is_empty() || !flags.is_empty() {
            let moves = clears
                .into_iter()
                .map(|(y, x)| Move::certain(Action::clear(x, y)))
                .chain(flags.into_iter().map(|(y, x)| Move::certain(Action::flag(x, y))))
                .collect();
            return Ok(moves);
        }

        let mut best: Option<(Location, Probability)> = None;
        for y in 0..view.height {
            for x in 0..view.width {
                if view.get(x, y) != HIDDEN {
                    continue;
                }
                let safe = estimates[y * view.width + x].unwrap_or(density_safe);
                if best.map_or(true, |(_, current)| safer(safe, current)) {
                    best = Some((Location::new(x, y), safe));
                }
            }
        }

        match best {
            Some((location, safe)) => Ok(vec![Move::new(Action::clear(location.x, location.y), safe)]),
            None => Err(SolverFault::Inconsistent(format!(
                "no guess available on {}",
                game.debug_key()
            ))),
        }
    }
}
