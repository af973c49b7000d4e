use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use crate::layout::Layout;
use crate::walk::{StopReason, WalkConfig, walk};

/// Configuration for a randomized decode run.
#[derive(Clone, Debug)]
pub struct StressConfig {
    /// Number of random programs to decode.
    pub programs: usize,
    /// Maximum bytes per program. Each program gets a random length in `0..=program_size`.
    pub program_size: usize,
    /// Step bound handed to every walk.
    pub max_steps: usize,
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            programs: 1 << 12, // 4096
            program_size: 64,
            max_steps: 1 << 10, // 1024
            seed: 0,
        }
    }
}

/// Outcome counts of a stress run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StressReport {
    pub programs: usize,
    pub returned: usize,
    pub step_limited: usize,
    /// Programs whose two independent walks disagreed. Always 0 for a correct cursor.
    pub mismatches: usize,
    pub total_steps: usize,
}

impl StressReport {
    fn merge(mut self, other: Self) -> Self {
        self.programs += other.programs;
        self.returned += other.returned;
        self.step_limited += other.step_limited;
        self.mismatches += other.mismatches;
        self.total_steps += other.total_steps;
        self
    }
}

/// Generate seeded random programs of random length.
pub fn random_programs(config: &StressConfig) -> Vec<Vec<u8>> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    (0..config.programs)
        .map(|_| {
            let len = rng.gen_range(0..=config.program_size);
            let mut prog = vec![0u8; len];
            rng.fill(&mut prog[..]);
            prog
        })
        .collect()
}

/// Decode every random program twice on independent cursors and tally the results.
///
/// Phase 1 (sequential): build programs from the seeded RNG.
/// Phase 2 (parallel): walk all programs via rayon.
pub fn run(config: &StressConfig, layout: &Layout) -> StressReport {
    let programs = random_programs(config);
    let walk_config = WalkConfig {
        max_steps: config.max_steps,
    };

    let report = programs
        .par_iter()
        .map(|program| {
            let first = walk(program, layout, &walk_config);
            let second = walk(program, layout, &walk_config);
            let mismatches = usize::from(first != second);
            if mismatches > 0 {
                tracing::warn!(len = program.len(), "walks over the same program disagree");
            }
            StressReport {
                programs: 1,
                returned: usize::from(first.stop == StopReason::Return),
                step_limited: usize::from(first.stop == StopReason::StepLimit),
                mismatches,
                total_steps: first.steps,
            }
        })
        .reduce(StressReport::default, StressReport::merge);

    tracing::info!(
        programs = report.programs,
        returned = report.returned,
        step_limited = report.step_limited,
        mismatches = report.mismatches,
        "stress run finished"
    );
    report
}
