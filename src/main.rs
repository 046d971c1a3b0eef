//! CircleAce entry point
//!
//! Native: plays a scripted three-round game against the geometric judge and
//! an in-process leaderboard. Pass a directory to keep the profile and the
//! leaderboard snapshot between runs (a preview PNG is written there too).
//!
//! Web: the game is driven from JavaScript through `circle_ace::web::WebGame`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::error::Error;
    use std::f32::consts::TAU;
    use std::path::PathBuf;
    use std::rc::Rc;

    use glam::Vec2;

    use circle_ace::leaderboard::{
        InProcessLeaderboard, LeaderboardService, MemoryScoreStore, format_date, format_time,
    };
    use circle_ace::names::RandomNameGenerator;
    use circle_ace::persistence::{KeyValueStore, MemoryStore};
    use circle_ace::platform::{FileStore, SystemClock};
    use circle_ace::sim::{Advance, RoundResolution, TargetCircle};
    use circle_ace::{Collaborators, GameRunner, GeometricJudge, Settings, point_on_circle};

    /// How the scripted player draws a round
    #[derive(Debug, Clone, Copy)]
    enum Stroke {
        /// Close trace with a small wobble
        Steady,
        /// Right size, drifted off center
        Drifting,
        /// Three quarters of a turn, too small
        Rushed,
    }

    fn scripted_path(target: &TargetCircle, stroke: Stroke) -> Vec<Vec2> {
        let r = target.radius as f32;
        let (center, radius, turns, wobble) = match stroke {
            Stroke::Steady => (target.center(), r, 1.0, 0.02),
            Stroke::Drifting => (target.center() + Vec2::new(0.15 * r, -0.1 * r), r, 1.0, 0.04),
            Stroke::Rushed => (target.center(), 0.8 * r, 0.75, 0.05),
        };
        (0..=96)
            .map(|i| {
                let theta = i as f32 / 96.0 * TAU * turns;
                let jitter = 1.0 + wobble * (theta * 7.0).sin();
                point_on_circle(center, radius * jitter, theta)
            })
            .collect()
    }

    pub fn run() -> Result<(), Box<dyn Error>> {
        let data_dir = std::env::args().nth(1).map(PathBuf::from);
        let store: Box<dyn KeyValueStore> = match &data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                log::info!("Using data directory {}", dir.display());
                Box::new(FileStore::new(dir))
            }
            None => Box::new(MemoryStore::new()),
        };

        let settings = Settings::load(&*store);
        let clock = Rc::new(SystemClock::new());
        let service = LeaderboardService::new(MemoryScoreStore::new(), Rc::clone(&clock));
        let seed: u64 = rand::random();
        let collaborators = Collaborators {
            judge: Box::new(GeometricJudge::new(settings.artifact_stroke_width)),
            leaderboard: Box::new(InProcessLeaderboard::new(service)),
            names: Box::new(RandomNameGenerator::new(seed)),
            store,
            clock: Box::new(Rc::clone(&clock)),
        };
        let mut runner = GameRunner::new(settings, collaborators, seed)?;
        // High-score checks compare against the fetched board, not just the snapshot
        if let Err(e) = pollster::block_on(runner.refresh_leaderboard()) {
            log::warn!("Leaderboard refresh failed, using cached snapshot: {e}");
        }

        if runner.state().player_name().trim().is_empty() {
            pollster::block_on(runner.suggest_name());
        }
        runner.start()?;
        println!("Player: {}", runner.state().player_name());

        let script = [Stroke::Steady, Stroke::Drifting, Stroke::Rushed];
        let mut round = 0;
        while round < script.len() {
            let Some(target) = runner.state().target().copied() else {
                break;
            };
            let path = scripted_path(&target, script[round]);
            if let Some((first, rest)) = path.split_first() {
                runner.pointer_down(*first);
                for p in rest {
                    runner.pointer_move(*p);
                }
            }
            if let (Some(dir), 0) = (&data_dir, round) {
                let file = dir.join("preview.png");
                runner.preview().save(&file)?;
                log::info!("Preview written to {}", file.display());
            }

            match pollster::block_on(runner.pointer_up())? {
                Some(RoundResolution::Scored { result, score, lives }) => {
                    println!(
                        "Round {}: target ({}, {}) r={} -> accuracy {} perfection {} final {} | total {score}, lives {lives}",
                        round + 1,
                        target.x,
                        target.y,
                        target.radius,
                        result.accuracy_score,
                        result.perfection_score,
                        result.final_score,
                    );
                    println!("  {}", result.feedback);
                }
                Some(RoundResolution::Retry) => {
                    println!("Round {}: judge unavailable, drawing again", round + 1);
                    continue;
                }
                Some(RoundResolution::Stale) | None => break,
            }

            if let Advance::GameOver(pending) = pollster::block_on(runner.acknowledge())? {
                println!(
                    "Game over: {} scored {} in {}{}",
                    pending.submission.username,
                    pending.submission.score,
                    format_time(pending.submission.time),
                    if pending.new_high_score { " - new high score!" } else { "" }
                );
            }
            round += 1;
        }

        let now = runner.now_ms();
        println!("Leaderboard:");
        for (rank, entry) in runner.state().leaderboard().entries().iter().enumerate() {
            println!(
                "  {}. {:<20} {:>4}  {}  {}",
                rank + 1,
                entry.name,
                entry.score,
                format_time(entry.time),
                format_date(entry.created_at, now)
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("CircleAce (native) starting...");
    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is circle_ace::web::start, this is just to satisfy the compiler
}
