//! Ordered fallback chains
//!
//! A chain is a list of tiers tried in order. The first tier whose spawn
//! succeeds wins; failures are logged and collected. Only spawn-time failure
//! moves the chain forward: a process that starts and dies later is not
//! retried here.

use super::spawner::{CommandSpec, ProcessSpawner};
use super::types::FallbackAttempt;
use tokio::process::Child;

/// One strategy in a chain
#[derive(Debug, Clone)]
pub struct Tier {
    pub strategy: String,
    pub command: CommandSpec,
    /// Output file this tier writes, if any
    pub output: Option<std::path::PathBuf>,
}

impl Tier {
    pub fn new(strategy: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            strategy: strategy.into(),
            command,
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<std::path::PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// The tier that spawned
#[derive(Debug)]
pub struct ChainSuccess {
    /// 1-based
    pub tier: usize,
    pub pid: u32,
    pub child: Child,
    pub strategy: String,
    pub command: CommandSpec,
    pub output: Option<std::path::PathBuf>,
    /// Tiers that failed before this one
    pub failed: Vec<FallbackAttempt>,
}

/// Try each tier in order until one spawns.
///
/// Returns every failed attempt when the chain is exhausted.
pub fn run_fallback_chain(
    spawner: &dyn ProcessSpawner,
    chain: &str,
    tiers: Vec<Tier>,
) -> std::result::Result<ChainSuccess, Vec<FallbackAttempt>> {
    let mut failed = Vec::new();

    for (index, tier) in tiers.into_iter().enumerate() {
        let number = index + 1;
        let program = tier.command.program_name();

        let error = match spawner.spawn(&tier.command) {
            Ok(child) => match child.id() {
                Some(pid) => {
                    tracing::info!(
                        chain,
                        tier = number,
                        strategy = %tier.strategy,
                        program = %program,
                        pid,
                        "Fallback tier spawned"
                    );
                    return Ok(ChainSuccess {
                        tier: number,
                        pid,
                        child,
                        strategy: tier.strategy,
                        command: tier.command,
                        output: tier.output,
                        failed,
                    });
                }
                None => "process exited before it could be tracked".to_string(),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(
            chain,
            tier = number,
            strategy = %tier.strategy,
            program = %program,
            error = %error,
            "Fallback tier failed"
        );
        failed.push(FallbackAttempt {
            tier: number,
            strategy: tier.strategy,
            program,
            error: Some(error),
        });
    }

    tracing::error!(chain, attempts = failed.len(), "Fallback chain exhausted");
    Err(failed)
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Spawns `sleep 30` in place of the requested program unless the
    /// program name is listed in `failing`
    #[derive(Default)]
    pub(crate) struct ScriptedSpawner {
        pub failing: Vec<String>,
        pub fail_first: usize,
        pub spawned: Mutex<Vec<CommandSpec>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSpawner {
        pub(crate) fn failing_programs(programs: &[&str]) -> Self {
            Self {
                failing: programs.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn failing_first(n: usize) -> Self {
            Self {
                fail_first: n,
                ..Default::default()
            }
        }

        pub(crate) fn spawned(&self) -> Vec<CommandSpec> {
            self.spawned.lock().unwrap().clone()
        }
    }

    impl ProcessSpawner for ScriptedSpawner {
        fn spawn(&self, spec: &CommandSpec) -> io::Result<Child> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call <= self.fail_first || self.failing.contains(&spec.program_name()) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "simulated failure"));
            }
            self.spawned.lock().unwrap().push(spec.clone());
            tokio::process::Command::new("sleep")
                .arg("30")
                .kill_on_drop(true)
                .spawn()
        }
    }

    fn tiers(names: &[&str]) -> Vec<Tier> {
        names
            .iter()
            .map(|n| Tier::new(*n, CommandSpec::new(*n)))
            .collect()
    }

    #[tokio::test]
    async fn test_first_tier_wins() {
        let spawner = ScriptedSpawner::default();
        let ok = run_fallback_chain(&spawner, "test", tiers(&["a", "b"])).unwrap();
        assert_eq!(ok.tier, 1);
        assert_eq!(ok.strategy, "a");
        assert!(ok.failed.is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_to_third() {
        let spawner = ScriptedSpawner::failing_programs(&["a", "b"]);
        let ok = run_fallback_chain(&spawner, "test", tiers(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(ok.tier, 3);
        assert_eq!(ok.strategy, "c");
        assert_eq!(ok.failed.len(), 2);
        assert_eq!(ok.failed[0].tier, 1);
        assert_eq!(ok.failed[1].tier, 2);
        assert_eq!(spawner.spawned().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_lists_every_tier() {
        let spawner = ScriptedSpawner::failing_first(10);
        let failed = run_fallback_chain(&spawner, "test", tiers(&["a", "b", "c"])).unwrap_err();
        assert_eq!(
            failed.iter().map(|a| a.tier).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(failed.iter().all(|a| a.error.is_some()));
    }
}
