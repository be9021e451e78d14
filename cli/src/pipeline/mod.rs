pub mod step;

pub use step::*;

use crate::{
    models::StepTransitionLog,
    utils::{log_step_transition, Logger, Timer},
};
use anyhow::Context;

const START: &str = "START";
const DONE: &str = "DONE";
const MAX_HISTORY: usize = 100;

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed { steps_run: usize },
    Halted { step: &'static str, reason: String },
}

/// Sequential step runner over a shared context
pub struct Pipeline<C: Send> {
    name: &'static str,
    steps: Vec<Box<dyn Step<C>>>,
    transition_history: Vec<StepTransitionLog>,
    run_count: u64,
    logger: Logger,
}

impl<C: Send> Pipeline<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            transition_history: Vec::new(),
            run_count: 0,
            logger: Logger::new(name),
        }
    }

    pub fn with_step(mut self, step: impl Step<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. The first error aborts the run.
    pub async fn run(&mut self, context: &mut C) -> anyhow::Result<PipelineOutcome> {
        self.run_count += 1;
        let timer = Timer::start(self.name);
        self.logger.info(&format!(
            "Run #{} started with {} steps",
            self.run_count,
            self.steps.len()
        ));

        let mut previous: &'static str = START;
        let mut steps_run = 0;

        for idx in 0..self.steps.len() {
            let name = self.steps[idx].name();
            let reason = if previous == START {
                "run started".to_string()
            } else {
                format!("{} completed", previous)
            };
            self.record_transition(previous, name, reason);

            let step_timer = Timer::start(name);
            let step = &mut self.steps[idx];
            step.enter(context)
                .await
                .with_context(|| format!("{} failed to start", name))?;
            let flow = step
                .run(context)
                .await
                .with_context(|| format!("{} failed", name))?;
            steps_run += 1;
            self.logger.debug(&format!("{} took {:.1}ms", name, step_timer.elapsed_ms()));

            if let StepFlow::Halt(reason) = flow {
                self.record_transition(name, DONE, format!("halted: {}", reason));
                self.logger.info(&format!(
                    "Run #{} halted at {} after {:.1}ms: {}",
                    self.run_count,
                    name,
                    timer.elapsed_ms(),
                    reason
                ));
                return Ok(PipelineOutcome::Halted { step: name, reason });
            }
            previous = name;
        }

        self.record_transition(previous, DONE, "all steps completed".to_string());
        timer.log_elapsed(self.logger.context());
        Ok(PipelineOutcome::Completed { steps_run })
    }

    fn record_transition(&mut self, from: &str, to: &str, reason: String) {
        log_step_transition(from, to, &reason);
        self.transition_history
            .push(StepTransitionLog::new(from.to_string(), to.to_string(), reason));
        if self.transition_history.len() > MAX_HISTORY {
            self.transition_history.remove(0);
        }
    }

    pub fn transition_history(&self) -> &[StepTransitionLog] {
        &self.transition_history
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            name: self.name,
            step_count: self.steps.len(),
            run_count: self.run_count,
            transition_count: self.transition_history.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub name: &'static str,
    pub step_count: usize,
    pub run_count: u64,
    pub transition_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        visited: Vec<&'static str>,
    }

    struct Record(&'static str);

    #[async_trait::async_trait]
    impl Step<Counter> for Record {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&mut self, context: &mut Counter) -> anyhow::Result<StepFlow> {
            context.visited.push(self.0);
            Ok(StepFlow::Continue)
        }
    }

    struct Stop;

    #[async_trait::async_trait]
    impl Step<Counter> for Stop {
        fn name(&self) -> &'static str {
            "STOP"
        }

        async fn run(&mut self, _context: &mut Counter) -> anyhow::Result<StepFlow> {
            Ok(StepFlow::Halt("nothing new".to_string()))
        }
    }

    struct Fail;

    #[async_trait::async_trait]
    impl Step<Counter> for Fail {
        fn name(&self) -> &'static str {
            "FAIL"
        }

        async fn run(&mut self, _context: &mut Counter) -> anyhow::Result<StepFlow> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn test_runs_steps_in_order() {
        let mut pipeline = Pipeline::new("TEST")
            .with_step(Record("A"))
            .with_step(Record("B"))
            .with_step(Record("C"));
        let mut context = Counter::default();

        let outcome = pipeline.run(&mut context).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Completed { steps_run: 3 });
        assert_eq!(context.visited, vec!["A", "B", "C"]);

        let history = pipeline.transition_history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].from, "START");
        assert_eq!(history[3].to, "DONE");
        assert_eq!(pipeline.stats().run_count, 1);
    }

    #[tokio::test]
    async fn test_halt_skips_remaining_steps() {
        let mut pipeline = Pipeline::new("TEST")
            .with_step(Record("A"))
            .with_step(Stop)
            .with_step(Record("B"));
        let mut context = Counter::default();

        let outcome = pipeline.run(&mut context).await.unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::Halted {
                step: "STOP",
                reason: "nothing new".to_string()
            }
        );
        assert_eq!(context.visited, vec!["A"]);
    }

    #[tokio::test]
    async fn test_error_carries_step_name() {
        let mut pipeline = Pipeline::new("TEST").with_step(Fail).with_step(Record("A"));
        let mut context = Counter::default();

        let err = pipeline.run(&mut context).await.unwrap_err();
        assert_eq!(err.to_string(), "FAIL failed");
        assert_eq!(err.root_cause().to_string(), "boom");
        assert!(context.visited.is_empty());
    }
}
