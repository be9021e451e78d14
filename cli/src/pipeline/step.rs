/// What the runner does after a step finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFlow {
    /// Move on to the next step
    Continue,
    /// Skip the remaining steps of this run; not an error
    Halt(String),
}

/// One unit of work in a pipeline, run against a shared typed context
#[async_trait::async_trait]
pub trait Step<C: Send>: Send + Sync {
    /// Name used in transition logs, e.g. `SETUP_DATABASE`
    fn name(&self) -> &'static str;

    /// Called before `run`; default does nothing
    async fn enter(&mut self, _context: &mut C) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run(&mut self, context: &mut C) -> anyhow::Result<StepFlow>;
}
