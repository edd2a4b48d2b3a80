//! skp resolve - Finish an application left pending on conflicts

use clap::Args;

use crate::app::AppContext;
use crate::cli::CommandOutcome;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ResolveArgs {}

pub fn run(ctx: &AppContext, _args: &ResolveArgs) -> Result<CommandOutcome> {
    let lock = ctx.lock()?;
    let result = ctx.orchestrator()?.resolve(&lock)?;
    super::apply::report(ctx, &result)
}
