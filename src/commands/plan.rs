//! Plan command: dry run

use regkit::error::Result;

use super::{Context, display};
use crate::cli::PlanArgs;

/// Run plan command
pub fn run(context: &Context, args: &PlanArgs) -> Result<()> {
    let plan = context.build_plan(&args.options)?;
    if args.json {
        display::print_plan_json(&plan)
    } else {
        display::print_plan(&plan);
        Ok(())
    }
}
