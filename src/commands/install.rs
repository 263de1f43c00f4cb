//! Install command implementation
//!
//! Builds the plan, shows it, asks for confirmation and executes it.
//! Nothing is written when planning fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use inquire::Confirm;

use regkit::error::{RegkitError, Result};
use regkit::planner::Executor;
use regkit::progress::InteractiveProgress;

use super::{Context, display};
use crate::cli::InstallArgs;

/// Stop issuing writes on Ctrl-C.
///
/// Installed only once execution starts, so Ctrl-C while planning or at the
/// confirmation prompt still terminates the process.
fn cancel_token() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    cancel
}

/// Run install command
pub fn run(context: &Context, args: &InstallArgs) -> Result<()> {
    let plan = context.build_plan(&args.options)?;
    display::print_plan(&plan);
    println!();

    if !args.yes {
        let proceed = Confirm::new("Proceed with installation?")
            .with_default(true)
            .prompt()?;
        if !proceed {
            println!("Installation cancelled.");
            return Ok(());
        }
    }

    let progress = InteractiveProgress::new(
        plan.ordered_components.len() as u64,
        plan.file_operations.len() as u64,
    );
    let report = Executor::new(plan.jobs)
        .with_cancel_token(cancel_token())
        .with_progress(&progress)
        .execute(&plan);

    display::print_report(&report);

    let incomplete = report.incomplete().count();
    match report.fatal {
        Some(fatal) => Err(fatal),
        None if incomplete > 0 => Err(RegkitError::InstallIncomplete { count: incomplete }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_starts_clear() {
        // a second registration in the same process only logs a warning
        let first = cancel_token();
        let second = cancel_token();
        assert!(!first.load(Ordering::SeqCst));
        assert!(!second.load(Ordering::SeqCst));
    }
}
