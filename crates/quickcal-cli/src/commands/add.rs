//! `quickcal add`.

use quickcal_core::DraftInputs;
use quickcal_google::{AddEventDialog, Authenticator};
use tracing::info;

use crate::cli::AddArgs;
use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Validates the arguments, authorizes if needed, and inserts the event.
pub async fn add(args: &AddArgs, config: &ClientConfig) -> CliResult<()> {
    let inputs = draft_inputs(args)?;
    let authenticator = Authenticator::new(config.google_config(None)?)?;

    let mut dialog = AddEventDialog::new(&authenticator);
    let inserted = dialog.confirm(&inputs).await?;

    info!("added event {:?}", inserted.id);
    println!("Event added!");
    if let Some(link) = inserted.html_link {
        println!("{}", link);
    }
    Ok(())
}

/// Maps command-line arguments onto dialog inputs.
pub fn draft_inputs(args: &AddArgs) -> CliResult<DraftInputs> {
    let inputs = DraftInputs::new(args.title.clone(), args.start, args.duration);
    if !args.repeat.repeats() {
        return Ok(inputs);
    }

    let until = args.until.ok_or_else(|| {
        CliError::Usage(format!("--until is required with --repeat {}", args.repeat))
    })?;
    Ok(inputs.with_repeat(args.repeat, until))
}
