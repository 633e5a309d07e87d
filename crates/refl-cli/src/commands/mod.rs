pub mod assemble;
pub mod instruments;
pub mod schema;

use crate::cli::{Commands, GlobalFlags};

/// Dispatch a parsed command to the corresponding handler module.
pub fn dispatch(command: &Commands, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Assemble(args) => assemble::handle(args, flags),
        Commands::Instruments => instruments::handle(flags),
        Commands::Schema(args) => schema::handle(args, flags),
    }
}
