use crate::cli::{Commands, ReportsCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Update { json, .. }
        | Commands::UpdateAll { json, .. }
        | Commands::Rollup { json, .. }
        | Commands::Period { json, .. }
        | Commands::Reports {
            command: ReportsCommand::List { json, .. } | ReportsCommand::Archive { json, .. },
        } => *json,
    };
    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
