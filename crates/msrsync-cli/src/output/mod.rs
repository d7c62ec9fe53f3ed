mod error_text;
mod format;
mod json;
mod mode;
mod period_text;
mod reports_text;
mod rollup_text;
mod update_text;

use std::io;

use msrsync_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_block;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_block(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_block(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "update" => update_text::render_update(&success.data),
        "update-all" => update_text::render_update_all(&success.data),
        "rollup" => rollup_text::render_rollup(&success.data, &success.warnings),
        "reports list" => reports_text::render_report_list(&success.data),
        "reports archive" => reports_text::render_archive(&success.data),
        "period" => period_text::render_period(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
