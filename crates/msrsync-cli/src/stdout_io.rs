use std::io::{self, Write};

/// Writes `text` to stdout, ending it with a newline. A closed pipe (for
/// example `msrsync reports list TO1 | head -1`) is not an error.
pub fn write_stdout_block(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_block(&mut stdout, text)
}

fn write_block(writer: &mut dyn Write, text: &str) -> io::Result<()> {
    let result = writer.write_all(text.as_bytes()).and_then(|()| {
        if text.ends_with('\n') {
            Ok(())
        } else {
            writer.write_all(b"\n")
        }
    });
    tolerate_broken_pipe(result.and_then(|()| writer.flush()))
}

fn tolerate_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
