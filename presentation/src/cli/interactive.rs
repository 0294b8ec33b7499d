//! Interactive task entry

use std::io::{self, BufRead, Write};

/// Prompt on stdout and read the task from `input`.
///
/// Lines are read until an empty line or end of input; `None` if nothing
/// but whitespace was entered.
pub fn read_task(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<Option<String>> {
    writeln!(output, "Enter the task for the panel (finish with an empty line):")?;
    output.flush()?;

    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }

    let task = lines.join("\n").trim().to_string();
    Ok((!task.is_empty()).then_some(task))
}
