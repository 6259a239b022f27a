use std::process::Command;

pub fn get_command_str(cmd: &Command) -> String {
    let prog = cmd.get_program().to_string_lossy();
    let args = cmd.get_args().map(|x| x.to_string_lossy());
    std::iter::once(prog)
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion and return its captured stdout. A non-zero
/// exit becomes an error carrying the command line and the stderr tail.
pub fn get_command_output(mut cmd: Command) -> anyhow::Result<String> {
    let cmd_str = get_command_str(&cmd);
    log::debug!("executing command: {}", cmd_str);

    use std::os::unix::process::ExitStatusExt; // for status.signal()
    let result = cmd.output()?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return match result.status.code() {
            Some(code) => Err(anyhow::anyhow!(
                "Exited with code: {}, cmd: {}, stderr: {}",
                code,
                cmd_str,
                stderr.trim(),
            )),
            None => Err(anyhow::anyhow!(
                "Process terminated by signal: {}, cmd: {}",
                result.status.signal().unwrap_or(0),
                cmd_str,
            )),
        };
    }

    Ok(std::str::from_utf8(&result.stdout)?.to_owned())
}
