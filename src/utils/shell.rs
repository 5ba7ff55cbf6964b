//! Shell escaping and quoting utilities.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Wrap a complete command for `bash -c`, so the remote side of a copy
/// does not see an unexpanded glob.
pub fn wrap_for_bash(command: &str) -> String {
    format!("bash -c '{}'", escape_single_quote_content(command))
}

/// Join a directory and a file name with exactly one `/`.
pub fn join_path(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        return file.to_string();
    }
    let dir = dir.trim_end_matches('/');
    let file = file.trim_start_matches('/');
    format!("{}/{}", dir, file)
}

/// Characters that are not allowed in operator input sent to a session.
pub fn has_control_bytes(line: &str) -> bool {
    line.chars().any(|c| c.is_control() && c != '\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_for_bash_escapes_quotes() {
        assert_eq!(wrap_for_bash("ls *.log"), "bash -c 'ls *.log'");
        assert_eq!(wrap_for_bash("echo 'x'"), "bash -c 'echo '\\''x'\\'''");
    }

    #[test]
    fn join_path_normalizes_slashes() {
        assert_eq!(join_path("/var/log/", "/a.log"), "/var/log/a.log");
        assert_eq!(join_path("/var/log", "a.log"), "/var/log/a.log");
        assert_eq!(join_path("", "a.log"), "a.log");
    }

    #[test]
    fn escape_sequences_are_control_bytes() {
        assert!(has_control_bytes("\u{1b}[A"));
        assert!(has_control_bytes("ls\u{7f}"));
        assert!(!has_control_bytes("ls -la\t/tmp"));
    }
}
