use std::path::{Path, PathBuf};

pub use anstream::println as aprintln;

/// Tokyo Night color palette
pub mod colors {
    pub const RESET: &str = "\x1b[0m";

    pub const TKN_RED: &str = "\x1b[38;2;247;118;142m"; // #f7768e
    pub const TKN_GREEN: &str = "\x1b[38;2;158;206;106m"; // #9ece6a
    pub const TKN_YELLOW: &str = "\x1b[38;2;224;175;104m"; // #e0af68
    pub const TKN_BLUE: &str = "\x1b[38;2;122;162;247m"; // #7aa2f7
    pub const TKN_CYAN: &str = "\x1b[38;2;125;207;255m"; // #7dcfff
}

fn paint(color: &str, text: &str) -> String {
    format!("{}{}{}", color, text, colors::RESET)
}

/// Colored fragments (matching bash p g/r/y/b/c)
pub fn p_g(text: &str) -> String {
    paint(colors::TKN_GREEN, text)
}

pub fn p_r(text: &str) -> String {
    paint(colors::TKN_RED, text)
}

pub fn p_y(text: &str) -> String {
    paint(colors::TKN_YELLOW, text)
}

pub fn p_b(text: &str) -> String {
    paint(colors::TKN_BLUE, text)
}

pub fn p_c(text: &str) -> String {
    paint(colors::TKN_CYAN, text)
}

/// Root of the cargo workspace (the parent of the `xtask` crate).
pub fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

/// The `logbook_db` crate directory, which owns `schema/`, `migrations/` and `fixtures/`.
pub fn db_crate_dir() -> PathBuf {
    workspace_root().join("crates").join("db")
}

/// Execute a command with stdin/stdout/stderr connected to the terminal.
pub async fn execute_command_interactive(
    command: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> std::io::Result<std::process::ExitStatus> {
    tokio::process::Command::new(command)
        .args(args)
        .envs(envs.iter().copied())
        .current_dir(workspace_root())
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_with_reset() {
        let painted = p_g("ok");
        assert!(painted.starts_with(colors::TKN_GREEN));
        assert!(painted.ends_with(colors::RESET));
        assert!(painted.contains("ok"));
    }

    #[test]
    fn test_db_crate_dir_is_inside_workspace() {
        let db = db_crate_dir();
        assert!(db.starts_with(workspace_root()));
        assert!(db.join("schema").join("fragments").is_dir());
    }
}
