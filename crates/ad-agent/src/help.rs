//! Static operator text.

/// Printed once at startup, before the first prompt.
pub const BANNER: &str = "
         Auto Docker
-----------------------------
Automated deployment system with file watching
Type 'help' for list of available commands
Press 'Ctrl + C' to escape this CLI tool or Docker terminal
";

/// The command reference shown by `help`.
pub const HELP_TEXT: &str = "  Available commands:
    redeploy - Immediate deployment
    pause - Pause auto-redeploy
    resume - Resume auto-redeploy
    cooldown (duration) - Set auto-redeploy cooldown 'cooldown 60s'
    status - See current status
    watch (folder path) - Add folder to watch list
    watchRemove (folder path) - Remove folder from watch list
    watchList - Display list of folders watching for changes
    reset - Remove all folders from watch list
    help - This help menu";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Verb;

    #[test]
    fn test_help_lists_every_verb() {
        let listed: Vec<Verb> = HELP_TEXT
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .map(Verb::parse)
            .collect();

        assert_eq!(listed.len(), 10);
        assert!(!listed.contains(&Verb::Unknown));
    }

    #[test]
    fn test_banner_mentions_help() {
        assert!(BANNER.contains("Type 'help'"));
        assert!(BANNER.contains("Auto Docker"));
    }
}
