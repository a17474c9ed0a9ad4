use std::collections::HashSet;

use guild_jukebox::commands;

#[test]
fn test_all_commands_returns_correct_count() {
    let cmds = commands::all();
    assert_eq!(
        cmds.len(),
        15,
        "Expected 15 commands (help + join/leave + 6 music + 6 aliases), got {}",
        cmds.len()
    );
}

#[test]
fn test_all_commands_contain_expected_names() {
    let cmds = commands::all();
    let names: HashSet<&str> = cmds.iter().map(|cmd| cmd.name.as_str()).collect();

    let expected = [
        "help",
        "play",
        "p",
        "join",
        "leave",
        "skip",
        "s",
        "stop",
        "st",
        "queue",
        "q",
        "nowplaying",
        "np",
        "loop",
        "l",
    ];

    for name in &expected {
        assert!(
            names.contains(name),
            "Expected command '{}' not found in commands::all(). Present names: {:?}",
            name,
            names
        );
    }
}

#[test]
fn test_no_duplicate_command_names() {
    let cmds = commands::all();
    let mut seen = HashSet::new();

    for cmd in &cmds {
        assert!(
            seen.insert(cmd.name.as_str()),
            "Duplicate command name found: '{}'",
            cmd.name
        );
    }
}

#[test]
fn test_all_commands_are_slash_commands() {
    let cmds = commands::all();

    for cmd in &cmds {
        assert!(
            cmd.slash_action.is_some(),
            "Command '{}' does not have slash_action set (not a slash command)",
            cmd.name
        );
    }
}

#[test]
fn test_all_commands_are_guild_only() {
    for cmd in commands::all() {
        assert!(cmd.guild_only, "Command '{}' should be guild_only", cmd.name);
    }
}
