/// Role definitions compiled into the binary.
/// These are always available even if the agents/roles/ directory doesn't exist
use std::collections::HashMap;

/// All role configs embedded at compile time, keyed by file stem
pub fn get_embedded_role_configs() -> HashMap<&'static str, &'static str> {
    let mut configs = HashMap::new();

    configs.insert("boss", include_str!("../../../agents/roles/boss.json"));
    configs.insert("boss_assistant", include_str!("../../../agents/roles/boss_assistant.json"));
    configs.insert("test_engineer", include_str!("../../../agents/roles/test_engineer.json"));
    configs.insert(
        "test_engineering_manager",
        include_str!("../../../agents/roles/test_engineering_manager.json"),
    );
    configs.insert("code_reviewer", include_str!("../../../agents/roles/code_reviewer.json"));

    configs
}
