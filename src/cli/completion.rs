//! Shell completion generation for mongo-ferry
//!
//! Scripts for bash, zsh and fish are generated with clap_complete and then
//! extended so that `--origin-cluster` and `--destination-cluster` complete
//! from the aliases printed by `mongo-ferry clusters`.

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result};

const BIN_NAME: &str = "mongo-ferry";

/// Generate shell completion script and print it to stdout
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish)
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    print!("{}", completion_script(shell));
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(ConfigError::Generic(format!(
            "Unsupported shell: {shell_name}. Supported shells: bash, zsh, fish"
        ))
        .into()),
    }
}

/// Full completion script for `shell`
fn completion_script(shell: Shell) -> String {
    let base = base_completion(shell);
    let extension = match shell {
        Shell::Zsh => ZSH_CLUSTERS,
        Shell::Fish => FISH_CLUSTERS,
        _ => BASH_CLUSTERS,
    };
    format!("{base}\n{extension}")
}

/// Completion generated from the clap definition alone
fn base_completion(shell: Shell) -> String {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

const BASH_CLUSTERS: &str = r#"
# Cluster alias completion
_mongo_ferry_list_clusters() {
    mongo-ferry clusters 2>/dev/null
}

_mongo_ferry_base="$(complete -p mongo-ferry 2>/dev/null | sed -E 's/.*-F ([^ ]+).*/\1/')"

_mongo_ferry_enhanced() {
    local cur prev words cword
    _init_completion || return

    if [[ "$prev" == "--origin-cluster" || "$prev" == "--destination-cluster" ]]; then
        COMPREPLY=($(compgen -W "$(_mongo_ferry_list_clusters)" -- "$cur"))
        return 0
    fi

    "$_mongo_ferry_base" "$@"
}

complete -F _mongo_ferry_enhanced mongo-ferry
"#;

const ZSH_CLUSTERS: &str = r#"
# Cluster alias completion
_mongo_ferry_clusters() {
    local -a clusters
    clusters=($(mongo-ferry clusters 2>/dev/null))
    _describe 'clusters' clusters
}

_mongo_ferry_enhanced() {
    if [[ ${words[CURRENT-1]} == "--origin-cluster" || ${words[CURRENT-1]} == "--destination-cluster" ]]; then
        _mongo_ferry_clusters
        return 0
    fi

    _mongo-ferry "$@"
}

compdef _mongo_ferry_enhanced mongo-ferry
"#;

const FISH_CLUSTERS: &str = r#"
# Cluster alias completion
function __mongo_ferry_list_clusters
    mongo-ferry clusters 2>/dev/null
end

complete -c mongo-ferry -l origin-cluster -f -a "(__mongo_ferry_list_clusters)" -d "Cluster alias"
complete -c mongo-ferry -l destination-cluster -f -a "(__mongo_ferry_list_clusters)" -d "Cluster alias"
"#;
