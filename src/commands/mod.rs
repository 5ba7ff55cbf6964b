use clap::Args;

pub type CmdResult<T> = hostrun::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Flags shared by every run subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Unique run id. Generated from the current UTC time when omitted
    #[arg(long = "run-id")]
    pub run_id: Option<String>,

    /// Execute the resolved commands. Without this flag every command is
    /// only printed, so destructive commands like `rm -fr` are never run
    /// by accident
    #[arg(long = "live-run")]
    pub live_run: bool,

    /// Shell used for `local` steps
    #[arg(long)]
    pub shell: Option<String>,
}

/// Run flags plus the SSH credentials of the host sources.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// SSH username to connect to hosts
    #[arg(long = "ssh-user")]
    pub ssh_user: Option<String>,

    /// SSH password to connect to hosts (`:p` prompts for it)
    #[arg(long = "ssh-pass")]
    pub ssh_pass: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Where the steps come from: a config file or an interactive session.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Config file to run (.json, .yaml, .yml or .toml)
    #[arg(short = 'f', long = "conf-file", conflicts_with = "interactive")]
    pub conf_file: Option<String>,

    /// Open an interactive SSH session on the first host
    #[arg(long)]
    pub interactive: bool,
}

pub mod ambari;
pub mod bindings;
pub mod conf;
pub mod cred;
pub mod etc;
pub mod hosts;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (hostrun::Result<serde_json::Value>, i32) {
    crate::tty::status("hostrun is working...");

    match command {
        crate::Commands::Conf(args) => dispatch!(args, global, conf),
        crate::Commands::Etc(args) => dispatch!(args, global, etc),
        crate::Commands::Cred(args) => dispatch!(args, global, cred),
        crate::Commands::Hosts(args) => dispatch!(args, global, hosts),
        crate::Commands::Ambari(args) => dispatch!(args, global, ambari),
        crate::Commands::Bindings(args) => dispatch!(args, global, bindings),
    }
}
