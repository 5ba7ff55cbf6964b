use clap::Args;

use hostrun::sources::ambari::{self, HttpApi, Query, DEFAULT_USER};

use super::run::{self, RunOutput};
use super::{CmdResult, CommonArgs, TargetArgs};
use crate::tty::TerminalOperator;

#[derive(Args, Debug)]
pub struct AmbariArgs {
    /// IP or hostname of the Ambari server
    #[arg(short = 'a', long = "ambari-server")]
    pub ambari_server: String,

    /// Ambari server port. Default: 8080
    #[arg(short = 'r', long)]
    pub port: Option<String>,

    /// Ambari UI user. Default: admin
    #[arg(short = 'u', long = "ambari-user")]
    pub ambari_user: Option<String>,

    /// Ambari UI password. Prompted when omitted
    #[arg(short = 'p', long = "ambari-pass")]
    pub ambari_pass: Option<String>,

    /// Cluster name. Default: the first cluster Ambari reports
    #[arg(short = 'n', long = "clustername")]
    pub cluster: Option<String>,

    /// Service name, e.g. HDFS. Selected from a list when omitted
    #[arg(short = 's', long)]
    pub service: Option<String>,

    /// Component name, or ALL. Selected from a list when omitted
    #[arg(short = 'c', long)]
    pub component: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn is_interactive(args: &AmbariArgs) -> bool {
    args.target.interactive
}

pub fn run(args: AmbariArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut operator = TerminalOperator;
    let credentials = run::ssh_credentials(&args.common, &mut operator)?;

    let user = args.ambari_user.as_deref().unwrap_or(DEFAULT_USER);
    let password = ambari::password_for(user, args.ambari_pass.clone(), &mut operator)?;
    let api = HttpApi::new(&args.ambari_server, args.port.as_deref(), user, &password)?;
    let query = Query {
        cluster: args.cluster.clone(),
        service: args.service.clone(),
        component: args.component.clone(),
    };

    let variables = ambari::discover(&api, &query, &credentials, &mut operator)?;
    run::execute(Some(variables), &args.target, &args.common.run, &mut operator)
}
