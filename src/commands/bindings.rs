use clap::Args;
use serde::Serialize;

use hostrun::binding::{distinct_subset, Binding, ParamSet};
use hostrun::config::RunConfig;
use hostrun::defaults::load_defaults;
use hostrun::paths::expand_user_path;
use hostrun::step::{ActionKind, Step};
use hostrun::variables;
use hostrun::Error;

use super::CmdResult;

#[derive(Args, Debug)]
pub struct BindingsArgs {
    /// Config file whose variables are resolved
    #[arg(short = 'f', long = "conf-file")]
    pub conf_file: String,

    /// Unique run id. Generated from the current UTC time when omitted
    #[arg(long = "run-id")]
    pub run_id: Option<String>,

    /// Also show how this step splits the bindings
    #[arg(long)]
    pub step: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BindingsOutput {
    pub run_id: String,
    pub names: Vec<String>,
    pub count: usize,
    pub bindings: Vec<Binding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepBindings>,
}

#[derive(Debug, Serialize)]
pub struct StepBindings {
    pub name: String,
    pub action: ActionKind,
    pub action_params: ParamSet,
    pub command_params: ParamSet,
    /// One connection per entry.
    pub action_bindings: Vec<Binding>,
    pub combined_bindings: Vec<Binding>,
}

pub fn run(args: BindingsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<BindingsOutput> {
    let config = RunConfig::load(&expand_user_path(&args.conf_file))?;
    let defaults = load_defaults();
    let set = variables::load(&config, args.run_id.as_deref(), defaults.timeout_secs)?;

    let step = match &args.step {
        Some(name) => {
            let raw = config
                .step(name)
                .ok_or_else(|| Error::config_missing_key(name.clone(), Some(args.conf_file.clone())))?;
            let step = Step::parse(name, raw, &set.names)?;
            Some(StepBindings {
                name: name.clone(),
                action: step.kind(),
                action_bindings: distinct_subset(&step.params.action, &set.bindings),
                combined_bindings: distinct_subset(&step.params.combined, &set.bindings),
                action_params: step.params.action,
                command_params: step.params.command,
            })
        }
        None => None,
    };

    Ok((
        BindingsOutput {
            run_id: set.run_id,
            names: set.names.into_iter().collect(),
            count: set.bindings.len(),
            bindings: set.bindings,
            step,
        },
        0,
    ))
}
