use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;

use pnsim::config::{EngineKind, RunConfig, Step, StepOp};
use pnsim::net::io::{read_net, to_json_string};
use pnsim::net::{Marking, Net, TransitionId, Weight};
use pnsim::options::Options;
use pnsim::sim::{Simulation, SimulationBuilder, TaskSimulation};

#[derive(Debug, Serialize)]
struct RunSummary {
    engine: EngineKind,
    steps_applied: usize,
    failures: Vec<String>,
    enabled: Vec<TransitionId>,
    assigned: Vec<TransitionId>,
    marking: Marking,
    tokens: Weight,
}

fn main() -> ExitCode {
    if std::env::var("PNSIM_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PNSIM_LOG")
            .write_style("PNSIM_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let options = if args.is_empty() {
        Options::parse_from_str(&std::env::var("PNSIM_FLAGS").unwrap_or_default())
    } else {
        Options::parse_from_args(&args)
    }
    .map_err(|err| anyhow!("{err}"))?;
    log::debug!("pnsim options: {:?}", options);

    let net = read_net(&options.net)
        .with_context(|| format!("Failed to read net file: {:?}", options.net))?;
    if options.diagnose {
        net.log_diagnostics();
    }

    let config = match &options.config {
        Some(path) => RunConfig::load_from_file(path)?,
        None => RunConfig::default(),
    };
    let engine = options.engine.unwrap_or(config.engine);
    let builder = SimulationBuilder::new()
        .net(net)
        .data(config.data.clone());

    let summary = match engine {
        EngineKind::Basic => {
            let mut sim = builder.build_basic()?;
            let (steps_applied, failures) = run_steps(&mut sim, &config, apply_task_step)?;
            let summary = RunSummary {
                engine,
                steps_applied,
                failures,
                enabled: sim.enabled(),
                assigned: sim.assigned(),
                marking: sim.marking(),
                tokens: sim.marking().total(),
            };
            export_dot(&options, sim.model())?;
            summary
        }
        EngineKind::Transition => {
            let mut sim = builder.build_transition()?;
            let (steps_applied, failures) = run_steps(&mut sim, &config, apply_fire_step)?;
            let summary = RunSummary {
                engine,
                steps_applied,
                failures,
                enabled: sim.enabled(),
                assigned: Vec::new(),
                marking: sim.marking(),
                tokens: sim.marking().total(),
            };
            export_dot(&options, sim.model())?;
            summary
        }
    };

    println!("{}", to_json_string(&summary)?);
    Ok(())
}

fn export_dot(options: &Options, model: &Net) -> Result<()> {
    if let Some(path) = &options.dot {
        model
            .write_dot(path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        log::info!("wrote final model to {:?}", path);
    }
    Ok(())
}

fn run_steps<S, F>(sim: &mut S, config: &RunConfig, apply: F) -> Result<(usize, Vec<String>)>
where
    S: Simulation,
    F: Fn(&mut S, &Step) -> Result<()>,
{
    let mut applied = 0;
    let mut failures = Vec::new();
    for (idx, step) in config.steps.iter().enumerate() {
        match apply(sim, step) {
            Ok(()) => applied += 1,
            Err(err) if !config.stop_on_error => {
                log::warn!("step {} ({:?} {}) failed: {:#}", idx, step.op, step.transition, err);
                failures.push(format!("step {idx}: {err:#}"));
            }
            Err(err) => {
                return Err(err.context(format!("step {} ({:?} {})", idx, step.op, step.transition)));
            }
        }
    }
    Ok((applied, failures))
}

fn apply_task_step<S: TaskSimulation>(sim: &mut S, step: &Step) -> Result<()> {
    let transition = step.transition.as_str();
    match step.op {
        StepOp::Assign => sim.assign(transition)?,
        StepOp::Finish => sim.finish(transition)?,
        StepOp::Cancel => sim.cancel(transition)?,
        StepOp::Fire => sim.fire(transition)?,
        StepOp::Reset => sim.reset(),
    }
    Ok(())
}

fn apply_fire_step<S: Simulation>(sim: &mut S, step: &Step) -> Result<()> {
    match step.op {
        StepOp::Fire => sim.fire(step.transition.as_str())?,
        StepOp::Reset => sim.reset(),
        StepOp::Assign | StepOp::Finish | StepOp::Cancel => {
            bail!("{:?} needs the basic engine", step.op)
        }
    }
    Ok(())
}
