use clap::{Parser, Subcommand};

use self::{
    evaluate_learner::EvaluateLearnerArg, generate_bid::GenerateBidArg, simulate::SimulateArg,
};

mod evaluate_learner;
mod generate_bid;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Measure how well the opponent learner recovers synthetic preferences
    EvaluateLearner(#[clap(flatten)] EvaluateLearnerArg),
    /// Generate bids for the agent of a scenario, using the other profiles as opponents
    GenerateBid(#[clap(flatten)] GenerateBidArg),
    /// Run a negotiation between the agent and scripted counterparts
    Simulate(#[clap(flatten)] SimulateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::EvaluateLearner(arg) => evaluate_learner::run(&arg)?,
        Mode::GenerateBid(arg) => generate_bid::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
    }
    Ok(())
}
