#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod core;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};
use serde::Serialize;

use crate::{
    cli::{Args, Command, PlanArgs, SlotsArgs},
    core::{config::EngineConfig, planner::plan, slot::SlotGrid},
    prelude::*,
    tables::{build_slots_table, build_summary_table, build_timeline_table},
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    // Logs go to stderr, stdout is reserved for the report:
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    match args.command {
        Command::Plan(plan_args) => run_plan(&plan_args, args.json),
        Command::Slots(slots_args) => run_slots(&slots_args, args.json),
    }
}

fn run_plan(args: &PlanArgs, json: bool) -> Result {
    let config = EngineConfig::from(args.engine);
    let now = args.departure.now();
    let report = plan(&config, args.request(now), now).context("failed to plan the charge")?;
    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", build_timeline_table(&report, &config.tariff));
        println!("{}", build_summary_table(&report));
    }
    Ok(())
}

fn run_slots(args: &SlotsArgs, json: bool) -> Result {
    let config = EngineConfig::from(args.engine);
    config.validate().context("invalid engine configuration")?;
    let now = args.departure.now();
    let grid = SlotGrid::build(now, args.departure.resolve(now), &config);
    info!(n_slots = grid.len(), "built the slot grid");
    if json {
        println!("{}", to_json(grid.slots())?);
    } else {
        println!("{}", build_slots_table(&grid));
    }
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize the output")
}
