use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{
    planner::{Note, PlanReport},
    slot::SlotGrid,
    tariff::{PriceTier, Tariff},
};

const fn tier_color(tier: PriceTier) -> Color {
    match tier {
        PriceTier::Low => Color::Green,
        PriceTier::High => Color::Red,
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

#[must_use]
pub fn build_timeline_table(report: &PlanReport, tariff: &Tariff) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Elapsed", "Time", "SoC", "Tariff"]);
    for point in &report.timeline {
        let tier = tariff.tier(point.time);
        table.add_row(vec![
            Cell::new(format!("+{:.2}h", point.elapsed_hours)).add_attribute(Attribute::Dim),
            Cell::new(point.time.format("%H:%M")),
            Cell::new(point.soc).set_alignment(CellAlignment::Right),
            Cell::new(tier).fg(tier_color(tier)),
        ]);
    }
    table
}

#[must_use]
pub fn build_summary_table(report: &PlanReport) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Start",
        "End",
        "Departure",
        "Hours",
        "SoC",
        "Cost",
        "Baseline",
        "Savings",
    ]);
    table.add_row(vec![
        Cell::new(report.start.format("%a %H:%M")),
        Cell::new(report.end.format("%a %H:%M")),
        Cell::new(report.departure.format("%a %H:%M")).add_attribute(Attribute::Dim),
        Cell::new(format!("{:.2}", report.hours)).set_alignment(CellAlignment::Right),
        Cell::new(report.final_soc)
            .set_alignment(CellAlignment::Right)
            .fg(if report.meets_departure { Color::Green } else { Color::Red }),
        Cell::new(report.optimized_cost).set_alignment(CellAlignment::Right),
        Cell::new(report.baseline_cost).set_alignment(CellAlignment::Right),
        Cell::new(report.savings).set_alignment(CellAlignment::Right).fg(
            if report.savings.0 > 0.0 { Color::Green } else { Color::Reset },
        ),
    ]);
    if let Some(note) = report.note {
        let color = match note {
            Note::BestEffort | Note::ShortWindow => Color::DarkYellow,
            Note::AlreadyAtTarget | Note::Immediate | Note::ImmediateCheaper => Color::Reset,
        };
        table.add_row(vec![Cell::new(note).fg(color)]);
    }
    table
}

#[must_use]
pub fn build_slots_table(grid: &SlotGrid) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Index", "Start", "End", "Tariff", "Rate"]);
    for (index, slot) in grid.slots().iter().enumerate() {
        table.add_row(vec![
            Cell::new(index).add_attribute(Attribute::Dim),
            Cell::new(slot.start.format("%a %H:%M")),
            Cell::new((slot.start + grid.interval()).format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(slot.tier).fg(tier_color(slot.tier)),
            Cell::new(slot.rate).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
