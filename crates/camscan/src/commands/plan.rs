//! `camscan plan`: resolve the camera candidate and strategy chain for a
//! given set of enumerated devices, without opening anything.

use serde::Serialize;
use tabled::Tabled;

use camscan_core::{
    CameraConstraints, CameraDevice, CameraSourceResolver, DeviceClass, Script, ScriptedPlatform,
    StrategyOrder,
};

use crate::cli::{GlobalOpts, PlanArgs};
use crate::error::CliError;
use crate::output;

// ── View types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PlanView {
    device_class: DeviceClass,
    order: StrategyOrder,
    candidate: Option<CameraDevice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    strategies: Vec<StepView>,
}

#[derive(Debug, Serialize)]
struct StepView {
    step: usize,
    strategy: String,
    constraints: CameraConstraints,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Constraints")]
    constraints: String,
}

impl From<&StepView> for StepRow {
    fn from(s: &StepView) -> Self {
        Self {
            step: s.step,
            strategy: s.strategy.clone(),
            constraints: s.constraints.to_json().to_string(),
        }
    }
}

fn detail(plan: &PlanView) -> String {
    let candidate = plan.candidate.as_ref().map_or_else(
        || "-".into(),
        |d| {
            if d.label.is_empty() {
                d.id.clone()
            } else {
                format!("{} ({})", d.id, d.label)
            }
        },
    );
    let mut lines = vec![
        format!("Class:     {}", plan.device_class),
        format!("Order:     {}", plan.order),
        format!("Candidate: {candidate}"),
    ];
    if let Some(ref note) = plan.note {
        lines.push(format!("Note:      {note}"));
    }
    let rows: Vec<StepRow> = plan.strategies.iter().map(StepRow::from).collect();
    lines.push(output::render_table(&rows));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let order = match args.order {
        Some(order) => order,
        None => camscan_config::load_config(global.config.as_deref())?.strategy_order,
    };

    let platform = ScriptedPlatform::new(Script {
        devices: args.devices,
        ..Script::default()
    });
    let resolver = CameraSourceResolver::new(platform.collaborators().cameras);
    let plan = resolver.resolve(args.class, order).await;
    tracing::debug!(?plan, "plan resolved");

    let view = PlanView {
        device_class: args.class,
        order,
        candidate: plan.candidate,
        note: plan.enumeration_error.map(|e| e.to_string()),
        strategies: plan
            .chain
            .iter()
            .enumerate()
            .map(|(i, s)| StepView {
                step: i + 1,
                strategy: s.to_string(),
                constraints: s.constraints(),
            })
            .collect(),
    };

    let out = output::render_single(&global.output, &view, detail, |p| {
        p.strategies
            .iter()
            .map(|s| s.strategy.clone())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
