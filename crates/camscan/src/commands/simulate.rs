//! `camscan simulate`: run one complete scan session against a scripted
//! platform and report what happened.
//!
//! A scenario is a TOML file. Top-level keys describe the session; the
//! rest is the platform script:
//!
//! ```toml
//! device_class = "mobile"
//! stop_after_ms = 500
//!
//! devices = [{ id = "1", label = "Front Camera" }, { id = "2", label = "Back Camera" }]
//! acquisitions = [{ result = "fail", error = { kind = "not-readable", message = "busy" } }]
//! frames = [{ kind = "miss" }, { kind = "code", text = "0123456789" }]
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::info;
use uuid::Uuid;

use camscan_core::{
    CameraDevice, DeviceClass, PlatformCall, PlatformError, ScanController, ScanOutcome, Script,
    ScriptedPlatform, SessionReport, TargetField, field_sink,
};

use crate::cli::{GlobalOpts, SimulateArgs};
use crate::error::CliError;
use crate::output::{self, Tone};

/// Stop request issued when the scenario neither decodes nor ends on its own.
const DEFAULT_STOP_AFTER_MS: u64 = 2_000;

// ── Scenario ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub device_class: DeviceClass,
    /// Request a stop if nothing was decoded after this many milliseconds.
    pub stop_after_ms: Option<u64>,
    /// Falls back to the configured render target.
    pub render_target: Option<String>,
    #[serde(flatten)]
    pub script: Script,
}

// ── View types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SimulationView {
    session_id: Uuid,
    device_class: DeviceClass,
    candidate: Option<CameraDevice>,
    enumeration_error: Option<String>,
    chain: Vec<String>,
    attempts: Vec<AttemptView>,
    transitions: Vec<String>,
    outcome: OutcomeView,
    /// Value written to the target field, if any.
    delivered: Option<String>,
    stop_error: Option<String>,
    calls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AttemptView {
    step: usize,
    strategy: String,
    error: Option<PlatformError>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum OutcomeView {
    Decoded { value: String },
    Cancelled,
    Failed { kind: &'static str, message: String },
}

impl From<&ScanOutcome> for OutcomeView {
    fn from(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Decoded(value) => Self::Decoded {
                value: value.clone(),
            },
            ScanOutcome::Cancelled => Self::Cancelled,
            ScanOutcome::Failed(e) => Self::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Tabled)]
struct AttemptRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&AttemptView> for AttemptRow {
    fn from(a: &AttemptView) -> Self {
        Self {
            step: a.step,
            strategy: a.strategy.clone(),
            result: a
                .error
                .as_ref()
                .map_or_else(|| "acquired".into(), ToString::to_string),
        }
    }
}

fn describe_call(call: &PlatformCall) -> String {
    match call {
        PlatformCall::Show(layout) if layout.capture.is_full_viewport() => {
            "show (full viewport)".into()
        }
        PlatformCall::Show(_) => "show".into(),
        PlatformCall::Hide => "hide".into(),
        PlatformCall::Enumerate => "enumerate".into(),
        PlatformCall::CreateDecoder(target) => format!("create-decoder {target}"),
        PlatformCall::Start(constraints) => format!("start {}", constraints.to_json()),
        PlatformCall::Stop => "stop".into(),
        PlatformCall::Clear => "clear".into(),
    }
}

impl SimulationView {
    fn new(report: &SessionReport, delivered: Option<String>, calls: &[PlatformCall]) -> Self {
        Self {
            session_id: report.session_id,
            device_class: report.device_class,
            candidate: report.plan.candidate.clone(),
            enumeration_error: report.plan.enumeration_error.as_ref().map(ToString::to_string),
            chain: report.plan.chain.iter().map(ToString::to_string).collect(),
            attempts: report
                .attempts
                .iter()
                .enumerate()
                .map(|(i, a)| AttemptView {
                    step: i + 1,
                    strategy: a.strategy.to_string(),
                    error: a.error.clone(),
                })
                .collect(),
            transitions: report.transitions.iter().map(ToString::to_string).collect(),
            outcome: OutcomeView::from(&report.outcome),
            delivered,
            stop_error: report.stop_error.as_ref().map(ToString::to_string),
            calls: calls.iter().map(describe_call).collect(),
        }
    }
}

fn detail(view: &SimulationView, color: bool) -> String {
    let outcome = match &view.outcome {
        OutcomeView::Decoded { value } => {
            format!("{} {value:?}", output::paint("decoded", Tone::Good, color))
        }
        OutcomeView::Cancelled => output::paint("cancelled", Tone::Warn, color),
        OutcomeView::Failed { kind, message } => {
            format!("{} ({message})", output::paint(kind, Tone::Bad, color))
        }
    };
    let candidate = view
        .candidate
        .as_ref()
        .map_or_else(|| "-".into(), |d| format!("{} ({})", d.id, d.label));

    let mut lines = vec![
        format!("Session:     {}", view.session_id),
        format!("Class:       {}", view.device_class),
        format!("Candidate:   {candidate}"),
    ];
    if let Some(ref err) = view.enumeration_error {
        lines.push(format!("Enumeration: {err}"));
    }
    lines.push(format!("Transitions: {}", view.transitions.join(" -> ")));
    lines.push(format!("Outcome:     {outcome}"));
    if let Some(ref err) = view.stop_error {
        lines.push(format!(
            "Teardown:    {}",
            output::paint(err, Tone::Warn, color)
        ));
    }
    if !view.attempts.is_empty() {
        let rows: Vec<AttemptRow> = view.attempts.iter().map(AttemptRow::from).collect();
        lines.push(output::render_table(&rows));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn load_scenario(path: &std::path::Path) -> Result<Scenario, CliError> {
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|source| CliError::Scenario {
        path: path.display().to_string(),
        source,
    })
}

pub async fn handle(args: &SimulateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let scenario = load_scenario(&args.scenario)?;
    let cfg = camscan_config::load_config(global.config.as_deref())?;
    let settings = cfg.to_settings()?;

    let class = args.class.unwrap_or(scenario.device_class);
    let stop_after = args
        .stop_after
        .or(scenario.stop_after_ms)
        .unwrap_or(DEFAULT_STOP_AFTER_MS);
    if stop_after == 0 {
        return Err(CliError::Validation {
            field: "stop_after".into(),
            reason: "must be at least 1 ms".into(),
        });
    }

    let mut script = scenario.script;
    script.render_target = scenario.render_target.unwrap_or(cfg.render_target);
    let platform = ScriptedPlatform::new(script);
    let ctrl = ScanController::new(settings, class, platform.collaborators());

    let field = TargetField::new();
    let sink = field_sink(Some(field.clone()), |text| {
        tracing::warn!(%text, "decoded value had no target field");
    });
    ctrl.request_scan(sink).await?;

    let report = tokio::select! {
        report = ctrl.wait() => report,
        () = tokio::time::sleep(Duration::from_millis(stop_after)) => {
            info!(stop_after_ms = stop_after, "no decode yet, requesting stop");
            ctrl.request_stop().await
        }
    };
    let report = report.ok_or(CliError::SessionAborted)?;

    let view = SimulationView::new(&report, field.value(), &platform.journal());
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| match &v.outcome {
            OutcomeView::Decoded { value } => value.clone(),
            OutcomeView::Cancelled => "cancelled".into(),
            OutcomeView::Failed { kind, .. } => (*kind).to_owned(),
        },
    )?;
    output::print_output(&out, global.quiet);

    match &report.outcome {
        ScanOutcome::Decoded(_) => Ok(()),
        ScanOutcome::Cancelled => Err(CliError::Cancelled),
        ScanOutcome::Failed(e) => Err(e.clone().into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use camscan_core::{AcquisitionScript, FrameScript};

    use super::*;

    #[test]
    fn scenario_flattens_script_keys() {
        let scenario: Scenario = toml::from_str(
            r#"
            device_class = "webview"
            render_target = "reader"
            close_after_frames = true

            devices = [{ id = "2", label = "Back Camera" }]
            acquisitions = [
                { result = "fail", error = { kind = "overconstrained", message = "facingMode" } },
                { result = "ok" },
            ]
            frames = [{ kind = "miss" }, { kind = "code", text = "X" }]
            "#,
        )
        .unwrap();

        assert_eq!(scenario.device_class, DeviceClass::EmbeddedWebView);
        assert_eq!(scenario.render_target.as_deref(), Some("reader"));
        assert_eq!(scenario.stop_after_ms, None);
        assert!(scenario.script.close_after_frames);
        assert_eq!(scenario.script.devices.len(), 1);
        assert_eq!(
            scenario.script.acquisitions,
            vec![
                AcquisitionScript::Fail {
                    error: PlatformError::Overconstrained("facingMode".into())
                },
                AcquisitionScript::Ok,
            ]
        );
        assert_eq!(
            scenario.script.frames,
            vec![FrameScript::Miss, FrameScript::Code { text: "X".into() }]
        );
    }

    #[test]
    fn empty_scenario_uses_defaults() {
        let scenario: Scenario = toml::from_str("").unwrap();
        assert_eq!(scenario.device_class, DeviceClass::Desktop);
        assert!(scenario.script.devices.is_empty());
        assert!(!scenario.script.close_after_frames);
    }

    #[test]
    fn outcome_view_tags_status() {
        let view = OutcomeView::from(&ScanOutcome::Decoded("abc".into()));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "decoded");
        assert_eq!(json["value"], "abc");
    }
}
