use std::io::Write;
use trek_core::{EvaluationResult, PolicyDecision, Verdict};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Output {
    #[default]
    Plain,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid output format {0:?}; expected `plain` or `json`")]
pub struct InvalidOutput(String);

/// Writes the verdict and, when requested, the decisions that justify it.
///
/// Unsupported peers are always listed when explaining, since they mean the verdict may not
/// reflect how the cluster treats the traffic.
pub fn render(
    result: &EvaluationResult,
    output: Output,
    explain: bool,
    out: &mut impl Write,
) -> std::io::Result<()> {
    match output {
        Output::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)
        }
        Output::Plain => {
            writeln!(out, "{}", result.verdict)?;
            if explain {
                explain_plain(result, out)?;
            }
            Ok(())
        }
    }
}

fn explain_plain(result: &EvaluationResult, out: &mut impl Write) -> std::io::Result<()> {
    if !result.is_affected() {
        return writeln!(out, "- Not affected by any policies");
    }

    let decisions = match result.verdict {
        Verdict::Allowed => &result.allowing,
        Verdict::Blocked => &result.blocking,
    };
    for PolicyDecision { policy, reason, .. } in decisions {
        writeln!(out, "- {policy} : {reason}")?;
    }
    if let Some(fallback) = result.decided_by_fallback() {
        writeln!(out, "- Verdict from unsupported fallback ({fallback})")?;
    }

    for PolicyDecision { policy, .. } in &result.unsupported {
        writeln!(
            out,
            "! {policy} : Unsupported ipBlock peer was not evaluated; the verdict may be incomplete"
        )?;
    }

    Ok(())
}

impl std::str::FromStr for Output {
    type Err = InvalidOutput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => Err(InvalidOutput(s.to_string())),
        }
    }
}
