//! Single-chart commands: parse and transpose.

use std::path::Path;

use anyhow::Context;

use super::{TargetArgs, chart_parser, read_input};
use crate::chart::{DisplayMode, ParseOutcome, ProviderHint, render};
use crate::config::Config;
use crate::transpose::{TransposeTarget, transpose};

/// Parse a chart and print it in canonical form
pub fn cmd_parse(
    config: &Config,
    path: &Path,
    hint: ProviderHint,
    json: bool,
    mode: DisplayMode,
) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    let outcome = chart_parser(config).parse(&raw, hint);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print!("{}", render(outcome.document(), mode));
    print_summary(&outcome);
    Ok(())
}

/// Transpose a chart
pub fn cmd_transpose(
    config: &Config,
    path: &Path,
    hint: ProviderHint,
    target: &TargetArgs,
    mode: DisplayMode,
) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    let outcome = chart_parser(config).parse(&raw, hint);

    let target = transpose_target(target)?;
    let transposed = transpose(outcome.document(), target, &config.spelling.keys)
        .context("Failed to transpose chart")?;

    print!("{}", render(&transposed, mode));
    print_summary(&outcome);
    Ok(())
}

fn transpose_target(args: &TargetArgs) -> anyhow::Result<TransposeTarget> {
    if let Some(key) = &args.to_key {
        return Ok(TransposeTarget::parse_key(key)?);
    }
    if let Some(delta) = args.delta {
        return Ok(TransposeTarget::Delta(delta));
    }
    if let Some(capo) = args.capo {
        return Ok(TransposeTarget::Capo(capo));
    }
    anyhow::bail!("one of --to-key, --delta or --capo is required")
}

/// Chord count, confidence and any unparsed tokens, on stderr.
fn print_summary(outcome: &ParseOutcome) {
    let chords = outcome.document().chord_count();
    eprintln!();
    eprintln!(
        "{} chords, confidence {:.0}%",
        chords,
        outcome.confidence() * 100.0
    );
    let failures = outcome.failures();
    if !failures.is_empty() {
        eprintln!("{} token(s) could not be parsed:", failures.len());
        for failure in failures.iter().take(20) {
            eprintln!("  {}", failure);
        }
        if failures.len() > 20 {
            eprintln!("  ... and {} more", failures.len() - 20);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::Pitch;

    #[test]
    fn test_transpose_target_from_args() {
        let args = TargetArgs {
            to_key: Some("Bb".to_string()),
            delta: None,
            capo: None,
        };
        assert_eq!(
            transpose_target(&args).unwrap(),
            TransposeTarget::ToKey(Pitch::new(10))
        );

        let args = TargetArgs {
            to_key: None,
            delta: None,
            capo: Some(3),
        };
        assert_eq!(transpose_target(&args).unwrap(), TransposeTarget::Capo(3));

        let args = TargetArgs {
            to_key: Some("H#".to_string()),
            delta: None,
            capo: None,
        };
        assert!(transpose_target(&args).is_err());
    }
}
