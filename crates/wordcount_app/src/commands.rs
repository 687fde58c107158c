//! Drives the engine for each subcommand and prints JSON results.

use std::io::Write;

use anyhow::{anyhow, bail};
use counter_logging::{engine_debug, engine_warn};
use serde::Serialize;
use wordcount_core::{validate_request, CountOutcome};
use wordcount_engine::{EngineEvent, EngineHandle, JobId};

/// Counts every input; returns whether all of them succeeded.
///
/// Malformed inputs are reported without reaching the engine. Outcomes are
/// printed in input order, one JSON object per line.
pub fn count(
    engine: &EngineHandle,
    kind: &str,
    inputs: &[String],
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let mut outcomes: Vec<Option<CountOutcome>> = vec![None; inputs.len()];
    let mut pending = 0usize;

    for (index, input) in inputs.iter().enumerate() {
        match validate_request(Some(input), Some(kind)) {
            Ok(request) => {
                engine_debug!("Queueing job {} for {}", index, request.describe());
                engine.enqueue(index as JobId, request);
                pending += 1;
            }
            Err(errors) => {
                outcomes[index] = Some(CountOutcome::Invalid {
                    validation_errors: errors.messages,
                });
            }
        }
    }

    while pending > 0 {
        match engine.recv() {
            Some(EngineEvent::JobCompleted { job_id, outcome }) => {
                let slot = outcomes
                    .get_mut(job_id as usize)
                    .ok_or_else(|| anyhow!("engine reported unknown job {job_id}"))?;
                *slot = Some(outcome);
                pending -= 1;
            }
            Some(EngineEvent::Stopped) | None => {
                bail!("engine stopped with {pending} job(s) unfinished")
            }
            Some(_) => {}
        }
    }

    let mut all_succeeded = true;
    for outcome in outcomes.into_iter().flatten() {
        if !outcome.is_success() {
            all_succeeded = false;
        }
        print_json(out, &outcome)?;
    }
    Ok(all_succeeded)
}

pub fn stats(engine: &EngineHandle, word: &str, out: &mut impl Write) -> anyhow::Result<()> {
    engine.lookup(word);
    let stats = wait_for(engine, |event| match event {
        EngineEvent::Statistics(result) => Some(result),
        _ => None,
    })?
    .map_err(|err| anyhow!("lookup failed: {err}"))?;
    print_json(out, &stats)
}

pub fn top(engine: &EngineHandle, n: usize, out: &mut impl Write) -> anyhow::Result<()> {
    engine.top(n);
    let words = wait_for(engine, |event| match event {
        EngineEvent::Top(result) => Some(result),
        _ => None,
    })?
    .map_err(|err| anyhow!("listing failed: {err}"))?;
    print_json(out, &words)
}

/// Prints the health report; returns whether the store is healthy.
pub fn health(engine: &EngineHandle, out: &mut impl Write) -> anyhow::Result<bool> {
    engine.health();
    let report = wait_for(engine, |event| match event {
        EngineEvent::Health(report) => Some(report),
        _ => None,
    })?;
    if !report.healthy {
        engine_warn!("Store {} is unhealthy", report.store);
    }
    print_json(out, &report)?;
    Ok(report.healthy)
}

fn wait_for<T>(
    engine: &EngineHandle,
    mut select: impl FnMut(EngineEvent) -> Option<T>,
) -> anyhow::Result<T> {
    loop {
        match engine.recv() {
            Some(EngineEvent::Stopped) | None => bail!("engine stopped before answering"),
            Some(event) => {
                if let Some(value) = select(event) {
                    return Ok(value);
                }
            }
        }
    }
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
