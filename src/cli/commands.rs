use std::time::Duration;

use tracing::info;

use crate::agent::answer_service::{AnswerService, HttpAnswerService, StaticAnswerService};
use crate::agent::error::AutofillError;
use crate::agent::orchestrator::AutofillEngine;
use crate::cli::config::AppConfig;
use crate::dom::page::{PageContext, StaticPage};
use crate::host::channel::serve;
use crate::host::controller::HostController;
use crate::scheduler::rescan::RescanScheduler;
use crate::screen::detector::detect_forms;
use crate::store::kv::{FileStore, KeyValueStore, MemoryStore};
use crate::trace::logger::TraceLogger;

fn read_html(path: &str) -> Result<String, AutofillError> {
    std::fs::read_to_string(path).map_err(|e| AutofillError::io(path, e))
}

fn to_pretty_json<T: serde::Serialize>(value: &T, context: &str) -> Result<String, AutofillError> {
    serde_json::to_string_pretty(value).map_err(|e| AutofillError::json(context, e))
}

/// Static answers file first, then the configured HTTP endpoint.
pub fn build_service(
    answers: Option<&str>,
    endpoint: Option<&str>,
    config: &AppConfig,
) -> Result<Box<dyn AnswerService>, AutofillError> {
    if let Some(path) = answers {
        return Ok(Box::new(StaticAnswerService::load(path)?));
    }
    let endpoint = endpoint
        .or(config.answer_service.endpoint.as_deref())
        .ok_or(AutofillError::NoAnswerService)?;
    let timeout = Duration::from_secs(config.answer_service.timeout_secs);
    Ok(Box::new(HttpAnswerService::new(endpoint, timeout)?))
}

fn build_engine(service: Box<dyn AnswerService>, config: &AppConfig) -> AutofillEngine {
    AutofillEngine::new(service, config.engine_settings())
        .with_tracer(TraceLogger::from_path(config.trace_path.as_deref()))
}

// ============================================================================
// detect subcommand
// ============================================================================

pub fn cmd_detect(html_path: &str, url: &str) -> Result<(), AutofillError> {
    let page = StaticPage::from_html(url, &read_html(html_path)?);
    let record = detect_forms(page.document(), url);

    if record.is_empty() {
        eprintln!("No application form detected in {}", html_path);
    }
    println!("{}", to_pretty_json(&record, "DetectionRecord")?);
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Run one session and return whether every required field resolved.
pub fn cmd_fill(
    html_path: &str,
    url: &str,
    answers: Option<&str>,
    out: Option<&str>,
    advance: bool,
    endpoint: Option<&str>,
    config: &AppConfig,
) -> Result<bool, AutofillError> {
    let mut page = StaticPage::from_html(url, &read_html(html_path)?);
    let engine = build_engine(build_service(answers, endpoint, config)?, config);

    let result = engine.run_session(&mut page, advance);

    if let Some(out_path) = out {
        std::fs::write(out_path, page.document().to_html()).map_err(|e| AutofillError::io(out_path, e))?;
        info!(path = out_path, "Filled page written");
    }

    match result {
        Ok(report) => {
            println!("{}", to_pretty_json(&report, "SessionReport")?);
            Ok(report.is_resolved())
        }
        Err(abort) => {
            eprintln!("Session aborted: {}", abort.error);
            println!("{}", to_pretty_json(&*abort.partial, "SessionReport")?);
            Err(abort.error)
        }
    }
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(auto: bool, endpoint: Option<&str>, config: &AppConfig) -> Result<(), AutofillError> {
    let engine = build_engine(build_service(None, endpoint, config)?, config);

    let scheduler = RescanScheduler::new(config.scheduler.clone());

    let store: Box<dyn KeyValueStore> = match config.store_path.as_deref() {
        Some(path) => Box::new(FileStore::open(path)?),
        None => Box::new(MemoryStore::new()),
    };

    let mut controller = HostController::new(engine, scheduler, store)?;
    // The flag is applied after stored preferences, so it wins over them.
    if auto {
        controller.set_auto_mode(Some(true))?;
    }
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(&mut controller, stdin.lock(), stdout.lock())?;
    Ok(())
}
