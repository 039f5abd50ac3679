//! Subcommand handlers.
//!
//! Every handler drives the same controller a graphical front-end would use;
//! the location lives in memory for the duration of the command.

use std::sync::Arc;

use jobdesk::models::{CreateJobForm, ProcessingOptions};
use jobdesk::query::{ParamPatch, QueryString, ViewState};
use jobdesk::watcher::DEFAULT_POLL_INTERVAL;
use jobdesk::{
    load_config, load_default_config, AssumeYes, Config, ConfirmPrompt, ControllerOptions,
    HttpJobsApi, JobWatcher, JobsApi, JobsController, MemoryLocation, MutationOutcome,
};

use crate::args::{Cli, CreateArgs, ListArgs};
use crate::error::{CliError, Result};
use crate::output::{render_job, render_list, render_notification};
use crate::prompt::StdinPrompt;

pub struct Context {
    config: Config,
    api: Arc<HttpJobsApi>,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => load_config(path)?,
            None => load_default_config()?,
        };
        if let Some(url) = &cli.api_url {
            log::debug!("Using API URL from command line: {}", url);
            config.api.base_url = url.clone();
        }
        let api = Arc::new(HttpJobsApi::new(&config.api)?);
        Ok(Self { config, api })
    }

    fn controller(&self, location: MemoryLocation) -> JobsController {
        JobsController::new(
            self.api.clone(),
            Arc::new(location),
            ControllerOptions::from(&self.config.jobs),
        )
    }
}

/// Canonical query string for the `list` filter flags.
fn query_from_flags(args: &ListArgs) -> String {
    let state = ViewState {
        search: args.search.clone().unwrap_or_default(),
        status: args.status.into(),
        job_type: args.job_type.into(),
        project: args.project.clone().into(),
        page: args.page.unwrap_or(1),
    };
    let patch: ParamPatch = state.to_patch();
    let mut query = QueryString::new();
    patch.apply_to(&mut query);
    query.to_string()
}

pub async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let query = match &args.query {
        Some(raw) => raw.clone(),
        None => query_from_flags(&args),
    };
    let mut controller = ctx.controller(MemoryLocation::from_query(&query));

    if let Some(handle) = controller.mount() {
        if let Err(e) = handle.await {
            log::error!("Jobs fetch did not complete: {}", e);
        }
    }

    let view = controller.view();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_list(&view));
    }

    match view.error {
        Some(error) => Err(CliError::List(error.message)),
        None => Ok(()),
    }
}

pub async fn show(ctx: &Context, id: &str, watch: bool) -> Result<()> {
    let job = ctx.api.get_job(id).await?;
    print!("{}", render_job(&job));
    if !watch || job.is_finished() {
        return Ok(());
    }

    let watcher = JobWatcher::spawn(ctx.api.clone(), id, DEFAULT_POLL_INTERVAL);
    let mut updates = watcher.subscribe();
    let mut last = (job.status, job.progress_percent());

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if let Some(job) = &snapshot.job {
            let current = (job.status, job.progress_percent());
            if current != last {
                println!("  -> {} {}%", current.0, current.1);
                last = current;
            }
        }
        if snapshot.finished {
            break;
        }
    }

    let snapshot = watcher.finished().await;
    match (snapshot.job, snapshot.error) {
        (_, Some(error)) => Err(CliError::List(error.message)),
        (Some(job), None) => {
            print!("\n{}", render_job(&job));
            Ok(())
        }
        (None, None) => Ok(()),
    }
}

pub async fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let form = CreateJobForm {
        name: args.name,
        job_type: args.job_type,
        project_id: args.project,
        source: args.source.into(),
        source_value: args.from,
        options: ProcessingOptions {
            extract_text: !args.no_extract_text,
            generate_summary: args.summary,
            detect_language: !args.no_detect_language,
        },
    };

    let mut controller = ctx.controller(MemoryLocation::new());
    controller.open_create_dialog();
    let outcome = controller.submit_create(form).await;
    if let MutationOutcome::Succeeded(job) = &outcome {
        println!("{}", job.id);
    }
    report(&controller, outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Cancel,
    Retry,
}

/// Runs start, cancel or retry against `id`.
pub async fn job_action(ctx: &Context, action: JobAction, id: &str) -> Result<()> {
    let job = ctx.api.get_job(id).await?;
    let controller = ctx.controller(MemoryLocation::new());
    let outcome = match action {
        JobAction::Start => controller.start(&job).await,
        JobAction::Cancel => controller.cancel(&job).await,
        JobAction::Retry => controller.retry(&job).await,
    };
    report(&controller, outcome)
}

pub async fn delete(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    let job = ctx.api.get_job(id).await?;
    let prompt: Box<dyn ConfirmPrompt> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompt)
    };

    let controller = ctx.controller(MemoryLocation::new());
    let outcome = controller.delete(&job, prompt.as_ref()).await;
    report(&controller, outcome)
}

fn report<T>(controller: &JobsController, outcome: MutationOutcome<T>) -> Result<()> {
    match outcome {
        MutationOutcome::Succeeded(_) => {
            for notification in controller.notifier().recent() {
                println!("{}", render_notification(&notification));
            }
            Ok(())
        }
        MutationOutcome::Failed(error) => Err(error.into()),
        MutationOutcome::Declined => {
            println!("Nothing was changed.");
            Ok(())
        }
    }
}
