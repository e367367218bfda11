use apart_logging::{apart_debug, apart_info, apart_warn};

use crate::{
    AppState, Command, Effect, FinishedJob, JobEvent, JobKind, Message, Msg, StatusReport,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Worker(message) => handle_worker_message(&mut state, &message),
        Msg::WorkerExited { code } => {
            apart_info!("Worker exited with code {:?}", code);
            if state.begin_shutdown() {
                vec![Effect::Shutdown]
            } else {
                Vec::new()
            }
        }
        Msg::RestoreHistory(mut records) => {
            // Oldest first, so a newer record evicts the older ones it supersedes.
            records.sort_by_key(FinishedJob::finish);
            for record in records {
                state.finished_mut().insert(record);
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::StartClone {
            source,
            directory,
            name,
            compression,
        } => {
            if source.trim().is_empty() || directory.trim().is_empty() || name.trim().is_empty() {
                return (state, Vec::new());
            }
            vec![Effect::Send(Command::Clone {
                source,
                destination: directory,
                name,
                compression: compression.filter(|option| !option.is_empty()),
            })]
        }
        Msg::StartRestore { image, device } => {
            if image.trim().is_empty() || device.trim().is_empty() {
                return (state, Vec::new());
            }
            vec![Effect::Send(Command::Restore {
                source: image,
                destination: device,
            })]
        }
        Msg::CancelClicked { job_id } => match state.tracker_mut().request_cancel(&job_id) {
            Some(command) => {
                state.mark_dirty();
                vec![Effect::Send(command)]
            }
            None => Vec::new(),
        },
        Msg::RerunClicked { key } => {
            let Some(job) = state.finished().get(key) else {
                return (state, Vec::new());
            };
            let command = job.rerun_command();
            if job.forget_on_rerun() {
                state.finished_mut().remove(key);
                state.mark_dirty();
            }
            vec![Effect::Send(command)]
        }
        Msg::ForgetClicked { key } => {
            if state.finished_mut().remove(key).is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DeleteImageClicked { key } => state
            .finished()
            .get(key)
            .and_then(FinishedJob::delete_command)
            .map(Effect::Send)
            .into_iter()
            .collect(),
        Msg::RefreshSources => vec![Effect::Send(Command::StatusRequest)],
        Msg::NotificationsUnavailable => {
            state.notifications_mut().disable();
            Vec::new()
        }
        Msg::QuitRequested => {
            if state.begin_shutdown() {
                vec![Effect::Shutdown]
            } else {
                Vec::new()
            }
        }
        Msg::Tick => {
            if !state.tracker().is_idle() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn handle_worker_message(state: &mut AppState, message: &Message) -> Vec<Effect> {
    match message.message_type() {
        "status" => match StatusReport::parse(message) {
            Ok(report) => {
                let dying = message.is_status("dying");
                state.apply_status(report);
                if dying {
                    vec![Effect::Shutdown]
                } else {
                    Vec::new()
                }
            }
            Err(err) => {
                apart_warn!("Ignoring malformed status message: {}", err);
                Vec::new()
            }
        },
        "clone" | "restore" | "clone-failed" | "restore-failed" => {
            match state.tracker_mut().handle_message(message) {
                JobEvent::Created(_) | JobEvent::Updated(_) => {
                    state.mark_dirty();
                    Vec::new()
                }
                JobEvent::Finished(job) => on_job_finished(state, job),
                JobEvent::Ignored => Vec::new(),
            }
        }
        "deleted-clone" => {
            if let Some(file) = message.str_field("file") {
                let removed = state.finished_mut().remove_image(file);
                apart_debug!("Image {} deleted, dropped {} records", file, removed.len());
                state.mark_dirty();
            }
            Vec::new()
        }
        "delete-clone-failed" => vec![Effect::ReportFailure {
            title: "Failed to delete image".to_owned(),
            detail: format!(
                "{}: {}",
                message.str_field("file").unwrap_or("unknown file"),
                message.str_field("error").unwrap_or("unknown error")
            ),
        }],
        other => {
            apart_warn!("Ignoring unexpected {} message from worker", other);
            Vec::new()
        }
    }
}

fn on_job_finished(state: &mut AppState, job: FinishedJob) -> Vec<Effect> {
    let mut effects = Vec::new();
    if !job.is_success() && !job.is_cancelled() {
        let verb = match job.kind() {
            JobKind::Clone => "Clone",
            JobKind::Restore => "Restore",
        };
        effects.push(Effect::ReportFailure {
            title: format!("{verb} failed"),
            detail: format!("{}: {}", job.title(), job.error().unwrap_or_default()),
        });
    }

    let running = state.tracker().running_count();
    if let Some(digest) = state.notifications_mut().on_job_finished(&job, running) {
        effects.push(Effect::Notify(digest));
    }

    let evicted = state.finished_mut().insert(job);
    if !evicted.is_empty() {
        apart_debug!("History dropped {} similar records", evicted.len());
    }
    state.mark_dirty();
    effects
}
