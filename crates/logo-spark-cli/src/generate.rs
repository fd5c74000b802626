use std::time::Duration;

use anyhow::{Context, bail};
use logo_stream::prelude::*;
use logo_stream::{AbortHandle, GalleryPhase};
use tracing::{info, warn};

use crate::cli::GenerateArgs;

pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let mut options = StreamOptions::default().completion(if args.last_flag {
        CompletionSignal::LastFlag
    } else {
        CompletionSignal::DoneEvent
    });
    options = options.idle_timeout(match args.idle_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    });
    if let Some(total) = args.total {
        options = options.total_logos(total);
    }

    let client = LogoClient::http(ClientConfig::from_env()?)?.with_options(options);
    let task = client
        .start_generation(&args.company)
        .await
        .with_context(|| format!("could not start generation for `{}`", args.company))?;
    info!(task_id = %task.id(), "generation started");

    let expected = args
        .total
        .map(|total| total as usize)
        .unwrap_or(DEFAULT_EXPECTED_TOTAL);
    let mut gallery = Gallery::new(task.first_image(), expected);
    println!("[1] {}", task.first_image());

    let mut stream = client.open_stream(task).await?;
    let abort = stream.abort_handle();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut streamed = 0usize;
    let mut cancelling = false;

    loop {
        let event = tokio::select! {
            event = stream.next_event() => event,
            signal = &mut ctrl_c, if !cancelling => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                cancelling = true;
                request_cancel(&mut gallery, &abort).await;
                continue;
            }
        };
        let Some(event) = event else {
            break;
        };

        gallery.apply(&event);
        if let StreamEvent::Logo { logo, .. } = &event {
            streamed += 1;
            println!("[{}] {}", logo.index + 1, logo.image);
        }
        if let Some(note) = gallery.take_notification() {
            println!("{note}");
        }
        println!("{}", gallery.status_line());

        if !cancelling
            && !event.is_terminal()
            && args.cancel_after.is_some_and(|limit| streamed >= limit)
        {
            cancelling = true;
            request_cancel(&mut gallery, &abort).await;
        }
    }

    for item in gallery.ordered_items() {
        println!("  #{:<2} {}", item.index + 1, item.image);
    }
    if let GalleryPhase::Failed { message } = gallery.phase() {
        bail!("generation failed: {message}");
    }
    Ok(())
}

async fn request_cancel(gallery: &mut Gallery, abort: &AbortHandle) {
    gallery.mark_cancelling();
    if let Some(note) = gallery.take_notification() {
        println!("{note}");
    }
    match abort.abort().await {
        AbortOutcome::Sent(ack) if !ack.confirmed => {
            warn!(task_id = %abort.task_id(), "service did not confirm the cancellation");
        }
        AbortOutcome::AlreadyFinished => {
            info!(task_id = %abort.task_id(), "generation finished before the cancellation");
            gallery.cancel_rejected();
        }
        outcome => info!(task_id = %abort.task_id(), ?outcome, "cancellation handled"),
    }
}
