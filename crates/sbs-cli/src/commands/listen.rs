use std::time::Duration;

use sbs_client::{ApiClient, ClientError, ListenSession};
use sbs_config::SbsConfig;
use sbs_core::listen::{ListenBatch, ResumeState};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ListenArgs;
use crate::output::line;

/// Handle `sbs listen`.
///
/// Prints each fresh event, then each presence change, as one JSON line.
/// Poll timeouts re-poll immediately, rate limits wait out `Retry-After`,
/// other transient failures wait `listen.retry_delay_secs`.
pub async fn handle(
    args: &ListenArgs,
    config: &SbsConfig,
    _flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = ApiClient::new(config)?;
    let mut session = ListenSession::new(client, initial_state(args, config));
    if let Some(status) = &args.status {
        let chains = session.state().chains().to_vec();
        for chain in chains {
            session.state_mut().set_status(chain, status.clone());
        }
    }

    let mut polls = 0_u32;
    while args.polls.is_none_or(|max| polls < max) {
        let outcome = tokio::select! {
            outcome = session.poll() => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(outcome) = outcome else {
            tracing::info!(last_id = session.state().last_id(), "interrupted");
            break;
        };
        polls += 1;

        match outcome {
            Ok(batch) => print_batch(&batch)?,
            Err(error) => {
                let Some(delay) = backoff(&error, config) else {
                    return Err(error.into());
                };
                tracing::warn!(%error, delay_secs = delay.as_secs(), "listen poll failed, retrying");
                if !wait_or_interrupt(delay, tokio::signal::ctrl_c()).await {
                    tracing::info!(last_id = session.state().last_id(), "interrupted");
                    break;
                }
            }
        }
    }

    tracing::info!(
        last_id = session.state().last_id(),
        polls,
        "listen finished"
    );
    Ok(())
}

fn initial_state(args: &ListenArgs, config: &SbsConfig) -> ResumeState {
    let chains = if args.chains.is_empty() {
        config.listen.chains.clone()
    } else {
        args.chains.clone()
    };
    let state = ResumeState::new(chains);
    match args.last_id {
        Some(last_id) => state.with_last_id(last_id),
        None => state,
    }
}

/// How long to wait before re-polling, or `None` when the error is fatal.
fn backoff(error: &ClientError, config: &SbsConfig) -> Option<Duration> {
    match error {
        ClientError::PollTimeout => Some(Duration::ZERO),
        ClientError::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
        other if other.is_retryable() => Some(config.listen.retry_delay()),
        _ => None,
    }
}

/// Sleep for `delay` unless `interrupt` fires first. Returns `false` when
/// interrupted.
async fn wait_or_interrupt<F: std::future::Future>(delay: Duration, interrupt: F) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        _ = interrupt => false,
    }
}

fn print_batch(batch: &ListenBatch) -> anyhow::Result<()> {
    for event in &batch.fresh_events {
        line(event)?;
    }
    for change in &batch.presence {
        line(change)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(chains: &[&str], last_id: Option<i64>) -> ListenArgs {
        ListenArgs {
            chains: chains.iter().map(|c| (*c).to_string()).collect(),
            last_id,
            polls: None,
            status: None,
        }
    }

    #[test]
    fn chains_fall_back_to_config() {
        let mut config = SbsConfig::default();
        config.listen.chains = vec!["300".into()];

        let state = initial_state(&args(&[], None), &config);
        assert_eq!(state.chains(), ["300".to_string()]);
        assert_eq!(state.last_id(), 0);

        let state = initial_state(&args(&["7"], Some(99)), &config);
        assert_eq!(state.chains(), ["7".to_string()]);
        assert_eq!(state.last_id(), 99);
    }

    #[tokio::test]
    async fn interrupt_cuts_a_backoff_short() {
        let interrupted = wait_or_interrupt(
            Duration::from_secs(60),
            tokio::time::sleep(Duration::from_millis(10)),
        )
        .await;
        assert!(!interrupted);

        let waited =
            wait_or_interrupt(Duration::from_millis(10), std::future::pending::<()>()).await;
        assert!(waited);
    }

    #[test]
    fn backoff_policy() {
        let config = SbsConfig::default();
        assert_eq!(backoff(&ClientError::PollTimeout, &config), Some(Duration::ZERO));
        assert_eq!(
            backoff(&ClientError::RateLimited { retry_after_secs: 7 }, &config),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            backoff(
                &ClientError::Api {
                    status: 502,
                    message: String::new()
                },
                &config
            ),
            Some(config.listen.retry_delay())
        );
        assert_eq!(
            backoff(
                &ClientError::Unauthorized {
                    status: 401,
                    message: String::new()
                },
                &config
            ),
            None
        );
    }
}
