use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::settings::RenewalConfig;
use crate::helpers::time::{get_instant, now_i64};
use crate::oauth::exchanger::TokenExchanger;
use crate::observability::metrics::get_metrics;
use crate::store::{Binding, CredentialStore};
use crate::workflow::error::RenewalFailure;

static RENEWED_MSG: &str = "renewed";

/// What to do with a rotated refresh token when the probe fails
#[derive(Debug, Clone, Copy, Default)]
pub struct RenewalPolicy {
    pub keep_rotated_on_probe_failure: bool,
}

impl From<&RenewalConfig> for RenewalPolicy {
    fn from(cfg: &RenewalConfig) -> Self {
        Self { keep_rotated_on_probe_failure: cfg.keep_rotated_on_probe_failure }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed,
    Failed {
        kind: RenewalFailure,
        detail: String,
        /// the rotated refresh token was persisted despite the failure
        rotated_kept: bool,
    },
}

impl RenewalOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, RenewalOutcome::Renewed)
    }

    fn label(&self) -> &'static str {
        match self {
            RenewalOutcome::Renewed => RENEWED_MSG,
            RenewalOutcome::Failed { kind, .. } => kind.as_str(),
        }
    }

    fn failed(kind: RenewalFailure, detail: impl ToString) -> Self {
        RenewalOutcome::Failed { kind, detail: detail.to_string(), rotated_kept: false }
    }
}

#[derive(Debug, Clone)]
pub struct RenewalRecord {
    pub binding_id: u64,
    pub subject_id: String,
    pub display_alias: String,
    pub outcome: RenewalOutcome,
}

/// Per-binding results of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub started_at: i64,
    pub finished_at: i64,
    pub records: Vec<RenewalRecord>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_renewed()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }
}

/// Walks every stored binding once per trigger: refresh, probe, persist.
///
/// Bindings are handled one after another; a failure is recorded and the
/// cycle moves on, the failed binding keeps its stored state.
pub struct RenewalScheduler<S> {
    exchanger: TokenExchanger,
    store: Arc<S>,
    policy: RenewalPolicy,
}

impl<S: CredentialStore> RenewalScheduler<S> {
    pub fn new(exchanger: TokenExchanger, store: Arc<S>, policy: RenewalPolicy) -> Self {
        Self { exchanger, store, policy }
    }

    /// Fails only when the store cannot be read at all.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let started_at = now_i64();
        info!("----renewal cycle begin----");

        let bindings = self.store.query_all().await?;
        metrics.stored_bindings.set(bindings.len() as i64);

        let mut records = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let outcome = self.renew(&binding).await;
            match &outcome {
                RenewalOutcome::Renewed => info!("{} renew ok", binding.subject_id),
                RenewalOutcome::Failed { kind, detail, rotated_kept } => warn!(
                    "{} renew error: {}: {} (rotated token kept: {})",
                    binding.subject_id, kind, detail, rotated_kept
                ),
            }
            metrics.renewal_outcomes.with_label_values(&[outcome.label()]).inc();
            records.push(RenewalRecord {
                binding_id: binding.id,
                subject_id: binding.subject_id,
                display_alias: binding.display_alias,
                outcome,
            });
        }

        let report = CycleReport { started_at, finished_at: now_i64(), records };
        metrics.renewal_cycles.inc();
        metrics.renewal_cycle_duration.observe(start.elapsed().as_secs_f64());
        metrics.last_cycle_unix.set(report.finished_at);
        info!(
            "----renewal cycle end---- renewed {}, failed {}",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    async fn renew(&self, binding: &Binding) -> RenewalOutcome {
        let tokens = match self
            .exchanger
            .exchange_refresh(&binding.refresh_token, &binding.client_id, &binding.client_secret)
            .await
        {
            Ok(tokens) => tokens,
            Err(err) => return RenewalOutcome::failed(RenewalFailure::Refresh, err),
        };

        // keep the stored token when the provider did not rotate it
        let rotated = if tokens.refresh_token.is_empty() {
            binding.refresh_token.clone()
        } else {
            tokens.refresh_token
        };

        let probe_path = &self.exchanger.provider().probe_path;
        let probe = self
            .exchanger
            .fetch_resource(&tokens.access_token, probe_path)
            .await
            .map_err(|err| err.to_string())
            .and_then(|body| probe_confirmed(&body));
        if let Err(detail) = probe {
            let rotated_kept = self.policy.keep_rotated_on_probe_failure
                && rotated != binding.refresh_token
                && self.keep_rotated(binding, rotated).await;
            return RenewalOutcome::Failed { kind: RenewalFailure::Probe, detail, rotated_kept };
        }

        match self.store.update(&binding.renewed(rotated, now_i64())).await {
            Ok(()) => RenewalOutcome::Renewed,
            Err(err) => RenewalOutcome::failed(RenewalFailure::Persist, format!("{:#}", err)),
        }
    }

    /// Persists only the rotated token, the success timestamp stays as is.
    async fn keep_rotated(&self, binding: &Binding, rotated: String) -> bool {
        let updated = Binding { refresh_token: rotated, ..binding.clone() };
        match self.store.update(&updated).await {
            Ok(()) => true,
            Err(err) => {
                error!("{} keeping rotated token failed: {:#}", binding.subject_id, err);
                false
            }
        }
    }

    /// Timer trigger: one cycle every `interval`, forever.
    pub async fn loop_renewals(&self, interval: Duration, run_on_start: bool) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !run_on_start {
            // the first tick of an interval completes immediately
            ticker.tick().await;
        }
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_cycle().await {
                error!("renewal cycle aborted: {:#}", err);
            }
            info!("next renewal cycle in {} seconds", interval.as_secs());
        }
    }
}

/// A mailbox listing names its OData context; a 2xx without one came from something else.
fn probe_confirmed(body: &str) -> Result<(), String> {
    let context = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("@odata.context").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_default();
    match context.is_empty() {
        true => Err("probe response carries no @odata.context".to_owned()),
        false => Ok(()),
    }
}
