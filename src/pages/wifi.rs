//! Network setup page.
//!
//! On `LOAD` the platform wifi picker is launched. When the picker returns
//! with a connection, a captive-portal probe runs on a worker; a captive
//! network sends the user through the portal login flow, and canceling that
//! flow brings the picker back.

use std::sync::Arc;

use crate::error::{Result, WizardError};
use crate::page::{default_action, PageAction, PageBody, PageContext, PageHandler, PageTitles};
use crate::subflow::probe::Prober;
use crate::subflow::{
    ExternalIntent, ExternalResult, RequestId, Resolution, ResultStatus, SubFlow, WorkerResult,
};

/// Network setup page handler.
///
/// Tracks one outstanding sub-flow at a time: the wifi picker, the probe
/// worker, or the captive portal login. A result for anything else is not
/// handled.
pub struct WifiSetupPage {
    prober: Arc<dyn Prober>,
    flow: SubFlow,
}

impl WifiSetupPage {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            flow: SubFlow::new(),
        }
    }

    /// Current sub-flow state, saved with the page.
    pub fn flow(&self) -> SubFlow {
        self.flow
    }

    fn launch_picker(&mut self, ctx: &mut PageContext<'_>) {
        self.flow.dispatch(RequestId::WIFI_PICKER);
        ctx.start_external_flow(
            RequestId::WIFI_PICKER,
            ExternalIntent::new(ExternalIntent::PICK_WIFI)
                .with_extra("firstRun", "true")
                .with_extra("showSkip", "true"),
        );
    }

    fn check_captive_portal(&mut self, ctx: &mut PageContext<'_>) {
        self.flow.begin_work();
        let prober = Arc::clone(&self.prober);
        ctx.run_worker(move || WorkerResult::CaptivePortal(prober.probe()));
    }

    fn resolve(&mut self, resolution: Resolution, ctx: &mut PageContext<'_>) {
        self.flow.finish(resolution);
        match resolution {
            Resolution::Advance => ctx.advance(),
            Resolution::Retreat => ctx.retreat(),
        }
    }
}

impl PageHandler for WifiSetupPage {
    fn render(&self, _titles: &PageTitles, _action: PageAction) -> PageBody {
        PageBody::Loading
    }

    fn on_action(&mut self, action: PageAction, ctx: &mut PageContext<'_>) {
        match action {
            PageAction::Load => {
                self.flow.reset();
                self.launch_picker(ctx);
            }
            other => default_action(other, ctx),
        }
    }

    fn on_external_result(&mut self, result: &ExternalResult, ctx: &mut PageContext<'_>) -> bool {
        match result.request {
            RequestId::WIFI_PICKER => {
                if !self.flow.take(RequestId::WIFI_PICKER) {
                    return false;
                }
                match result.status {
                    ResultStatus::Canceled => self.resolve(Resolution::Retreat, ctx),
                    status if status.is_success() => self.check_captive_portal(ctx),
                    _ => self.resolve(Resolution::Advance, ctx),
                }
                true
            }
            RequestId::CAPTIVE_PORTAL => {
                if !self.flow.take(RequestId::CAPTIVE_PORTAL) {
                    return false;
                }
                match result.status {
                    ResultStatus::Canceled => {
                        tracing::info!("Captive portal login canceled, back to the network picker");
                        self.launch_picker(ctx);
                    }
                    status => {
                        if status.is_success() {
                            ctx.complete();
                        }
                        self.resolve(Resolution::Advance, ctx);
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn on_worker_result(&mut self, result: WorkerResult, ctx: &mut PageContext<'_>) -> bool {
        let WorkerResult::CaptivePortal(verdict) = result else {
            return false;
        };
        if !self.flow.take_work() {
            return false;
        }

        tracing::info!("Captive portal probe: {}", verdict);
        if verdict.is_captive() {
            self.flow.dispatch(RequestId::CAPTIVE_PORTAL);
            ctx.start_external_flow(
                RequestId::CAPTIVE_PORTAL,
                ExternalIntent::new(ExternalIntent::CAPTIVE_PORTAL_LOGIN),
            );
        } else {
            ctx.complete();
            self.resolve(Resolution::Advance, ctx);
        }
        true
    }

    fn on_flow_unavailable(
        &mut self,
        request: RequestId,
        error: &WizardError,
        ctx: &mut PageContext<'_>,
    ) {
        tracing::warn!("Skipping network setup, {} unavailable: {}", request, error);
        self.resolve(Resolution::Advance, ctx);
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.flow).ok()
    }

    fn load(&mut self, extra: &serde_json::Value) -> Result<()> {
        self.flow = serde_json::from_value(extra.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryPlatform;
    use crate::page::Direction;
    use crate::subflow::probe::ProbeVerdict;
    use crate::subflow::SubFlowState;

    struct Fixed(ProbeVerdict);

    impl Prober for Fixed {
        fn probe(&self) -> ProbeVerdict {
            self.0
        }
    }

    fn page(verdict: ProbeVerdict) -> WifiSetupPage {
        WifiSetupPage::new(Arc::new(Fixed(verdict)))
    }

    fn picker(status: ResultStatus) -> ExternalResult {
        ExternalResult::new(RequestId::WIFI_PICKER, status)
    }

    #[test]
    fn test_load_launches_picker() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        let mut ctx = PageContext::new(Direction::Forward, &platform);
        page.on_action(PageAction::Load, &mut ctx);

        assert!(page.flow().is_awaiting(RequestId::WIFI_PICKER));
        assert_eq!(
            ctx.effect_names(),
            vec!["StartExternalFlow(setup_wifi(0), setupwizard.action.PICK_WIFI)"]
        );
    }

    #[test]
    fn test_picker_ok_runs_probe() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));

        let mut ctx = PageContext::new(Direction::Forward, &platform);
        assert!(page.on_external_result(&picker(ResultStatus::Ok), &mut ctx));
        assert_eq!(ctx.effect_names(), vec!["RunWorker"]);
        assert!(page.flow().is_working());
    }

    #[test]
    fn test_picker_cancel_retreats_and_duplicate_is_ignored() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));

        let mut ctx = PageContext::new(Direction::Forward, &platform);
        assert!(page.on_external_result(&picker(ResultStatus::Canceled), &mut ctx));
        assert!(!page.on_external_result(&picker(ResultStatus::Canceled), &mut ctx));
        assert_eq!(ctx.effect_names(), vec!["Retreat"]);
        assert_eq!(page.flow().state(), SubFlowState::Retreating);
    }

    #[test]
    fn test_open_network_completes_and_advances() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));
        page.on_external_result(
            &picker(ResultStatus::Ok),
            &mut PageContext::new(Direction::Forward, &platform),
        );

        let mut ctx = PageContext::new(Direction::Forward, &platform);
        assert!(page.on_worker_result(WorkerResult::CaptivePortal(ProbeVerdict::Unreachable), &mut ctx));
        assert_eq!(ctx.effect_names(), vec!["Complete", "Advance"]);
    }

    #[test]
    fn test_captive_network_launches_portal_then_picker_on_cancel() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Captive { status: 200 });
        page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));
        page.on_external_result(
            &picker(ResultStatus::Ok),
            &mut PageContext::new(Direction::Forward, &platform),
        );

        let mut ctx = PageContext::new(Direction::Forward, &platform);
        page.on_worker_result(
            WorkerResult::CaptivePortal(ProbeVerdict::Captive { status: 200 }),
            &mut ctx,
        );
        assert!(page.flow().is_awaiting(RequestId::CAPTIVE_PORTAL));

        let mut ctx = PageContext::new(Direction::Forward, &platform);
        let portal = ExternalResult::new(RequestId::CAPTIVE_PORTAL, ResultStatus::Canceled);
        assert!(page.on_external_result(&portal, &mut ctx));
        assert!(page.flow().is_awaiting(RequestId::WIFI_PICKER));
        assert_eq!(ctx.effect_names().len(), 1);
    }

    #[test]
    fn test_worker_result_without_pending_probe_is_ignored() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        let mut ctx = PageContext::new(Direction::Forward, &platform);
        assert!(!page.on_worker_result(WorkerResult::CaptivePortal(ProbeVerdict::Open), &mut ctx));
        assert!(ctx.effect_names().is_empty());
    }

    #[test]
    fn test_flow_state_survives_save_load() {
        let platform = MemoryPlatform::new();
        let mut page = page(ProbeVerdict::Open);
        page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));

        let saved = page.save().unwrap();
        let mut restored = WifiSetupPage::new(Arc::new(Fixed(ProbeVerdict::Open)));
        restored.load(&saved).unwrap();
        assert!(restored.flow().is_awaiting(RequestId::WIFI_PICKER));
    }
}
