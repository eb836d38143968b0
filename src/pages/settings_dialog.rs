//! Page fronting a system settings screen.
//!
//! The screen is launched on `LOAD`; whatever it returns, the wizard moves
//! on.

use crate::error::{Result, WizardError};
use crate::host::Platform;
use crate::page::{
    default_action, Direction, PageAction, PageBody, PageContext, PageHandler, PageTitles,
};
use crate::subflow::{ExternalIntent, ExternalResult, RequestId, Resolution, SubFlow, SubFlowState};

pub struct SettingsDialogPage {
    intent: ExternalIntent,
    hidden_when: Option<(&'static str, &'static str)>,
    flow: SubFlow,
}

impl SettingsDialogPage {
    pub fn new(intent: ExternalIntent) -> Self {
        Self {
            intent,
            hidden_when: None,
            flow: SubFlow::new(),
        }
    }

    /// Hide the page while platform setting `name` equals `value`.
    pub fn hidden_when(mut self, name: &'static str, value: &'static str) -> Self {
        self.hidden_when = Some((name, value));
        self
    }

    pub fn flow(&self) -> SubFlow {
        self.flow
    }
}

impl PageHandler for SettingsDialogPage {
    fn render(&self, titles: &PageTitles, _action: PageAction) -> PageBody {
        match self.flow.state() {
            SubFlowState::Dispatching(_) => PageBody::Loading,
            _ => PageBody::Text(titles.title),
        }
    }

    fn on_action(&mut self, action: PageAction, ctx: &mut PageContext<'_>) {
        match action {
            PageAction::Load if ctx.direction() == Direction::Backward => {
                self.flow.finish(Resolution::Retreat);
                ctx.retreat();
            }
            PageAction::Load => {
                self.flow.dispatch(RequestId::SYSTEM_SETTINGS);
                ctx.start_external_flow(RequestId::SYSTEM_SETTINGS, self.intent.clone());
            }
            other => default_action(other, ctx),
        }
    }

    fn on_external_result(&mut self, result: &ExternalResult, ctx: &mut PageContext<'_>) -> bool {
        if result.request != RequestId::SYSTEM_SETTINGS || !self.flow.take(RequestId::SYSTEM_SETTINGS) {
            return false;
        }
        tracing::debug!("Settings screen returned {}", result.status);
        ctx.complete();
        self.flow.finish(Resolution::Advance);
        ctx.advance();
        true
    }

    fn on_flow_unavailable(
        &mut self,
        request: RequestId,
        error: &WizardError,
        ctx: &mut PageContext<'_>,
    ) {
        tracing::warn!("Settings screen {} unavailable: {}", request, error);
        self.flow.finish(Resolution::Advance);
        ctx.advance();
    }

    fn is_hidden(&self, platform: &dyn Platform) -> bool {
        self.hidden_when
            .is_some_and(|(name, value)| platform.get_setting(name).as_deref() == Some(value))
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
    use crate::page::res;
    use crate::subflow::ResultStatus;

    fn page() -> SettingsDialogPage {
        SettingsDialogPage::new(ExternalIntent::new("settings.DATE")).hidden_when("auto_time", "1")
    }

    #[test]
    fn test_any_result_advances() {
        let platform = MemoryPlatform::new();
        for status in [ResultStatus::Ok, ResultStatus::Canceled, ResultStatus::Other(9)] {
            let mut page = page();
            page.on_action(PageAction::Load, &mut PageContext::new(Direction::Forward, &platform));
            assert_eq!(
                page.render(&PageTitles::new(res::DATE_TIME), PageAction::Next),
                PageBody::Loading
            );

            let mut ctx = PageContext::new(Direction::Forward, &platform);
            let result = ExternalResult::new(RequestId::SYSTEM_SETTINGS, status);
            assert!(page.on_external_result(&result, &mut ctx));
            assert_eq!(ctx.effect_names(), vec!["Complete", "Advance"]);
        }
    }

    #[test]
    fn test_backward_entry_retreats() {
        let platform = MemoryPlatform::new();
        let mut page = page();
        let mut ctx = PageContext::new(Direction::Backward, &platform);
        page.on_action(PageAction::Load, &mut ctx);
        assert_eq!(ctx.effect_names(), vec!["Retreat"]);
    }

    #[test]
    fn test_hidden_by_setting() {
        let page = page();
        assert!(!page.is_hidden(&MemoryPlatform::new()));
        assert!(page.is_hidden(&MemoryPlatform::new().with_setting("auto_time", "1")));
    }
}
