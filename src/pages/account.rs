//! Account page.
//!
//! Asks the external authenticator to add an account as soon as it is shown.
//! The authenticator call runs on a worker and hands back the intent of its
//! own screens, which the host then starts as the `setup_account` sub-flow.

use std::sync::Arc;

use crate::error::Result;
use crate::host::Platform;
use crate::page::{
    default_action, Direction, PageAction, PageBody, PageContext, PageHandler, PageTitles,
};
use crate::subflow::account::{AccountOptions, Authenticator, AuthenticatorResponse};
use crate::subflow::{ExternalResult, RequestId, Resolution, SubFlow, WorkerResult};

/// Account page handler. Hidden while no authenticator is available.
pub struct AccountPage {
    authenticator: Arc<dyn Authenticator>,
    flow: SubFlow,
}

impl AccountPage {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            flow: SubFlow::new(),
        }
    }

    pub fn flow(&self) -> SubFlow {
        self.flow
    }

    fn resolve(&mut self, resolution: Resolution, ctx: &mut PageContext<'_>) {
        self.flow.finish(resolution);
        match resolution {
            Resolution::Advance => ctx.advance(),
            Resolution::Retreat => ctx.retreat(),
        }
    }
}

impl PageHandler for AccountPage {
    fn render(&self, _titles: &PageTitles, _action: PageAction) -> PageBody {
        PageBody::Loading
    }

    fn on_action(&mut self, action: PageAction, ctx: &mut PageContext<'_>) {
        match action {
            // Coming back from a later page: the account flow already ran
            PageAction::Load if ctx.direction() == Direction::Backward => {
                self.resolve(Resolution::Retreat, ctx);
            }
            PageAction::Load => {
                self.flow.reset();
                self.flow.begin_work();
                let authenticator = Arc::clone(&self.authenticator);
                ctx.run_worker(move || {
                    WorkerResult::Account(authenticator.add_account(AccountOptions::first_run()))
                });
            }
            other => default_action(other, ctx),
        }
    }

    fn on_worker_result(&mut self, result: WorkerResult, ctx: &mut PageContext<'_>) -> bool {
        let WorkerResult::Account(response) = result else {
            return false;
        };
        if !self.flow.take_work() {
            return false;
        }

        match response {
            Ok(AuthenticatorResponse::Intent(intent)) => {
                self.flow.dispatch(RequestId::ACCOUNT);
                ctx.start_external_flow(RequestId::ACCOUNT, intent);
            }
            Ok(AuthenticatorResponse::InProgress) => {
                tracing::info!("Authenticator is handling the account add itself");
            }
            Err(e) => {
                tracing::warn!("Account add failed, skipping: {}", e);
                self.resolve(Resolution::Advance, ctx);
            }
        }
        true
    }

    fn on_external_result(&mut self, result: &ExternalResult, ctx: &mut PageContext<'_>) -> bool {
        if result.request != RequestId::ACCOUNT || !self.flow.take(RequestId::ACCOUNT) {
            return false;
        }

        tracing::info!("Account flow returned {}", result.status);
        if result.status.is_success() && self.authenticator.account_exists() {
            ctx.complete();
        }
        self.resolve(result.status.resolution(), ctx);
        true
    }

    fn is_hidden(&self, _platform: &dyn Platform) -> bool {
        !self.authenticator.is_available()
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.flow).ok()
    }

    fn load(&mut self, extra: &serde_json::Value) -> Result<()> {
        self.flow = serde_json::from_value(extra.clone())?;
        Ok(())
    }
}
