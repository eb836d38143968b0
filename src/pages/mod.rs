//! Built-in pages and the standard page set.

pub mod account;
pub mod other_settings;
pub mod settings_dialog;
pub mod wifi;

use std::sync::Arc;

use crate::config::SETTING_AUTO_TIME;
use crate::error::Result;
use crate::host::Platform;
use crate::page::{res, Page, PageTitles};
use crate::registry::PageRegistry;
use crate::subflow::account::Authenticator;
use crate::subflow::probe::Prober;
use crate::subflow::ExternalIntent;

pub use account::AccountPage;
pub use other_settings::{OtherSettings, OtherSettingsPage};
pub use settings_dialog::SettingsDialogPage;
pub use wifi::WifiSetupPage;

/// Stable page keys.
pub mod keys {
    pub const WELCOME: &str = "welcome";
    pub const WIFI_SETUP: &str = "wifi_setup";
    pub const ACCOUNT: &str = "account";
    pub const DATE_TIME: &str = "date_time";
    pub const OTHER_SETTINGS: &str = "other_settings";
    pub const FINISH: &str = "finish";
}

/// Intent action of the system date and time screen.
pub const ACTION_DATE_SETTINGS: &str = "setupwizard.action.DATE_SETTINGS";

/// Collaborators the standard pages need.
#[derive(Clone)]
pub struct PageDeps {
    pub platform: Arc<dyn Platform>,
    pub prober: Arc<dyn Prober>,
    pub authenticator: Arc<dyn Authenticator>,
}

pub fn welcome_page() -> Page {
    Page::simple(keys::WELCOME, PageTitles::new(res::WELCOME))
}

pub fn wifi_setup_page(prober: Arc<dyn Prober>) -> Page {
    Page::new(
        keys::WIFI_SETUP,
        PageTitles::skippable(res::LOADING),
        Box::new(WifiSetupPage::new(prober)),
    )
}

pub fn account_page(authenticator: Arc<dyn Authenticator>) -> Page {
    Page::new(
        keys::ACCOUNT,
        PageTitles::skippable(res::LOADING),
        Box::new(AccountPage::new(authenticator)),
    )
}

/// Date and time screen, hidden while the clock is set from the network.
pub fn date_time_page() -> Page {
    Page::new(
        keys::DATE_TIME,
        PageTitles::skippable(res::DATE_TIME),
        Box::new(
            SettingsDialogPage::new(ExternalIntent::new(ACTION_DATE_SETTINGS))
                .hidden_when(SETTING_AUTO_TIME, "1"),
        ),
    )
}

pub fn other_settings_page(platform: &dyn Platform) -> Page {
    Page::new(
        keys::OTHER_SETTINGS,
        PageTitles::new(res::SETUP_OTHER),
        Box::new(OtherSettingsPage::from_platform(platform)),
    )
}

pub fn finish_page() -> Page {
    Page::simple(keys::FINISH, PageTitles::new(res::FINISH).with_next(res::START))
}

/// Welcome, network, account, date/time, other settings, finish.
pub fn standard_registry(deps: &PageDeps) -> Result<PageRegistry> {
    PageRegistry::new(vec![
        welcome_page(),
        wifi_setup_page(Arc::clone(&deps.prober)),
        account_page(Arc::clone(&deps.authenticator)),
        date_time_page(),
        other_settings_page(deps.platform.as_ref()),
        finish_page(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryPlatform;
    use crate::subflow::account::NoAuthenticator;
    use crate::subflow::probe::ProbeVerdict;

    struct OpenNetwork;

    impl Prober for OpenNetwork {
        fn probe(&self) -> ProbeVerdict {
            ProbeVerdict::Open
        }
    }

    fn deps(platform: MemoryPlatform) -> PageDeps {
        PageDeps {
            platform: Arc::new(platform),
            prober: Arc::new(OpenNetwork),
            authenticator: Arc::new(NoAuthenticator),
        }
    }

    #[test]
    fn test_standard_registry_order() {
        let registry = standard_registry(&deps(MemoryPlatform::new())).unwrap();
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(
            keys,
            vec![
                keys::WELCOME,
                keys::WIFI_SETUP,
                keys::ACCOUNT,
                keys::DATE_TIME,
                keys::OTHER_SETTINGS,
                keys::FINISH
            ]
        );
    }

    #[test]
    fn test_hidden_pages_without_authenticator_or_with_auto_time() {
        let platform = MemoryPlatform::new().with_setting(SETTING_AUTO_TIME, "1");
        let deps = deps(platform);
        let registry = standard_registry(&deps).unwrap();

        let hidden: Vec<&str> = registry
            .iter()
            .filter(|p| p.is_hidden(deps.platform.as_ref()))
            .map(|p| p.key())
            .collect();
        assert_eq!(hidden, vec![keys::ACCOUNT, keys::DATE_TIME]);
    }

    #[test]
    fn test_finish_page_labels() {
        let page = finish_page();
        assert_eq!(page.next_button_title_id(), res::START);
        assert_eq!(wifi_setup_page(Arc::new(OpenNetwork)).next_button_title_id(), res::SKIP);
    }
}
