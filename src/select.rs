//! Account and role resolution.
//!
//! Lists what the session may access, sorts it deterministically, and turns
//! the user's pick into an account/role pair. The interactive rendering is
//! not this crate's business: a [`Prompt`] collaborator receives the display
//! labels and the match predicate and returns the chosen index.

use crate::client::{AccountInfo, IdentityClient, RoleInfo};
use crate::{Result, Session};
use std::sync::Arc;
use tracing::info;

/// Interactive picker collaborator.
///
/// `select` receives display candidates and a predicate `(input, index) ->
/// bool` deciding whether the candidate at `index` matches the user's
/// current input; it returns the index of the final choice. `input` asks for
/// a free-form line with a default.
pub trait Prompt {
    fn select(
        &self,
        label: &str,
        candidates: &[String],
        matcher: &dyn Fn(&str, usize) -> bool,
    ) -> Result<usize>;

    fn input(&self, label: &str, default: &str) -> Result<String>;
}

/// Matches the user's input against a display label.
///
/// Input starting with `#` is a strict prefix match, so `#3` addresses the
/// third candidate directly. Anything else is a case-insensitive fuzzy
/// subsequence match.
pub fn match_label(input: &str, label: &str) -> bool {
    if input.starts_with('#') {
        label.starts_with(input)
    } else {
        fuzzy_matches(input, label)
    }
}

/// Case-insensitive subsequence match: every character of `needle` appears
/// in `haystack` in order.
fn fuzzy_matches(needle: &str, haystack: &str) -> bool {
    let mut haystack_chars = haystack.chars().flat_map(char::to_lowercase);
    needle
        .chars()
        .flat_map(char::to_lowercase)
        .all(|n| haystack_chars.any(|h| h == n))
}

/// Builds `"#<index> <name> <id>"` labels for the account picker.
pub fn account_labels(accounts: &[AccountInfo]) -> Vec<String> {
    accounts
        .iter()
        .enumerate()
        .map(|(i, a)| format!("#{i} {} {}", a.account_name, a.account_id))
        .collect()
}

/// Builds `"#<index> <name>"` labels for the role picker.
pub fn role_labels(roles: &[RoleInfo]) -> Vec<String> {
    roles
        .iter()
        .enumerate()
        .map(|(i, r)| format!("#{i} {}", r.role_name))
        .collect()
}

/// Resolves the target account and role for a valid session.
pub struct IdentitySelector {
    client: Arc<dyn IdentityClient>,
}

impl IdentitySelector {
    pub fn new(client: Arc<dyn IdentityClient>) -> Self {
        Self { client }
    }

    /// Lists the session's accounts, sorted by account name (case-sensitive
    /// ordinal order) so repeated invocations render identically.
    pub async fn list_accounts(&self, session: &Session) -> Result<Vec<AccountInfo>> {
        let mut accounts = self.client.list_accounts(&session.access_token).await?;
        accounts.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        Ok(accounts)
    }

    /// Lists the roles the session may assume in `account`.
    pub async fn list_roles(
        &self,
        session: &Session,
        account: &AccountInfo,
    ) -> Result<Vec<RoleInfo>> {
        self.client
            .list_account_roles(&session.access_token, &account.account_id)
            .await
    }

    /// Asks the prompt collaborator to pick one account.
    pub fn select_account<'a>(
        &self,
        accounts: &'a [AccountInfo],
        prompt: &dyn Prompt,
    ) -> Result<&'a AccountInfo> {
        if accounts.is_empty() {
            return Err(anyhow::anyhow!("no accounts are visible for this login").into());
        }

        let labels = account_labels(accounts);
        let matcher = |input: &str, index: usize| match_label(input, &labels[index]);
        let index = prompt.select(
            "Select your account - fuzzy search supported, enter #<n> to pick directly",
            &labels,
            &matcher,
        )?;

        let account = &accounts[index];
        info!(
            account = %account.account_name,
            id = %account.account_id,
            "selected account"
        );
        Ok(account)
    }

    /// Asks the prompt collaborator to pick one role. A single available
    /// role is selected without prompting.
    pub fn select_role<'a>(
        &self,
        roles: &'a [RoleInfo],
        prompt: &dyn Prompt,
    ) -> Result<&'a RoleInfo> {
        if roles.is_empty() {
            return Err(anyhow::anyhow!("no roles are available in this account").into());
        }

        if let [only] = roles {
            info!(role = %only.role_name, "only one role available, selecting it");
            return Ok(only);
        }

        let labels = role_labels(roles);
        let matcher = |input: &str, index: usize| match_label(input, &labels[index]);
        let index = prompt.select(
            "Select your role - fuzzy search supported, enter #<n> to pick directly",
            &labels,
            &matcher,
        )?;

        Ok(&roles[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockIdentityClient;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    fn session() -> Session {
        Session {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            client_secret_expires_at: 4_102_444_800,
            device_code: "code".to_string(),
            verification_uri_complete: "https://device.sso/verify".to_string(),
            access_token: "token".to_string(),
            access_token_expires_at: Utc::now() + Duration::hours(7),
            login_url: "https://example.awsapps.com/start".to_string(),
        }
    }

    /// Prompt that always picks a fixed index and records what it was shown.
    struct ScriptedPrompt {
        pick: usize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn new(pick: usize) -> Self {
            Self {
                pick,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn select(
            &self,
            _label: &str,
            candidates: &[String],
            _matcher: &dyn Fn(&str, usize) -> bool,
        ) -> Result<usize> {
            self.seen.lock().unwrap().extend(candidates.iter().cloned());
            Ok(self.pick)
        }

        fn input(&self, _label: &str, default: &str) -> Result<String> {
            Ok(default.to_string())
        }
    }

    #[tokio::test]
    async fn test_accounts_are_sorted_by_name() {
        let client = Arc::new(MockIdentityClient::new().with_accounts(vec![
            ("3", "zeta"),
            ("1", "alpha"),
            ("2", "beta"),
        ]));
        let selector = IdentitySelector::new(client);

        let accounts = selector.list_accounts(&session()).await.unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.account_name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_index_input_is_a_strict_prefix_match() {
        assert!(match_label("#1", "#1 alpha 111"));
        assert!(match_label("#1", "#12 alpha 111"));
        assert!(!match_label("#1", "#2 alpha 111"));
        // No fuzzy fallback for #-prefixed input.
        assert!(!match_label("#alpha", "#0 alpha 111"));
    }

    #[test]
    fn test_fuzzy_match_is_a_case_insensitive_subsequence() {
        assert!(match_label("zeta", "#2 Zeta 333"));
        assert!(match_label("zt3", "#2 Zeta 333"));
        assert!(!match_label("zetaq", "#2 Zeta 333"));
        assert!(match_label("", "#2 Zeta 333"));
    }

    #[test]
    fn test_select_account_shows_indexed_labels() {
        let selector = IdentitySelector::new(Arc::new(MockIdentityClient::new()));
        let accounts = vec![
            AccountInfo {
                account_id: "111".to_string(),
                account_name: "alpha".to_string(),
            },
            AccountInfo {
                account_id: "222".to_string(),
                account_name: "beta".to_string(),
            },
        ];
        let prompt = ScriptedPrompt::new(1);

        let picked = selector.select_account(&accounts, &prompt).unwrap();

        assert_eq!(picked.account_id, "222");
        let seen = prompt.seen.lock().unwrap();
        assert_eq!(seen[0], "#0 alpha 111");
        assert_eq!(seen[1], "#1 beta 222");
    }

    #[test]
    fn test_single_role_is_auto_selected() {
        let selector = IdentitySelector::new(Arc::new(MockIdentityClient::new()));
        let roles = vec![RoleInfo {
            role_name: "AdministratorAccess".to_string(),
        }];
        // A prompt that would panic if consulted.
        struct NoPrompt;
        impl Prompt for NoPrompt {
            fn select(
                &self,
                _: &str,
                _: &[String],
                _: &dyn Fn(&str, usize) -> bool,
            ) -> Result<usize> {
                panic!("prompt must not be consulted for a single role");
            }
            fn input(&self, _: &str, _: &str) -> Result<String> {
                panic!("prompt must not be consulted for a single role");
            }
        }

        let picked = selector.select_role(&roles, &NoPrompt).unwrap();
        assert_eq!(picked.role_name, "AdministratorAccess");
    }

    #[test]
    fn test_empty_account_list_is_an_error() {
        let selector = IdentitySelector::new(Arc::new(MockIdentityClient::new()));
        assert!(selector
            .select_account(&[], &ScriptedPrompt::new(0))
            .is_err());
    }
}
