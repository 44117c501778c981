use git2::{Cred, CredentialType, Error, RemoteCallbacks};
use std::path::PathBuf;
use std::rc::Rc;

use crate::config::user_home_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SshKeyKind {
    IdEd25519,
    IdRsa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CredentialStrategy {
    Helper,
    SshKey(SshKeyKind),
    Username,
    Default,
}

/// Ordered list of credential sources to try for one authentication request.
pub(crate) fn build_credential_plan(
    allowed_types: CredentialType,
    has_helper: bool,
) -> Vec<CredentialStrategy> {
    let mut plan = Vec::new();

    if has_helper {
        plan.push(CredentialStrategy::Helper);
    }

    if allowed_types.contains(CredentialType::SSH_KEY) {
        plan.push(CredentialStrategy::SshKey(SshKeyKind::IdEd25519));
        plan.push(CredentialStrategy::SshKey(SshKeyKind::IdRsa));
    }

    if allowed_types.contains(CredentialType::USERNAME) {
        plan.push(CredentialStrategy::Username);
    }

    plan.push(CredentialStrategy::Default);

    plan
}

fn locate_default_key(kind: SshKeyKind) -> Option<(PathBuf, Option<PathBuf>)> {
    let home = user_home_dir()?;
    let key_name = match kind {
        SshKeyKind::IdEd25519 => "id_ed25519",
        SshKeyKind::IdRsa => "id_rsa",
    };

    let private = home.join(".ssh").join(key_name);
    if !private.exists() {
        return None;
    }

    let mut public = private.clone();
    public.set_extension("pub");
    let public = if public.exists() { Some(public) } else { None };

    Some((private, public))
}

fn try_strategy(
    strategy: CredentialStrategy,
    config: Option<&git2::Config>,
    url: &str,
    username_from_url: Option<&str>,
) -> Result<Cred, Error> {
    let username = username_from_url.unwrap_or("git");

    match strategy {
        CredentialStrategy::Helper => match config {
            Some(cfg) => Cred::credential_helper(cfg, url, username_from_url),
            None => Err(Error::from_str("no git config available for credential helper")),
        },
        CredentialStrategy::SshKey(kind) => match locate_default_key(kind) {
            Some((private, public)) => Cred::ssh_key(username, public.as_deref(), &private, None),
            None => Err(Error::from_str("no default ssh key on disk")),
        },
        CredentialStrategy::Username => Cred::username(username),
        CredentialStrategy::Default => Cred::default(),
    }
}

/// Callbacks shared by probe, fetch, and push: walk the credential plan and
/// hand back the first credential that materializes.
pub(crate) fn remote_callbacks(config: Option<Rc<git2::Config>>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        let plan = build_credential_plan(allowed_types, config.is_some());
        let mut last = Error::from_str("no credential strategy succeeded");
        for strategy in plan {
            match try_strategy(strategy, config.as_deref(), url, username_from_url) {
                Ok(cred) => return Ok(cred),
                Err(err) => last = err,
            }
        }
        Err(last)
    });
    callbacks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_plan_orders_helper_before_keys() {
        let plan = build_credential_plan(CredentialType::SSH_KEY | CredentialType::USERNAME, true);
        assert_eq!(
            plan,
            vec![
                CredentialStrategy::Helper,
                CredentialStrategy::SshKey(SshKeyKind::IdEd25519),
                CredentialStrategy::SshKey(SshKeyKind::IdRsa),
                CredentialStrategy::Username,
                CredentialStrategy::Default,
            ]
        );
    }

    #[test]
    fn credential_plan_always_ends_with_default() {
        let plan = build_credential_plan(CredentialType::empty(), false);
        assert_eq!(plan, vec![CredentialStrategy::Default]);
    }
}
