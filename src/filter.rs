//! The update filter: decides per outbound request whether to cancel it,
//! rewrite its body, or leave it alone.
//!
//! A filter is built once by the host integration layer and registered with
//! the host's HTTP and update subsystems; it never changes configuration
//! afterwards. In full-block mode (`all`) matching requests are cancelled
//! before transmission. In selective mode their bodies are rewritten to omit
//! blocked plugins and themes. Whatever goes wrong, the filter degrades to
//! leaving the request untouched.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;

use crate::blocklist::is_blocked;
use crate::codec;
use crate::config::{BlockConfig, InstallPaths};
use crate::endpoint::{self, EndpointKind, UpdateEndpoint};
use crate::hooks::{
    CachedCheck, CoreUpdateCheck, PreSendAction, RequestArgs, UpdateCache, UpdateHooks,
};
use crate::payload::{PluginPayload, ThemePayload};
use crate::runtime::Runtime;

/// Post-filter transform applied to a payload before re-encoding.
pub type PayloadTransform = Box<dyn Fn(Value) -> Value + Send + Sync>;

/// Transform applied once to the resolved configuration before it takes
/// effect.
pub type ConfigTransform = Box<dyn FnOnce(BlockConfig) -> BlockConfig>;

/// Staging area for an [`UpdateFilter`]; nothing is intercepted until
/// [`build`](UpdateFilterBuilder::build) resolves the configuration.
pub struct UpdateFilterBuilder<R: Runtime> {
    runtime: R,
    config: BlockConfig,
    paths: InstallPaths,
    platform_version: String,
    config_transform: Option<ConfigTransform>,
    plugin_transform: Option<PayloadTransform>,
    theme_transform: Option<PayloadTransform>,
}

impl<R: Runtime> UpdateFilterBuilder<R> {
    /// `platform_version` is the currently running core version, echoed back
    /// by synthetic core-update answers.
    pub fn new(
        runtime: R,
        config: BlockConfig,
        paths: InstallPaths,
        platform_version: impl Into<String>,
    ) -> Self {
        UpdateFilterBuilder {
            runtime,
            config,
            paths,
            platform_version: platform_version.into(),
            config_transform: None,
            plugin_transform: None,
            theme_transform: None,
        }
    }

    /// Lets external code adjust the configuration before it is frozen.
    pub fn config_transform(mut self, f: impl FnOnce(BlockConfig) -> BlockConfig + 'static) -> Self {
        self.config_transform = Some(Box::new(f));
        self
    }

    /// Transform applied to filtered plugin payloads before re-encoding.
    pub fn plugin_transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.plugin_transform = Some(Box::new(f));
        self
    }

    /// Transform applied to filtered theme payloads before re-encoding.
    pub fn theme_transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.theme_transform = Some(Box::new(f));
        self
    }

    pub fn build(self) -> UpdateFilter<R> {
        let config = match self.config_transform {
            Some(transform) => transform(self.config),
            None => self.config,
        };
        debug!(
            "Update filter configured: all={}, core={}, {} plugin(s), {} theme(s), markers {:?}",
            config.all,
            config.core,
            config.plugins.len(),
            config.themes.len(),
            config.files,
        );
        UpdateFilter {
            runtime: self.runtime,
            config,
            paths: self.paths,
            platform_version: self.platform_version,
            plugin_transform: self.plugin_transform,
            theme_transform: self.theme_transform,
        }
    }
}

/// A configured filter. Read-only after construction; safe to share with the
/// host's request path for the life of the process.
pub struct UpdateFilter<R: Runtime> {
    runtime: R,
    config: BlockConfig,
    paths: InstallPaths,
    platform_version: String,
    plugin_transform: Option<PayloadTransform>,
    theme_transform: Option<PayloadTransform>,
}

impl<R: Runtime> UpdateFilter<R> {
    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Activation lifecycle event: drop cached update-check results so the
    /// next check runs against the filtered state.
    #[tracing::instrument(skip_all)]
    pub fn activate(&self, cache: &dyn UpdateCache) {
        self.invalidate_update_caches(cache);
    }

    /// Deactivation lifecycle event: same invalidation, so stale filtered
    /// results do not outlive the filter.
    #[tracing::instrument(skip_all)]
    pub fn deactivate(&self, cache: &dyn UpdateCache) {
        self.invalidate_update_caches(cache);
    }

    fn invalidate_update_caches(&self, cache: &dyn UpdateCache) {
        for check in [CachedCheck::PluginUpdates, CachedCheck::ThemeUpdates] {
            if let Err(e) = cache.delete(check) {
                warn!("Failed to invalidate {:?} cache: {:#}", check, e);
            }
        }
    }

    /// Decode, filter, transform, and re-encode one body field. Any failure
    /// propagates so the caller can keep the original bytes.
    fn rewrite(&self, raw: &[u8], endpoint: &UpdateEndpoint) -> Result<Vec<u8>> {
        let decoded = codec::decode(raw, endpoint.format)
            .context("Failed to decode update-check body")?;

        let filtered = match endpoint.kind {
            EndpointKind::Plugins => self.filter_plugins(decoded)?,
            EndpointKind::Themes => self.filter_themes(decoded)?,
        };

        let transformed = self.apply_transform(endpoint.kind, filtered);

        codec::encode(&transformed, endpoint.format, endpoint.kind)
            .context("Failed to re-encode update-check body")
    }

    fn filter_plugins(&self, decoded: Value) -> Result<Value> {
        let mut payload: PluginPayload = serde_json::from_value(decoded)
            .context("Plugin update-check body has unexpected shape")?;

        let blocked: Vec<String> = payload
            .plugins
            .keys()
            .filter(|identifier| {
                is_blocked(
                    &self.runtime,
                    identifier,
                    self.paths.plugin_dir(identifier).as_deref(),
                    &self.config.plugins,
                    &self.config.files,
                )
            })
            .cloned()
            .collect();

        for identifier in &blocked {
            debug!("Dropping {} from plugin update check", identifier);
            payload.remove(identifier);
        }

        serde_json::to_value(payload).context("Failed to rebuild plugin payload")
    }

    fn filter_themes(&self, decoded: Value) -> Result<Value> {
        let mut payload: ThemePayload = serde_json::from_value(decoded)
            .context("Theme update-check body has unexpected shape")?;

        let blocked: Vec<String> = payload
            .themes
            .keys()
            .filter(|slug| {
                is_blocked(
                    &self.runtime,
                    slug,
                    Some(&self.paths.theme_dir(slug)),
                    &self.config.themes,
                    &self.config.files,
                )
            })
            .cloned()
            .collect();

        for slug in &blocked {
            debug!("Dropping {} from theme update check", slug);
            payload.remove(slug);
        }

        serde_json::to_value(payload).context("Failed to rebuild theme payload")
    }

    fn apply_transform(&self, kind: EndpointKind, payload: Value) -> Value {
        let transform = match kind {
            EndpointKind::Plugins => self.plugin_transform.as_ref(),
            EndpointKind::Themes => self.theme_transform.as_ref(),
        };
        match transform {
            Some(f) => f(payload),
            None => payload,
        }
    }
}

impl<R: Runtime> UpdateHooks for UpdateFilter<R> {
    #[tracing::instrument(skip(self, _args))]
    fn on_before_send(
        &self,
        default: PreSendAction,
        _args: &RequestArgs,
        url: &str,
    ) -> PreSendAction {
        if self.config.all && endpoint::classify(url).is_some() {
            debug!("Cancelling update-check request to {}", url);
            return PreSendAction::Cancel;
        }
        default
    }

    #[tracing::instrument(skip(self, args))]
    fn on_rewrite_body(&self, mut args: RequestArgs, url: &str) -> RequestArgs {
        // Full-block mode cancels at the pre-send hook; nothing to rewrite.
        if self.config.all {
            return args;
        }

        let Some(endpoint) = endpoint::classify(url) else {
            return args;
        };

        let key = endpoint.kind.body_key();
        let Some(raw) = args.body.get(key) else {
            return args;
        };

        match self.rewrite(raw, &endpoint) {
            Ok(rewritten) => {
                args.body.insert(key.to_string(), rewritten);
            }
            Err(e) => {
                warn!(
                    "Leaving update-check request to {} untouched: {:#}",
                    url, e
                );
            }
        }
        args
    }

    #[tracing::instrument(skip(self))]
    fn on_core_update_query(&self) -> Option<CoreUpdateCheck> {
        if !(self.config.all || self.config.core) {
            return None;
        }
        // Answered locally; no network request is made for this check.
        Some(CoreUpdateCheck {
            updates: Vec::new(),
            last_checked: self.runtime.unix_timestamp(),
            version_checked: self.platform_version.clone(),
        })
    }
}
