//! End-to-end behavior against a real filesystem: a filter built over
//! tempdir plugin/theme installs, exercised through the host-facing hooks.

use serde_json::{Value, json};
use std::collections::HashSet;
use tempfile::{TempDir, tempdir};

use update_blocker::codec::{self, SerializationFormat};
use update_blocker::config::{BlockConfig, InstallPaths};
use update_blocker::endpoint::EndpointKind;
use update_blocker::filter::{UpdateFilter, UpdateFilterBuilder};
use update_blocker::hooks::{CachedCheck, PreSendAction, RequestArgs, UpdateCache, UpdateHooks};
use update_blocker::runtime::RealRuntime;

#[derive(Default)]
struct RecordingCache {
    deleted: std::sync::Mutex<Vec<CachedCheck>>,
}

impl UpdateCache for RecordingCache {
    fn delete(&self, check: CachedCheck) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push(check);
        Ok(())
    }
}

const PLUGIN_URL_JSON: &str = "https://api.wordpress.org/plugins/update-check/1.1/";
const PLUGIN_URL_LEGACY: &str = "https://api.wordpress.org/plugins/update-check/1.0/";
const THEME_URL_JSON: &str = "https://api.wordpress.org/themes/update-check/1.1/";

/// A fake wp-content layout: plugins `foo` (a git checkout) and `bar`, theme
/// `alpha` (an svn checkout) and `beta`.
struct Install {
    root: TempDir,
}

impl Install {
    fn create() -> Self {
        let root = tempdir().unwrap();
        for dir in ["plugins/foo", "plugins/bar", "themes/alpha", "themes/beta"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        std::fs::create_dir(root.path().join("plugins/foo/.git")).unwrap();
        std::fs::write(root.path().join("themes/alpha/.svn"), b"").unwrap();
        Install { root }
    }

    fn paths(&self) -> InstallPaths {
        InstallPaths::new(
            self.root.path().join("plugins"),
            self.root.path().join("themes"),
        )
    }

    fn filter(&self, config: BlockConfig) -> UpdateFilter<RealRuntime> {
        UpdateFilterBuilder::new(RealRuntime, config, self.paths(), "6.5").build()
    }
}

fn plugin_payload() -> Value {
    json!({
        "plugins": {
            "foo/foo.php": { "Name": "Foo", "Version": "1.2" },
            "bar/bar.php": { "Name": "Bar", "Version": "0.9" },
            "hello.php": { "Name": "Hello", "Version": "1.7" }
        },
        "active": ["foo/foo.php", "bar/bar.php"]
    })
}

fn json_args(kind: EndpointKind, payload: &Value) -> RequestArgs {
    RequestArgs::new().with_body_field(kind.body_key(), serde_json::to_vec(payload).unwrap())
}

#[test_log::test]
fn development_checkouts_are_excluded_from_plugin_checks() {
    let install = Install::create();
    let filter = install.filter(BlockConfig::default());

    let args = filter.on_rewrite_body(json_args(EndpointKind::Plugins, &plugin_payload()), PLUGIN_URL_JSON);
    let body: Value = serde_json::from_slice(&args.body["plugins"]).unwrap();

    // foo is a git checkout: gone from the map and the active list together.
    assert!(body["plugins"].get("foo/foo.php").is_none());
    assert_eq!(body["active"], json!(["bar/bar.php"]));
    // bar and the single-file plugin survive.
    assert!(body["plugins"].get("bar/bar.php").is_some());
    assert!(body["plugins"].get("hello.php").is_some());
}

#[test]
fn development_checkouts_are_excluded_from_theme_checks() {
    let install = Install::create();
    let filter = install.filter(BlockConfig::default());

    let payload = json!({ "themes": { "alpha": {}, "beta": {} } });
    let args = filter.on_rewrite_body(json_args(EndpointKind::Themes, &payload), THEME_URL_JSON);
    let body: Value = serde_json::from_slice(&args.body["themes"]).unwrap();

    assert_eq!(body, json!({ "themes": { "beta": {} } }));
}

#[test]
fn explicit_blocklist_combines_with_marker_detection() {
    let install = Install::create();
    let filter = install.filter(BlockConfig {
        plugins: HashSet::from(["bar/bar.php".to_string()]),
        ..BlockConfig::default()
    });

    let args = filter.on_rewrite_body(json_args(EndpointKind::Plugins, &plugin_payload()), PLUGIN_URL_JSON);
    let body: Value = serde_json::from_slice(&args.body["plugins"]).unwrap();

    // bar explicitly, foo by its .git marker.
    assert_eq!(body["plugins"], json!({ "hello.php": { "Name": "Hello", "Version": "1.7" } }));
    assert_eq!(body["active"], json!([]));
}

#[test]
fn legacy_endpoint_round_trips_in_object_form() {
    let install = Install::create();
    let filter = install.filter(BlockConfig::default());

    let raw = codec::encode(
        &plugin_payload(),
        SerializationFormat::Legacy,
        EndpointKind::Plugins,
    )
    .unwrap();
    let args = RequestArgs::new().with_body_field("plugins", raw);

    let rewritten = filter.on_rewrite_body(args, PLUGIN_URL_LEGACY);
    let raw = &rewritten.body["plugins"];
    assert!(raw.starts_with(b"O:8:\"stdClass\":"));

    let body = codec::decode(raw, SerializationFormat::Legacy).unwrap();
    assert!(body["plugins"].get("foo/foo.php").is_none());
    assert!(body["plugins"].get("bar/bar.php").is_some());
}

#[test]
fn unrelated_requests_are_untouched() {
    let install = Install::create();
    let filter = install.filter(BlockConfig {
        all: true,
        ..BlockConfig::default()
    });

    let args = RequestArgs::new().with_body_field("plugins", b"opaque bytes".to_vec());
    assert_eq!(
        filter.on_before_send(PreSendAction::Transmit, &args, "https://example.com/api/"),
        PreSendAction::Transmit
    );
    assert_eq!(
        filter.on_rewrite_body(args.clone(), "https://example.com/api/"),
        args
    );
}

#[test]
fn full_block_mode_cancels_before_transmission() {
    let install = Install::create();
    let filter = install.filter(BlockConfig {
        all: true,
        ..BlockConfig::default()
    });

    let args = json_args(EndpointKind::Plugins, &plugin_payload());
    assert_eq!(
        filter.on_before_send(PreSendAction::Transmit, &args, PLUGIN_URL_JSON),
        PreSendAction::Cancel
    );
}

#[test]
fn core_checks_are_answered_locally() {
    let install = Install::create();
    let filter = install.filter(BlockConfig {
        core: true,
        ..BlockConfig::default()
    });

    let before = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let check = filter.on_core_update_query().unwrap();

    assert!(check.updates.is_empty());
    assert_eq!(check.version_checked, "6.5");
    assert!(check.last_checked >= before);
}

#[test]
fn lifecycle_events_invalidate_cached_checks() {
    let install = Install::create();
    let filter = install.filter(BlockConfig::default());

    let cache = RecordingCache::default();
    filter.activate(&cache);
    filter.deactivate(&cache);

    let deleted = cache.deleted.lock().unwrap();
    assert_eq!(
        *deleted,
        vec![
            CachedCheck::PluginUpdates,
            CachedCheck::ThemeUpdates,
            CachedCheck::PluginUpdates,
            CachedCheck::ThemeUpdates,
        ]
    );
}

#[test]
fn unparseable_bodies_pass_through_unchanged() {
    let install = Install::create();
    let filter = install.filter(BlockConfig::default());

    let args = RequestArgs::new().with_body_field("plugins", b"a:1:{truncated".to_vec());
    let rewritten = filter.on_rewrite_body(args.clone(), PLUGIN_URL_LEGACY);
    assert_eq!(rewritten, args);
}
