//! Scripted runs without a terminal, used by integration tests.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use focusdeck_core::keys::Key;
use focusdeck_core::result::IntegrationResult;
use focusdeck_core::Result;

use crate::app::App;

const QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Feeds `keys` to the app, waits for renders to settle and builds the
/// result. Success means no handler or transition reported an error.
pub async fn run(app: &mut App, keys: &[Key], result_path: Option<&Path>) -> Result<IntegrationResult> {
    for key in keys {
        app.handle_key(*key);
        app.drain_renders();
        if app.should_quit() {
            break;
        }
    }
    app.settle(QUIET_PERIOD).await;

    let result = match app.status().last() {
        Some(last) if last.is_error() => {
            IntegrationResult::failure(format!("{}; {}", last.text(), app.describe()))
        }
        _ if app.status().error_count() > 0 => IntegrationResult::failure(format!(
            "{} error(s) reported; {}",
            app.status().error_count(),
            app.describe()
        )),
        _ => IntegrationResult::success(app.describe()),
    };
    info!(success = result.success, message = %result.message, "headless run finished");

    if let Some(path) = result_path {
        result.write(path)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use focusdeck_core::config::FocusdeckConfig;
    use tokio::runtime::Handle;

    use super::*;
    use crate::backend::DemoBackend;

    fn demo_app() -> App {
        App::new(
            FocusdeckConfig::default(),
            Arc::new(DemoBackend::new()),
            Handle::current(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_writes_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        let mut app = demo_app();
        let keys = Key::parse_sequence("<right>,j,j").unwrap();

        let result = run(&mut app, &keys, Some(&path)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "active=stash selected=stash@{2}");
        assert_eq!(IntegrationResult::read(&path).unwrap(), result);
        assert!(app.main_view().unwrap().body.contains("popup styling"));
    }

    #[tokio::test]
    async fn test_reported_error_fails_run() {
        let mut app = demo_app();
        let keys = Key::parse_sequence("d").unwrap();
        let result = run(&mut app, &keys, None).await.unwrap();
        assert!(!result.success);
        assert!(result.message.starts_with("Cannot remove the main worktree"));
    }

    #[tokio::test]
    async fn test_quit_stops_processing_keys() {
        let mut app = demo_app();
        let keys = Key::parse_sequence("q,<right>").unwrap();
        let result = run(&mut app, &keys, None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "active=worktrees selected=/demo/focusdeck");
    }
}
