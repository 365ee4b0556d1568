use tokio::process::Command;

fn opener(target: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(target);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("rundll32");
        cmd.arg("url.dll,FileProtocolHandler").arg(target);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        cmd
    }
}

/// Open a URL or file in the default browser. Failing to launch one is
/// not an error, the caller has already printed the target.
pub async fn open_in_browser(target: &str) {
    match opener(target).status().await {
        Ok(status) if status.success() => tracing::debug!("Opened {} in browser", target),
        Ok(status) => tracing::warn!("Browser launcher exited with {}", status),
        Err(e) => tracing::warn!("Could not launch a browser: {}", e),
    }
}
